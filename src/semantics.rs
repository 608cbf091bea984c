use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::GrammarError;

/// A named semantic function attached to nonterminal rules. The parser
/// evaluates these downstream; the compiler only tracks name, arity and
/// cost, and folds the cost into the owning rule's cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Semantic {
  pub name: String,
  pub cost: f64,
  pub min_params: usize,
  pub max_params: usize,
}

impl Semantic {
  /// Composes `outer(inner(...))`: the cost is summed and the composite
  /// takes the inner semantic's arity. The outer semantic must be able
  /// to accept the single composed argument.
  pub fn reduce(outer: &Rc<Semantic>, inner: &Rc<Semantic>) -> Result<Rc<Semantic>, GrammarError> {
    if outer.min_params > 1 || outer.max_params < 1 {
      return Err(GrammarError::ArityMismatch(format!(
        "{} takes {}..{} params, cannot take the result of {}",
        outer.name, outer.min_params, outer.max_params, inner.name
      )));
    }
    Ok(Rc::new(Semantic {
      name: format!("{}({})", outer.name, inner.name),
      cost: outer.cost + inner.cost,
      min_params: inner.min_params,
      max_params: inner.max_params,
    }))
  }
}

impl fmt::Display for Semantic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name)
  }
}

/// Registry of semantics, identified by name
#[derive(Debug, Default)]
pub struct SemanticRegistry {
  by_name: HashMap<String, Rc<Semantic>>,
}

impl SemanticRegistry {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn define(
    &mut self,
    name: &str,
    cost: f64,
    min_params: usize,
    max_params: usize,
  ) -> Result<Rc<Semantic>, GrammarError> {
    if min_params > max_params {
      return Err(GrammarError::ArityMismatch(format!(
        "{}: min {} > max {}",
        name, min_params, max_params
      )));
    }
    if !(cost.is_finite() && cost >= 0.0) {
      return Err(GrammarError::ArityMismatch(format!(
        "{}: cost must be finite and nonnegative",
        name
      )));
    }
    if self.by_name.contains_key(name) {
      return Err(GrammarError::DuplicateSemantic(name.to_string()));
    }
    let sem = Rc::new(Semantic {
      name: name.to_string(),
      cost,
      min_params,
      max_params,
    });
    self.by_name.insert(name.to_string(), sem.clone());
    Ok(sem)
  }

  pub fn get(&self, name: &str) -> Option<Rc<Semantic>> {
    self.by_name.get(name).cloned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_define_and_reduce() {
    let mut reg = SemanticRegistry::new();
    let repos = reg.define("repositories", 0.0, 0, 2).unwrap();
    let created = reg.define("created", 0.5, 1, 1).unwrap();

    let composed = Semantic::reduce(&created, &repos).unwrap();
    assert_eq!(composed.name, "created(repositories)");
    assert_eq!(composed.cost, 0.5);
    assert_eq!(composed.min_params, 0);
    assert_eq!(composed.max_params, 2);
  }

  #[test]
  fn test_reduce_cost_additive() {
    let mut reg = SemanticRegistry::new();
    let a = reg.define("a", 0.25, 1, 1).unwrap();
    let b = reg.define("b", 0.5, 1, 1).unwrap();
    let ab = Semantic::reduce(&a, &b).unwrap();
    assert_eq!(ab.cost, 0.75);
    // compose again, outer(inner) still takes the innermost arity
    let c = reg.define("c", 0.0, 1, 1).unwrap();
    let abc = Semantic::reduce(&c, &ab).unwrap();
    assert_eq!(abc.name, "c(a(b))");
    assert_eq!(abc.cost, 0.75);
  }

  #[test]
  fn test_reduce_rejects_arity() {
    let mut reg = SemanticRegistry::new();
    let pair = reg.define("intersect", 0.0, 2, 2).unwrap();
    let one = reg.define("people", 0.0, 1, 1).unwrap();
    assert!(matches!(
      Semantic::reduce(&pair, &one),
      Err(GrammarError::ArityMismatch(_))
    ));
  }

  #[test]
  fn test_duplicate_name_rejected() {
    let mut reg = SemanticRegistry::new();
    reg.define("people", 0.0, 1, 1).unwrap();
    assert_eq!(
      reg.define("people", 0.0, 1, 1),
      Err(GrammarError::DuplicateSemantic("people".to_string()))
    );
  }
}
