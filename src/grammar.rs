use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::error::GrammarError;
use crate::rules::{
  GrammaticalCase, PersonNumber, Rule, RuleKind, Symbol, Tense, TermText, VerbForm, EMPTY,
};
use crate::semantics::Semantic;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// A symbol name part: lower-case words, digits, internal dashes
fn part_is_well_formed(part: &str) -> bool {
  regex_static!(NAME_PART, r"^[a-z0-9]+(-[a-z0-9]+)*$");
  NAME_PART.is_match(part)
}

/// Attributes of a terminal rule under construction
#[derive(Debug, Clone, Default)]
pub struct TerminalSpec {
  /// Display text; defaults to the matched token itself
  pub text: Option<TermText>,
  pub insertion_cost: Option<f64>,
  pub tense: Option<Tense>,
  pub grammatical_case: Option<GrammaticalCase>,
  pub verb_form: Option<VerbForm>,
  pub person_number: Option<PersonNumber>,
}

/// Attributes of a nonterminal rule under construction
#[derive(Debug, Clone, Default)]
pub struct NonterminalSpec {
  pub semantic: Option<Rc<Semantic>>,
  pub transposition_cost: Option<f64>,
  pub grammatical_case: Option<GrammaticalCase>,
  pub verb_form: Option<VerbForm>,
  pub person_number: Option<PersonNumber>,
}

/// Mutable grammar under authoring. An explicit value rather than a
/// process-wide registry: domain modules thread it through and get the
/// same ergonomics without hidden state.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
  symbols: Vec<Symbol>,
  rules: HashMap<String, Vec<Rc<Rule>>>,
  deletables: HashSet<String>,
  start: Option<String>,
}

impl GrammarBuilder {
  pub fn new() -> Self {
    Default::default()
  }

  /// Registers a fresh symbol named by joining `parts` with dashes,
  /// bracketed: `["verb", "create"]` becomes `[verb-create]`.
  pub fn new_symbol(&mut self, parts: &[&str]) -> Result<Symbol, GrammarError> {
    for part in parts {
      if !part_is_well_formed(part) {
        return Err(GrammarError::IllFormedName(part.to_string()));
      }
    }
    if parts.is_empty() {
      return Err(GrammarError::IllFormedName(String::new()));
    }
    let name = format!("[{}]", parts.join("-"));
    if self.rules.contains_key(&name) {
      return Err(GrammarError::DuplicateSymbol(name));
    }
    let sym = Symbol::new(name.clone());
    self.symbols.push(sym.clone());
    self.rules.insert(name, Vec::new());
    Ok(sym)
  }

  /// Marks a terminal string as admissible for elision; the edit-rule
  /// generator treats rules matching it as insertable.
  pub fn deletable(&mut self, word: &str) {
    self.deletables.insert(word.to_string());
  }

  pub fn set_start(&mut self, sym: &Symbol) {
    self.start = Some(sym.name.clone());
  }

  pub fn add_terminal_rule(
    &mut self,
    sym: &Symbol,
    token: &str,
    spec: TerminalSpec,
  ) -> Result<(), GrammarError> {
    let ill_formed = |reason: &str| GrammarError::IllFormedRule {
      lhs: sym.name.clone(),
      rhs: token.to_string(),
      reason: reason.to_string(),
    };

    if token.is_empty() {
      return Err(ill_formed("empty token"));
    }
    if token != EMPTY && token.contains(char::is_whitespace) {
      return Err(ill_formed("token contains whitespace"));
    }
    if let Some(c) = spec.insertion_cost {
      if !(c.is_finite() && c >= 0.0) {
        return Err(ill_formed("insertion cost must be finite and nonnegative"));
      }
    }
    if token == EMPTY && (spec.text.is_some() || spec.insertion_cost.is_some() || spec.tense.is_some())
    {
      return Err(ill_formed("the empty token carries no attributes"));
    }

    let text = if token == EMPTY {
      TermText::Empty
    } else {
      spec.text.unwrap_or_else(|| TermText::Literal(token.to_string()))
    };

    let rule = Rule {
      lhs: sym.clone(),
      kind: RuleKind::Terminal {
        token: token.to_string(),
        text,
        insertion_cost: spec.insertion_cost,
        tense: spec.tense,
      },
      cost: 0.0,
      semantic: None,
      grammatical_case: spec.grammatical_case,
      verb_form: spec.verb_form,
      person_number: spec.person_number,
    };
    self.push_rule(rule)
  }

  pub fn add_nonterminal_rule(
    &mut self,
    sym: &Symbol,
    rhs: &[&Symbol],
    spec: NonterminalSpec,
  ) -> Result<(), GrammarError> {
    let rhs_str = rhs
      .iter()
      .map(|s| s.name.as_str())
      .collect::<Vec<_>>()
      .join(" ");
    let ill_formed = |reason: &str| GrammarError::IllFormedRule {
      lhs: sym.name.clone(),
      rhs: rhs_str.clone(),
      reason: reason.to_string(),
    };

    if rhs.is_empty() || rhs.len() > 2 {
      return Err(ill_formed("RHS must have 1 or 2 symbols"));
    }
    if let Some(c) = spec.transposition_cost {
      if rhs.len() != 2 {
        return Err(ill_formed("transposition cost requires a binary RHS"));
      }
      if !(c.is_finite() && c >= 0.0) {
        return Err(ill_formed(
          "transposition cost must be finite and nonnegative",
        ));
      }
    }

    let rule = Rule {
      lhs: sym.clone(),
      kind: RuleKind::Nonterminal {
        rhs: rhs.iter().map(|s| (*s).clone()).collect(),
        transposition_cost: spec.transposition_cost,
      },
      cost: 0.0,
      semantic: spec.semantic,
      grammatical_case: spec.grammatical_case,
      verb_form: spec.verb_form,
      person_number: spec.person_number,
    };
    self.push_rule(rule)
  }

  /// Rejects duplicates and assigns the final cost: the rule's index
  /// within its LHS's list scaled to a tie-breaking epsilon, plus the
  /// semantic's penalty. Deterministic across runs for a fixed
  /// authoring order.
  fn push_rule(&mut self, mut rule: Rule) -> Result<(), GrammarError> {
    let list = self
      .rules
      .get_mut(&rule.lhs.name)
      .ok_or_else(|| GrammarError::UnknownSymbol {
        name: rule.lhs.name.clone(),
        lhs: rule.lhs.name.clone(),
      })?;

    if list.iter().any(|r| r.same_rhs(&rule)) {
      return Err(GrammarError::DuplicateRule {
        lhs: rule.lhs.name.clone(),
        rhs: rule.rhs_display(),
      });
    }

    rule.cost = list.len() as f64 * Grammar::RULE_EPSILON
      + rule.semantic.as_ref().map(|s| s.cost).unwrap_or(0.0);
    list.push(Rc::new(rule));
    Ok(())
  }

  /// Verifies every referenced symbol exists and produces rules, then
  /// seals the store. The nullable set is computed here; edit-rule
  /// generation appends to the sealed store but never re-opens
  /// authoring.
  pub fn compile(self) -> Result<Grammar, GrammarError> {
    for rules in self.rules.values() {
      for rule in rules {
        for name in rule.rhs_names() {
          match self.rules.get(name) {
            None => {
              return Err(GrammarError::UnknownSymbol {
                name: name.to_string(),
                lhs: rule.lhs.name.clone(),
              })
            }
            Some(list) if list.is_empty() => {
              return Err(GrammarError::UnknownSymbol {
                name: name.to_string(),
                lhs: rule.lhs.name.clone(),
              })
            }
            Some(_) => {}
          }
        }
      }
    }

    let start = self.start.ok_or(GrammarError::MissingStart)?;
    match self.rules.get(&start) {
      None => return Err(GrammarError::MissingStart),
      Some(list) if list.is_empty() => return Err(GrammarError::MissingStart),
      Some(_) => {}
    }

    let nullables = Grammar::find_nullables(&self.rules);

    Ok(Grammar {
      start,
      symbols: self.symbols,
      rules: self.rules,
      deletables: self.deletables,
      nullables,
    })
  }
}

/// Compiled grammar: the artifact the pipeline produces. Authoring is
/// done; the edit-rule generator appends derived rules once and the
/// ambiguity detector only reads.
#[derive(Debug)]
pub struct Grammar {
  pub start: String,
  /// Registration order, for deterministic iteration
  pub symbols: Vec<Symbol>,
  pub rules: HashMap<String, Vec<Rc<Rule>>>,
  pub deletables: HashSet<String>,
  nullables: HashSet<String>,
}

impl Grammar {
  /// Per-index cost increment giving a total order on otherwise
  /// equivalent derivations
  pub const RULE_EPSILON: f64 = 1e-7;

  fn rule_is_nullable(nullables: &HashSet<String>, rule: &Rule) -> bool {
    match &rule.kind {
      RuleKind::Terminal { token, .. } => token == EMPTY,
      RuleKind::Nonterminal { rhs, .. } => rhs.iter().all(|s| nullables.contains(&s.name)),
      // derived rules never make a symbol nullable on their own
      RuleKind::Insertion { .. } | RuleKind::Transposition { .. } => false,
    }
  }

  fn find_nullables(rules: &HashMap<String, Vec<Rc<Rule>>>) -> HashSet<String> {
    let mut nullables: HashSet<String> = HashSet::new();

    let mut last_length = 1;
    while last_length != nullables.len() {
      last_length = nullables.len();
      for r in rules.values().flatten() {
        if !nullables.contains(&r.lhs.name) && Self::rule_is_nullable(&nullables, r) {
          nullables.insert(r.lhs.name.clone());
        }
      }
    }

    nullables
  }

  pub fn is_nullable(&self, s: &str) -> bool {
    self.nullables.contains(s)
  }

  pub fn rules_for(&self, s: &str) -> &[Rc<Rule>] {
    self.rules.get(s).map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// Appends a derived rule unless an equivalent one already exists.
  /// Returns whether the rule was added.
  pub(crate) fn push_derived(&mut self, rule: Rule) -> bool {
    let list = self
      .rules
      .get_mut(&rule.lhs.name)
      .expect("derived rule for unregistered symbol");
    if list.iter().any(|r| r.same_rhs(&rule)) {
      return false;
    }
    list.push(Rc::new(rule));
    true
  }
}

impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "//** start: {}", self.start)?;

    write!(f, "//** deletables:")?;
    let mut deletables = self.deletables.iter().collect::<Vec<_>>();
    deletables.sort();
    for d in deletables {
      write!(f, " {}", d)?;
    }
    writeln!(f)?;

    write!(f, "//** nullables:")?;
    let mut nullables = self.nullables.iter().collect::<Vec<_>>();
    nullables.sort();
    for nt in nullables {
      write!(f, " {}", nt)?;
    }
    writeln!(f)?;

    for sym in self.symbols.iter() {
      for rule in self.rules_for(&sym.name) {
        writeln!(f, "{}", rule)?;
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_symbol_names() {
    let mut b = GrammarBuilder::new();
    let sym = b.new_symbol(&["verb", "create"]).unwrap();
    assert_eq!(sym.name, "[verb-create]");

    assert_eq!(
      b.new_symbol(&["verb", "create"]),
      Err(GrammarError::DuplicateSymbol("[verb-create]".to_string()))
    );
    assert_eq!(
      b.new_symbol(&["Bad Name"]),
      Err(GrammarError::IllFormedName("Bad Name".to_string()))
    );
    assert_eq!(b.new_symbol(&[]), Err(GrammarError::IllFormedName(String::new())));
  }

  #[test]
  fn test_duplicate_rules_rejected() {
    let mut b = GrammarBuilder::new();
    let s = b.new_symbol(&["s"]).unwrap();
    let a = b.new_symbol(&["a"]).unwrap();

    b.add_terminal_rule(&a, "x", Default::default()).unwrap();
    assert!(matches!(
      b.add_terminal_rule(&a, "x", Default::default()),
      Err(GrammarError::DuplicateRule { .. })
    ));

    b.add_nonterminal_rule(&s, &[&a, &a], Default::default()).unwrap();
    assert!(matches!(
      b.add_nonterminal_rule(&s, &[&a, &a], Default::default()),
      Err(GrammarError::DuplicateRule { .. })
    ));
  }

  #[test]
  fn test_rhs_arity_checks() {
    let mut b = GrammarBuilder::new();
    let s = b.new_symbol(&["s"]).unwrap();
    let a = b.new_symbol(&["a"]).unwrap();

    assert!(matches!(
      b.add_nonterminal_rule(&s, &[], Default::default()),
      Err(GrammarError::IllFormedRule { .. })
    ));
    assert!(matches!(
      b.add_nonterminal_rule(&s, &[&a, &a, &a], Default::default()),
      Err(GrammarError::IllFormedRule { .. })
    ));
    // transposition cost needs a binary RHS
    assert!(matches!(
      b.add_nonterminal_rule(
        &s,
        &[&a],
        NonterminalSpec {
          transposition_cost: Some(1.0),
          ..Default::default()
        }
      ),
      Err(GrammarError::IllFormedRule { .. })
    ));
  }

  #[test]
  fn test_cost_assignment_is_ordered() {
    let mut b = GrammarBuilder::new();
    let s = b.new_symbol(&["s"]).unwrap();
    let a = b.new_symbol(&["a"]).unwrap();
    b.add_terminal_rule(&a, "x", Default::default()).unwrap();
    b.add_terminal_rule(&a, "y", Default::default()).unwrap();
    b.add_nonterminal_rule(&s, &[&a], Default::default()).unwrap();
    b.set_start(&s);

    let g = b.compile().unwrap();
    let rules = g.rules_for("[a]");
    assert_eq!(rules[0].cost, 0.0);
    assert_eq!(rules[1].cost, Grammar::RULE_EPSILON);
  }

  #[test]
  fn test_compile_rejects_unknown_symbols() {
    let mut b = GrammarBuilder::new();
    let s = b.new_symbol(&["s"]).unwrap();
    let a = b.new_symbol(&["a"]).unwrap();
    // [a] is registered but never given any rules
    b.add_nonterminal_rule(&s, &[&a], Default::default()).unwrap();
    b.set_start(&s);
    assert!(matches!(
      b.compile(),
      Err(GrammarError::UnknownSymbol { .. })
    ));
  }

  #[test]
  fn test_compile_requires_start() {
    let mut b = GrammarBuilder::new();
    let a = b.new_symbol(&["a"]).unwrap();
    b.add_terminal_rule(&a, "x", Default::default()).unwrap();
    assert_eq!(b.compile().err(), Some(GrammarError::MissingStart));
  }

  #[test]
  fn test_find_nullables_fixed_point() {
    let mut b = GrammarBuilder::new();
    let s = b.new_symbol(&["s"]).unwrap();
    let opt = b.new_symbol(&["opt"]).unwrap();
    let wrap = b.new_symbol(&["wrap"]).unwrap();
    let word = b.new_symbol(&["word"]).unwrap();

    b.add_terminal_rule(&opt, EMPTY, Default::default()).unwrap();
    b.add_terminal_rule(&opt, "the", Default::default()).unwrap();
    // nullable through a unary chain
    b.add_nonterminal_rule(&wrap, &[&opt], Default::default()).unwrap();
    b.add_terminal_rule(&word, "x", Default::default()).unwrap();
    b.add_nonterminal_rule(&s, &[&wrap, &word], Default::default()).unwrap();
    b.set_start(&s);

    let g = b.compile().unwrap();
    assert!(g.is_nullable("[opt]"));
    assert!(g.is_nullable("[wrap]"));
    assert!(!g.is_nullable("[word]"));
    assert!(!g.is_nullable("[s]"));
  }
}
