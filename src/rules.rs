use std::fmt;
use std::rc::Rc;

use crate::semantics::Semantic;

/// Token that terminal rules use to derive the empty string
pub const EMPTY: &str = "<empty>";

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
  pub name: String,
}

impl Symbol {
  pub(crate) fn new(name: String) -> Self {
    Self { name }
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tense {
  Past,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammaticalCase {
  Nominative,
  Objective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbForm {
  Base,
  Past,
  PresentParticiple,
  PastParticiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonNumber {
  OneSg,
  ThreeSg,
  Pl,
}

/// Surface forms a verb rule carries until parse-time conjugation.
/// Every rule built from one verb descriptor shares one map, so a match
/// on any form can be rendered in any other.
#[derive(Debug, Clone, PartialEq)]
pub struct InflectionMap {
  pub one_sg: String,
  pub three_sg: String,
  pub pl: String,
  pub past: Option<String>,
}

impl fmt::Display for InflectionMap {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{{{}|{}|{}", self.one_sg, self.three_sg, self.pl)?;
    if let Some(past) = &self.past {
      write!(f, "|{}", past)?;
    }
    write!(f, "}}")
  }
}

/// Display text of a terminal or insertion rule: a literal string, an
/// inflection map, or nothing (the empty token's text).
#[derive(Debug, Clone, PartialEq)]
pub enum TermText {
  Empty,
  Literal(String),
  Inflected(InflectionMap),
}

/// Single-space join with leading/trailing space collapsed
fn join(a: &str, b: &str) -> String {
  if a.is_empty() {
    b.to_string()
  } else if b.is_empty() {
    a.to_string()
  } else {
    format!("{} {}", a, b)
  }
}

impl TermText {
  pub fn is_empty(&self) -> bool {
    matches!(self, Self::Empty)
  }

  /// Concatenates two display texts: strings space-join, a string
  /// distributes over every form of an inflection map, and two maps
  /// join per key. `Empty` is the identity.
  pub fn concat(&self, other: &TermText) -> TermText {
    match (self, other) {
      (Self::Empty, t) | (t, Self::Empty) => t.clone(),
      (Self::Literal(a), Self::Literal(b)) => Self::Literal(join(a, b)),
      (Self::Literal(s), Self::Inflected(m)) => Self::Inflected(InflectionMap {
        one_sg: join(s, &m.one_sg),
        three_sg: join(s, &m.three_sg),
        pl: join(s, &m.pl),
        past: m.past.as_ref().map(|p| join(s, p)),
      }),
      (Self::Inflected(m), Self::Literal(s)) => Self::Inflected(InflectionMap {
        one_sg: join(&m.one_sg, s),
        three_sg: join(&m.three_sg, s),
        pl: join(&m.pl, s),
        past: m.past.as_ref().map(|p| join(p, s)),
      }),
      (Self::Inflected(a), Self::Inflected(b)) => Self::Inflected(InflectionMap {
        one_sg: join(&a.one_sg, &b.one_sg),
        three_sg: join(&a.three_sg, &b.three_sg),
        pl: join(&a.pl, &b.pl),
        past: match (&a.past, &b.past) {
          (Some(x), Some(y)) => Some(join(x, y)),
          _ => None,
        },
      }),
    }
  }
}

impl fmt::Display for TermText {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Empty => write!(f, "{}", EMPTY),
      Self::Literal(s) => write!(f, "{}", s),
      Self::Inflected(m) => write!(f, "{}", m),
    }
  }
}

/// The four rule flavors. Terminal and nonterminal rules are authored;
/// insertion and transposition rules are derived by the edit-rule
/// generator and skipped by the ambiguity detector.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
  Terminal {
    /// The word this rule matches; `EMPTY` derives the empty string
    token: String,
    text: TermText,
    insertion_cost: Option<f64>,
    tense: Option<Tense>,
  },
  Nonterminal {
    /// 1 or 2 symbol references, binary at most
    rhs: Vec<Symbol>,
    transposition_cost: Option<f64>,
  },
  /// Derived unary rule letting the parser supply an unspoken
  /// constituent: `insertion_idx` names the synthesized RHS position,
  /// `text` the surface string it stands for (empty for a nullable
  /// reduction).
  Insertion {
    rhs: Symbol,
    insertion_idx: u8,
    text: TermText,
  },
  /// Derived binary rule with reversed RHS order
  Transposition { rhs: [Symbol; 2] },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
  pub lhs: Symbol,
  pub kind: RuleKind,
  pub cost: f64,
  pub semantic: Option<Rc<Semantic>>,
  pub grammatical_case: Option<GrammaticalCase>,
  pub verb_form: Option<VerbForm>,
  pub person_number: Option<PersonNumber>,
}

impl Rule {
  pub fn is_terminal(&self) -> bool {
    matches!(self.kind, RuleKind::Terminal { .. })
  }

  pub fn is_edit(&self) -> bool {
    matches!(
      self.kind,
      RuleKind::Insertion { .. } | RuleKind::Transposition { .. }
    )
  }

  /// RHS symbol names of a nonterminal-class rule, empty for terminals
  pub fn rhs_names(&self) -> Vec<&str> {
    match &self.kind {
      RuleKind::Terminal { .. } => Vec::new(),
      RuleKind::Nonterminal { rhs, .. } => rhs.iter().map(|s| s.name.as_str()).collect(),
      RuleKind::Insertion { rhs, .. } => vec![rhs.name.as_str()],
      RuleKind::Transposition { rhs } => rhs.iter().map(|s| s.name.as_str()).collect(),
    }
  }

  /// The RHS rendered alone, for diagnostics
  pub fn rhs_display(&self) -> String {
    match &self.kind {
      RuleKind::Terminal { token, .. } => token.clone(),
      _ => self.rhs_names().join(" "),
    }
  }

  /// Normalized RHS equality, for duplicate detection. Authored and
  /// transposed rules share one namespace; insertion rules compare by
  /// position and text as well, so distinct elisions may coexist.
  pub(crate) fn same_rhs(&self, other: &Rule) -> bool {
    let nonterminal_class = |k: &RuleKind| {
      matches!(
        k,
        RuleKind::Nonterminal { .. } | RuleKind::Transposition { .. }
      )
    };
    if nonterminal_class(&self.kind) && nonterminal_class(&other.kind) {
      return self.rhs_names() == other.rhs_names();
    }
    match (&self.kind, &other.kind) {
      (RuleKind::Terminal { token: a, .. }, RuleKind::Terminal { token: b, .. }) => a == b,
      (
        RuleKind::Insertion {
          rhs: ra,
          insertion_idx: ia,
          text: ta,
        },
        RuleKind::Insertion {
          rhs: rb,
          insertion_idx: ib,
          text: tb,
        },
      ) => ra == rb && ia == ib && ta == tb,
      _ => false,
    }
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.kind {
      RuleKind::Terminal { token, .. } => write!(f, "{} -> {}", self.lhs, token),
      RuleKind::Nonterminal { rhs, .. } => {
        write!(f, "{} ->", self.lhs)?;
        for s in rhs.iter() {
          write!(f, " {}", s)?;
        }
        Ok(())
      }
      RuleKind::Insertion {
        rhs,
        insertion_idx,
        text,
      } => write!(
        f,
        "{} -> {} (insert {} at {})",
        self.lhs, rhs, text, insertion_idx
      ),
      RuleKind::Transposition { rhs } => {
        write!(f, "{} -> {} {} (transposed)", self.lhs, rhs[0], rhs[1])
      }
    }
  }
}
