use std::error::Error;

/// Boxed static error type, for binary-level fallibility
pub type Err = Box<dyn Error + 'static>;

/// Everything that can go wrong while authoring or checking a grammar.
/// Authoring errors are fatal: compilation aborts with the offending
/// LHS and RHS in the message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GrammarError {
  #[error("duplicate symbol {0}")]
  DuplicateSymbol(String),

  #[error("ill-formed symbol name part {0:?}")]
  IllFormedName(String),

  #[error("duplicate rule {lhs} -> {rhs}")]
  DuplicateRule { lhs: String, rhs: String },

  #[error("ill-formed rule {lhs} -> {rhs}: {reason}")]
  IllFormedRule {
    lhs: String,
    rhs: String,
    reason: String,
  },

  #[error("unknown symbol {name} referenced by {lhs}")]
  UnknownSymbol { name: String, lhs: String },

  #[error("duplicate semantic {0}")]
  DuplicateSemantic(String),

  #[error("semantic arity mismatch: {0}")]
  ArityMismatch(String),

  #[error("no start symbol set")]
  MissingStart,

  #[error("bad config: {0}")]
  BadConfig(String),
}
