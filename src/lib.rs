#[macro_use]
extern crate lazy_static;

pub mod ambiguity;
pub mod edits;
pub mod error;
pub mod grammar;
pub mod rules;
pub mod semantics;
pub mod syntree;
pub mod verbs;

pub use crate::ambiguity::{check, CheckOptions, Report};
pub use crate::edits::generate_edit_rules;
pub use crate::error::{Err, GrammarError};
pub use crate::grammar::{Grammar, GrammarBuilder, NonterminalSpec, TerminalSpec};
pub use crate::rules::{InflectionMap, Rule, RuleKind, Symbol, TermText, EMPTY};
pub use crate::semantics::{Semantic, SemanticRegistry};
pub use crate::verbs::{add_stop_words, add_substituted_verb_set, add_verb_set, VerbForms};

#[test]
fn test_author_compile_check_pipeline() {
  let mut reg = SemanticRegistry::new();
  let repos = reg.define("repositories", 0.0, 0, 2).unwrap();
  let created = reg.define("created", 0.5, 1, 1).unwrap();
  let sem = Semantic::reduce(&created, &repos).unwrap();

  let mut b = GrammarBuilder::new();
  let start = b.new_symbol(&["start"]).unwrap();
  let opt_the = add_stop_words(&mut b, &["opt", "the"], &["the"]).unwrap();
  let verb = add_verb_set(
    &mut b,
    &["verb", "create"],
    &[VerbForms::new("create", "creates", "create").past("created")],
    None,
  )
  .unwrap();
  let head = b.new_symbol(&["repos", "head"]).unwrap();
  b.add_terminal_rule(&head, "repos", Default::default()).unwrap();

  let np = b.new_symbol(&["repos", "np"]).unwrap();
  b.add_nonterminal_rule(&np, &[&opt_the, &head], Default::default()).unwrap();
  b.add_nonterminal_rule(
    &start,
    &[&verb, &np],
    NonterminalSpec {
      semantic: Some(sem),
      ..Default::default()
    },
  )
  .unwrap();
  b.set_start(&start);

  let mut g = b.compile().unwrap();
  generate_edit_rules(&mut g);

  // "the" is deletable, so [repos-np] picked up a derived stand-in
  assert!(g
    .rules_for("[repos-np]")
    .iter()
    .any(|r| matches!(&r.kind, RuleKind::Insertion { .. })));

  // semantic cost rode into the start rule's cost
  assert_eq!(g.rules_for("[start]")[0].cost, 0.5);

  let report = check(&g, &CheckOptions::default()).unwrap();
  assert!(report.ambiguities.is_empty());
}
