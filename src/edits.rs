use std::collections::HashMap;

use crate::grammar::Grammar;
use crate::rules::{Rule, RuleKind, TermText, EMPTY};

/// Flat elision cost charged for a deletable terminal that carries no
/// authored insertion cost
pub const DELETABLE_COST: f64 = 1.0;

/// Cheapest derivation of a symbol made entirely of insertable
/// terminals: its concatenated surface text and its cost. An empty
/// text means the symbol is nullable.
#[derive(Debug, Clone, PartialEq)]
struct Insertable {
  text: TermText,
  cost: f64,
}

fn rule_insertable(
  g: &Grammar,
  closure: &HashMap<String, Insertable>,
  rule: &Rule,
) -> Option<Insertable> {
  match &rule.kind {
    RuleKind::Terminal {
      token,
      text,
      insertion_cost,
      ..
    } => {
      if token == EMPTY {
        Some(Insertable {
          text: TermText::Empty,
          cost: rule.cost,
        })
      } else if let Some(c) = insertion_cost {
        Some(Insertable {
          text: text.clone(),
          cost: rule.cost + c,
        })
      } else if g.deletables.contains(token) {
        Some(Insertable {
          text: text.clone(),
          cost: rule.cost + DELETABLE_COST,
        })
      } else {
        None
      }
    }
    RuleKind::Nonterminal { rhs, .. } => {
      let mut text = TermText::Empty;
      let mut cost = rule.cost;
      for sym in rhs.iter() {
        let ins = closure.get(&sym.name)?;
        text = text.concat(&ins.text);
        cost += ins.cost;
      }
      Some(Insertable { text, cost })
    }
    // derived rules are never re-examined
    RuleKind::Insertion { .. } | RuleKind::Transposition { .. } => None,
  }
}

/// The text a kept RHS side contributes to a synthesized rule. Only a
/// terminal set sharing one inflected text counts: conjugation has to
/// see the whole phrase, so the map rides along on the derived rule.
/// Literal or heterogeneous sides contribute nothing; the parser echoes
/// the matched input for those.
fn kept_text(g: &Grammar, sym_name: &str) -> TermText {
  let mut shared: Option<&TermText> = None;
  for rule in g.rules_for(sym_name) {
    if rule.is_edit() {
      continue;
    }
    match &rule.kind {
      RuleKind::Terminal {
        text: text @ TermText::Inflected(_),
        ..
      } => match shared {
        None => shared = Some(text),
        Some(prev) if prev == text => {}
        Some(_) => return TermText::Empty,
      },
      _ => return TermText::Empty,
    }
  }
  shared.cloned().unwrap_or(TermText::Empty)
}

/// Least fixed point of the insertable relation. Costs are
/// nonnegative, so a cheaper derivation is found at most finitely many
/// times per symbol and iteration terminates.
fn insertable_closure(g: &Grammar) -> HashMap<String, Insertable> {
  let mut closure: HashMap<String, Insertable> = HashMap::new();

  let mut changed = true;
  while changed {
    changed = false;
    for sym in g.symbols.iter() {
      for rule in g.rules_for(&sym.name) {
        if let Some(ins) = rule_insertable(g, &closure, rule) {
          match closure.get(&sym.name) {
            Some(best) if best.cost <= ins.cost => {}
            _ => {
              closure.insert(sym.name.clone(), ins);
              changed = true;
            }
          }
        }
      }
    }
  }

  closure
}

/// Derives the three edit-rule families from the authored grammar:
/// nullable reductions and insertions (a unary rule standing in for a
/// binary rule whose other side the parser supplies), and
/// transpositions (reversed binary order). Runs once, after authoring
/// and before ambiguity detection; a second run adds nothing.
pub fn generate_edit_rules(g: &mut Grammar) {
  let closure = insertable_closure(g);

  let mut derived: Vec<Rule> = Vec::new();
  for sym in g.symbols.iter() {
    for rule in g.rules_for(&sym.name) {
      let (rhs, transposition_cost) = match &rule.kind {
        RuleKind::Nonterminal {
          rhs,
          transposition_cost,
        } if rhs.len() == 2 => (rhs, transposition_cost),
        _ => continue,
      };

      // a binary rule with an insertable side becomes a unary rule
      // whose synthesized side carries the derived surface text; with
      // both sides insertable we keep each sibling once and never
      // materialize a nullary rule
      for (removed, kept) in [(0usize, 1usize), (1, 0)].iter() {
        if let Some(ins) = closure.get(&rhs[*removed].name) {
          // the synthesized text keeps RHS order: elided text first
          // when position 0 was removed, last otherwise
          let kept = &rhs[*kept];
          let text = if *removed == 0 {
            ins.text.concat(&kept_text(g, &kept.name))
          } else {
            kept_text(g, &kept.name).concat(&ins.text)
          };
          derived.push(Rule {
            lhs: rule.lhs.clone(),
            kind: RuleKind::Insertion {
              rhs: kept.clone(),
              insertion_idx: *removed as u8,
              text,
            },
            cost: rule.cost + ins.cost,
            semantic: rule.semantic.clone(),
            grammatical_case: rule.grammatical_case,
            verb_form: rule.verb_form,
            person_number: rule.person_number,
          });
        }
      }

      if let Some(c) = transposition_cost {
        derived.push(Rule {
          lhs: rule.lhs.clone(),
          kind: RuleKind::Transposition {
            rhs: [rhs[1].clone(), rhs[0].clone()],
          },
          cost: rule.cost + c,
          semantic: rule.semantic.clone(),
          grammatical_case: rule.grammatical_case,
          verb_form: rule.verb_form,
          person_number: rule.person_number,
        });
      }
    }
  }

  for rule in derived {
    g.push_derived(rule);
  }
}
