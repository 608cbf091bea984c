use std::collections::HashSet;

use crate::error::GrammarError;
use crate::grammar::{GrammarBuilder, TerminalSpec};
use crate::rules::{InflectionMap, PersonNumber, Symbol, Tense, TermText, VerbForm};

/// Authored description of one verb's surface forms. The first three
/// are required; the rest are optional refinements.
#[derive(Debug, Clone, Default)]
pub struct VerbForms {
  pub one_sg: String,
  pub three_sg: String,
  pub pl: String,
  pub past: Option<String>,
  pub present_subjunctive: Option<String>,
  pub present_participle: Option<String>,
  pub past_participle: Option<String>,
}

impl VerbForms {
  pub fn new(one_sg: &str, three_sg: &str, pl: &str) -> Self {
    Self {
      one_sg: one_sg.to_string(),
      three_sg: three_sg.to_string(),
      pl: pl.to_string(),
      ..Default::default()
    }
  }

  pub fn past(mut self, past: &str) -> Self {
    self.past = Some(past.to_string());
    self
  }

  pub fn past_participle(mut self, form: &str) -> Self {
    self.past_participle = Some(form.to_string());
    self
  }

  pub fn present_participle(mut self, form: &str) -> Self {
    self.present_participle = Some(form.to_string());
    self
  }

  pub fn present_subjunctive(mut self, form: &str) -> Self {
    self.present_subjunctive = Some(form.to_string());
    self
  }

  /// The map every rule built from this descriptor shares
  pub fn inflection_map(&self) -> InflectionMap {
    InflectionMap {
      one_sg: self.one_sg.clone(),
      three_sg: self.three_sg.clone(),
      pl: self.pl.clone(),
      past: self.past.clone(),
    }
  }

  /// Surface forms in authoring order, with the tags the parser needs
  /// for tense matching and conjugation. Only the past family carries a
  /// tense.
  fn forms(&self) -> Vec<(&str, Option<Tense>, Option<PersonNumber>, Option<VerbForm>)> {
    let mut forms: Vec<(&str, Option<Tense>, Option<PersonNumber>, Option<VerbForm>)> = vec![
      (&self.one_sg, None, Some(PersonNumber::OneSg), None),
      (&self.three_sg, None, Some(PersonNumber::ThreeSg), None),
      (&self.pl, None, Some(PersonNumber::Pl), None),
    ];
    if let Some(past) = &self.past {
      forms.push((past, Some(Tense::Past), None, Some(VerbForm::Past)));
    }
    if let Some(f) = &self.present_subjunctive {
      forms.push((f, None, None, None));
    }
    if let Some(f) = &self.present_participle {
      forms.push((f, None, None, Some(VerbForm::PresentParticiple)));
    }
    if let Some(f) = &self.past_participle {
      forms.push((f, Some(Tense::Past), None, Some(VerbForm::PastParticiple)));
    }
    forms
  }
}

fn add_verb_rules(
  b: &mut GrammarBuilder,
  sym: &Symbol,
  verbs: &[VerbForms],
  mut insertion_cost: Option<f64>,
  text_override: Option<&InflectionMap>,
) -> Result<(), GrammarError> {
  for verb in verbs {
    if verb.one_sg.is_empty() || verb.three_sg.is_empty() || verb.pl.is_empty() {
      return Err(GrammarError::IllFormedRule {
        lhs: sym.name.clone(),
        rhs: format!("{:?}", verb),
        reason: "verb needs oneSg, threeSg and pl forms".to_string(),
      });
    }

    let map = text_override.cloned().unwrap_or_else(|| verb.inflection_map());

    // duplicate surface forms within one descriptor collapse silently,
    // e.g. "like" covers both oneSg and pl
    let mut seen: HashSet<&str> = HashSet::new();
    for (form, tense, person_number, verb_form) in verb.forms() {
      if !seen.insert(form) {
        continue;
      }
      b.add_terminal_rule(
        sym,
        form,
        TerminalSpec {
          text: Some(TermText::Inflected(map.clone())),
          tense,
          person_number,
          verb_form,
          insertion_cost: insertion_cost.take(),
          ..Default::default()
        },
      )?;
    }
  }
  Ok(())
}

/// Creates a nonterminal for a verb set and adds one terminal rule per
/// distinct surface form, every rule carrying the descriptor's shared
/// inflection map as its text. An insertion cost, if given, lands on
/// the first rule only.
pub fn add_verb_set(
  b: &mut GrammarBuilder,
  name_parts: &[&str],
  verbs: &[VerbForms],
  insertion_cost: Option<f64>,
) -> Result<Symbol, GrammarError> {
  let sym = b.new_symbol(name_parts)?;
  add_verb_rules(b, &sym, verbs, insertion_cost, None)?;
  Ok(sym)
}

/// Adds substitution forms to an existing verb set: matches on any of
/// `verbs`' forms carry the canonical set's inflection map, so the
/// parser renders the canonical surface string.
pub fn add_substituted_verb_set(
  b: &mut GrammarBuilder,
  sym: &Symbol,
  canonical: &InflectionMap,
  verbs: &[VerbForms],
) -> Result<(), GrammarError> {
  add_verb_rules(b, sym, verbs, None, Some(canonical))
}

/// Creates a nonterminal matching any of `words`, registering each as a
/// deletable so the edit-rule generator may elide it.
pub fn add_stop_words(
  b: &mut GrammarBuilder,
  name_parts: &[&str],
  words: &[&str],
) -> Result<Symbol, GrammarError> {
  let sym = b.new_symbol(name_parts)?;
  for word in words {
    b.deletable(word);
    b.add_terminal_rule(&sym, word, Default::default())?;
  }
  Ok(sym)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rules::RuleKind;

  #[test]
  fn test_verb_set_collapses_duplicate_forms() {
    let mut b = GrammarBuilder::new();
    let like = VerbForms::new("like", "likes", "like").past("liked");
    let sym = add_verb_set(&mut b, &["verb", "like"], &[like.clone()], None).unwrap();
    b.set_start(&sym);
    let g = b.compile().unwrap();

    let rules = g.rules_for("[verb-like]");
    // "like" covers oneSg and pl
    assert_eq!(rules.len(), 3);

    let map = TermText::Inflected(like.inflection_map());
    for rule in rules {
      match &rule.kind {
        RuleKind::Terminal { text, .. } => assert_eq!(text, &map),
        _ => panic!("expected terminal rule"),
      }
    }
  }

  #[test]
  fn test_past_family_is_tense_tagged() {
    let mut b = GrammarBuilder::new();
    let create = VerbForms::new("create", "creates", "create")
      .past("created")
      .present_participle("creating")
      .past_participle("createn");
    let sym = add_verb_set(&mut b, &["verb", "create"], &[create], None).unwrap();
    b.set_start(&sym);
    let g = b.compile().unwrap();

    for rule in g.rules_for("[verb-create]") {
      if let RuleKind::Terminal { token, tense, .. } = &rule.kind {
        let expect_past = token == "created" || token == "createn";
        assert_eq!(tense.is_some(), expect_past, "tense tag on {}", token);
      }
    }
  }

  #[test]
  fn test_person_number_tags_present_forms() {
    let mut b = GrammarBuilder::new();
    let like = VerbForms::new("like", "likes", "like").past("liked");
    let sym = add_verb_set(&mut b, &["verb", "like"], &[like], None).unwrap();
    b.set_start(&sym);
    let g = b.compile().unwrap();

    let person = |token: &str| {
      g.rules_for("[verb-like]")
        .iter()
        .find(|r| matches!(&r.kind, RuleKind::Terminal { token: t, .. } if t == token))
        .and_then(|r| r.person_number)
    };
    // "like" collapsed onto its first person slot
    assert_eq!(person("like"), Some(PersonNumber::OneSg));
    assert_eq!(person("likes"), Some(PersonNumber::ThreeSg));
    assert_eq!(person("liked"), None);
  }

  #[test]
  fn test_insertion_cost_on_first_rule_only() {
    let mut b = GrammarBuilder::new();
    let like = VerbForms::new("like", "likes", "like");
    let love = VerbForms::new("love", "loves", "love");
    let sym = add_verb_set(&mut b, &["verb", "like"], &[like, love], Some(0.5)).unwrap();
    b.set_start(&sym);
    let g = b.compile().unwrap();

    let costs: Vec<Option<f64>> = g
      .rules_for("[verb-like]")
      .iter()
      .map(|r| match &r.kind {
        RuleKind::Terminal { insertion_cost, .. } => *insertion_cost,
        _ => None,
      })
      .collect();
    assert_eq!(costs[0], Some(0.5));
    assert!(costs[1..].iter().all(|c| c.is_none()));
  }

  #[test]
  fn test_substituted_set_carries_canonical_text() {
    let mut b = GrammarBuilder::new();
    let create = VerbForms::new("create", "creates", "create").past("created");
    let canonical = create.inflection_map();
    let sym = add_verb_set(&mut b, &["verb", "create"], &[create], None).unwrap();

    let make = VerbForms::new("make", "makes", "make").past("made");
    add_substituted_verb_set(&mut b, &sym, &canonical, &[make]).unwrap();
    b.set_start(&sym);
    let g = b.compile().unwrap();

    let rules = g.rules_for("[verb-create]");
    let made = rules
      .iter()
      .find(|r| matches!(&r.kind, RuleKind::Terminal { token, .. } if token == "made"))
      .unwrap();
    match &made.kind {
      RuleKind::Terminal { text, .. } => {
        assert_eq!(text, &TermText::Inflected(canonical));
      }
      _ => unreachable!(),
    }
  }

  #[test]
  fn test_stop_words_register_deletables() {
    let mut b = GrammarBuilder::new();
    let sym = add_stop_words(&mut b, &["opt", "the"], &["the", "a"]).unwrap();
    b.set_start(&sym);
    let g = b.compile().unwrap();

    assert_eq!(g.rules_for("[opt-the]").len(), 2);
    assert!(g.deletables.contains("the"));
    assert!(g.deletables.contains("a"));
  }
}
