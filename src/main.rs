use std::env;
use std::process;

use askgram::rules::GrammaticalCase;
use askgram::{
  add_stop_words, add_substituted_verb_set, add_verb_set, check, generate_edit_rules, CheckOptions,
  Err, Grammar, GrammarBuilder, NonterminalSpec, Semantic, SemanticRegistry, VerbForms,
};

fn usage(prog_name: &str) -> String {
  format!(
    r"
Usage: {} [options]

Compiles the demo question-answering grammar, derives edit rules and
reports ambiguity.

Options:
  -h, --help         Print this message
  -g, --grammar      Print the compiled grammar
  --syms-limit N     Per-path symbol budget for ambiguity detection (default 14)
  --find-all         Report every distinct witnessing pair, not one per rule pair
  --test-rules       Check the built-in ambiguity fixtures instead of the grammar
  -q, --no-output    Suppress witness printing",
    prog_name
  )
}

/// The demo domain: questions about people, repositories and companies
fn build_demo_grammar() -> Result<Grammar, Err> {
  let mut reg = SemanticRegistry::new();
  let repositories = reg.define("repositories", 0.0, 0, 2)?;
  let people = reg.define("people", 0.0, 0, 2)?;
  let companies = reg.define("companies", 0.0, 0, 2)?;
  let created = reg.define("created", 0.5, 1, 1)?;
  let likes = reg.define("likes", 0.5, 1, 1)?;
  let works_at = reg.define("works-at", 0.5, 1, 1)?;

  let mut b = GrammarBuilder::new();
  let start = b.new_symbol(&["start"])?;

  let opt_the = add_stop_words(&mut b, &["opt", "the"], &["the"])?;

  let verb_create = add_verb_set(
    &mut b,
    &["verb", "create"],
    &[VerbForms::new("create", "creates", "create")
      .past("created")
      .present_participle("creating")],
    None,
  )?;
  let canonical_create = VerbForms::new("create", "creates", "create")
    .past("created")
    .inflection_map();
  add_substituted_verb_set(
    &mut b,
    &verb_create,
    &canonical_create,
    &[VerbForms::new("make", "makes", "make").past("made")],
  )?;

  let verb_like = add_verb_set(
    &mut b,
    &["verb", "like"],
    &[VerbForms::new("like", "likes", "like").past("liked")],
    None,
  )?;
  let verb_work = add_verb_set(
    &mut b,
    &["verb", "work"],
    &[VerbForms::new("work", "works", "work").past("worked")],
    None,
  )?;
  let at = b.new_symbol(&["prep", "at"])?;
  b.add_terminal_rule(&at, "at", Default::default())?;

  let repos_head = b.new_symbol(&["repos", "head"])?;
  b.add_terminal_rule(&repos_head, "repos", Default::default())?;
  b.add_terminal_rule(&repos_head, "repositories", Default::default())?;

  let people_head = b.new_symbol(&["people", "head"])?;
  b.add_terminal_rule(&people_head, "people", Default::default())?;
  b.add_terminal_rule(&people_head, "users", Default::default())?;

  let companies_head = b.new_symbol(&["companies", "head"])?;
  b.add_terminal_rule(&companies_head, "companies", Default::default())?;

  let repos_np = b.new_symbol(&["repos", "np"])?;
  b.add_nonterminal_rule(
    &repos_np,
    &[&opt_the, &repos_head],
    NonterminalSpec {
      semantic: Some(repositories.clone()),
      ..Default::default()
    },
  )?;

  let people_np = b.new_symbol(&["people", "np"])?;
  b.add_nonterminal_rule(
    &people_np,
    &[&opt_the, &people_head],
    NonterminalSpec {
      semantic: Some(people.clone()),
      grammatical_case: Some(GrammaticalCase::Nominative),
      ..Default::default()
    },
  )?;

  let companies_np = b.new_symbol(&["companies", "np"])?;
  b.add_nonterminal_rule(
    &companies_np,
    &[&opt_the, &companies_head],
    NonterminalSpec {
      semantic: Some(companies.clone()),
      ..Default::default()
    },
  )?;

  // "repos people created" and, via transposition, "repos created people"
  let repos_rel = b.new_symbol(&["repos", "rel"])?;
  b.add_nonterminal_rule(
    &repos_rel,
    &[&people_np, &verb_create],
    NonterminalSpec {
      semantic: Some(Semantic::reduce(&created, &people)?),
      transposition_cost: Some(1.0),
      ..Default::default()
    },
  )?;

  let repos_query = b.new_symbol(&["repos", "query"])?;
  b.add_nonterminal_rule(&repos_query, &[&repos_np, &repos_rel], Default::default())?;

  // "people that like repos"
  let people_rel = b.new_symbol(&["people", "rel"])?;
  b.add_nonterminal_rule(
    &people_rel,
    &[&verb_like, &repos_np],
    NonterminalSpec {
      semantic: Some(Semantic::reduce(&likes, &repositories)?),
      ..Default::default()
    },
  )?;

  // "people working at companies"
  let at_companies = b.new_symbol(&["at", "companies"])?;
  b.add_nonterminal_rule(&at_companies, &[&at, &companies_np], Default::default())?;
  b.add_nonterminal_rule(
    &people_rel,
    &[&verb_work, &at_companies],
    NonterminalSpec {
      semantic: Some(Semantic::reduce(&works_at, &companies)?),
      ..Default::default()
    },
  )?;

  let people_query = b.new_symbol(&["people", "query"])?;
  b.add_nonterminal_rule(&people_query, &[&people_np, &people_rel], Default::default())?;

  b.add_nonterminal_rule(&start, &[&repos_query], Default::default())?;
  b.add_nonterminal_rule(&start, &[&people_query], Default::default())?;
  b.set_start(&start);

  let mut g = b.compile()?;
  generate_edit_rules(&mut g);
  Ok(g)
}

fn main() {
  let opts: Vec<String> = env::args().collect();
  let prog_name = opts[0].clone();

  let mut check_opts = CheckOptions::default();
  let mut print_grammar = false;

  let mut args = opts.into_iter().skip(1);
  while let Some(o) = args.next() {
    if o == "-h" || o == "--help" {
      println!("{}", usage(&prog_name));
      process::exit(0);
    } else if o == "-g" || o == "--grammar" {
      print_grammar = true;
    } else if o == "--find-all" {
      check_opts.find_all = true;
    } else if o == "--test-rules" {
      check_opts.use_test_rules = true;
    } else if o == "-q" || o == "--no-output" {
      check_opts.no_output = true;
    } else if o == "--syms-limit" {
      let value = args.next().and_then(|v| v.parse::<usize>().ok());
      match value {
        Some(n) => check_opts.syms_limit = n,
        None => {
          eprintln!("--syms-limit needs a number");
          println!("{}", usage(&prog_name));
          process::exit(1);
        }
      }
    } else {
      eprintln!("unknown option {}", o);
      println!("{}", usage(&prog_name));
      process::exit(1);
    }
  }

  let grammar = match build_demo_grammar() {
    Ok(g) => g,
    Err(e) => {
      eprintln!("error compiling grammar: {}", e);
      process::exit(1);
    }
  };

  if print_grammar {
    println!("{}", grammar);
  }

  let report = match check(&grammar, &check_opts) {
    Ok(r) => r,
    Err(e) => {
      eprintln!("error: {}", e);
      process::exit(1);
    }
  };

  println!(
    "Found {} ambiguit{}",
    report.ambiguities.len(),
    if report.ambiguities.len() == 1 { "y" } else { "ies" }
  );
  if !check_opts.no_output {
    for amb in report.ambiguities.iter() {
      eprintln!("{}\n", amb);
    }
  }

  if !report.test_misses.is_empty() {
    for miss in report.test_misses.iter() {
      eprintln!("fixture {} was not flagged as ambiguous", miss);
    }
    process::exit(1);
  }
}
