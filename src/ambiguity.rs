use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use crate::edits::generate_edit_rules;
use crate::error::GrammarError;
use crate::grammar::{Grammar, GrammarBuilder};
use crate::rules::{Rule, RuleKind};
use crate::syntree::SynTree;

/// Detector configuration.
///
/// `syms_limit` bounds each derivation path's symbol budget. It is a
/// heuristic, not a soundness guarantee: ambiguities whose smallest
/// witness needs more symbols are silently missed. Larger limits are
/// more exhaustive and exponentially slower.
#[derive(Debug, Clone)]
pub struct CheckOptions {
  pub syms_limit: usize,
  /// Every distinct witnessing pair instead of one per rule pair
  pub find_all: bool,
  /// Replace the input grammar with the built-in ambiguity fixtures
  /// and verify each is flagged
  pub use_test_rules: bool,
  /// Suppress witness printing (benchmark mode)
  pub no_output: bool,
}

impl Default for CheckOptions {
  fn default() -> Self {
    Self {
      syms_limit: 14,
      find_all: false,
      use_test_rules: false,
      no_output: false,
    }
  }
}

/// A witnessing pair: two derivations of one nonterminal with the same
/// fringe, trimmed to their differing subtrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Ambiguity {
  pub symbol: String,
  pub tree_a: SynTree<String, String>,
  pub tree_b: SynTree<String, String>,
}

impl fmt::Display for Ambiguity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "ambiguous derivations of {}:", self.symbol)?;
    writeln!(f, "{}", self.tree_a)?;
    write!(f, "{}", self.tree_b)
  }
}

/// Outcome of a detector run. `test_misses` is only populated in
/// self-test mode: fixture symbols whose ambiguity went undetected.
#[derive(Debug)]
pub struct Report {
  pub ambiguities: Vec<Ambiguity>,
  pub test_misses: Vec<String>,
}

/// Deferred right siblings of enclosing binary rules, in LIFO order.
/// A persistent list: sibling paths share suffixes without copying.
type SymStack = Option<Rc<SymNode>>;

#[derive(Debug)]
struct SymNode {
  name: String,
  rest: SymStack,
}

fn stack_push(stack: &SymStack, name: &str) -> SymStack {
  Some(Rc::new(SymNode {
    name: name.to_string(),
    rest: stack.clone(),
  }))
}

fn stack_eq(a: &SymStack, b: &SymStack) -> bool {
  let mut a = a;
  let mut b = b;
  loop {
    match (a, b) {
      (None, None) => return true,
      (Some(x), Some(y)) => {
        if Rc::ptr_eq(x, y) {
          return true;
        }
        if x.name != y.name {
          return false;
        }
        a = &x.rest;
        b = &y.rest;
      }
      _ => return false,
    }
  }
}

/// Reverse list of the rules a path has applied, for later tree
/// reconstruction
type RuleChain = Option<Rc<ChainNode>>;

#[derive(Debug)]
struct ChainNode {
  rule: Rc<Rule>,
  prev: RuleChain,
}

/// A partial leftmost derivation from one root rule
#[derive(Debug, Clone)]
struct Path {
  /// Terminal string produced so far, space-prefixed so prefix
  /// equality is a cheap string compare
  terminals: String,
  /// Leftmost nonterminal to expand next
  next_sym: Option<String>,
  next_syms: SymStack,
  /// Total symbols ever placed; the enumeration budget
  syms_count: usize,
  chain: RuleChain,
}

/// Applies `rule` to a path's leftmost frontier
fn apply(rule: &Rc<Rule>, terminals: &str, stack: &SymStack, count: usize, chain: &RuleChain) -> Path {
  let chain = Some(Rc::new(ChainNode {
    rule: rule.clone(),
    prev: chain.clone(),
  }));
  match &rule.kind {
    RuleKind::Terminal { token, .. } => {
      // a terminal branch completed: resume with the deferred sibling
      let (next_sym, next_syms) = match stack {
        Some(node) => (Some(node.name.clone()), node.rest.clone()),
        None => (None, None),
      };
      Path {
        terminals: format!("{} {}", terminals, token),
        next_sym,
        next_syms,
        syms_count: count + 1,
        chain,
      }
    }
    RuleKind::Nonterminal { rhs, .. } => {
      if rhs.len() == 1 {
        Path {
          terminals: terminals.to_string(),
          next_sym: Some(rhs[0].name.clone()),
          next_syms: stack.clone(),
          syms_count: count + 1,
          chain,
        }
      } else {
        Path {
          terminals: terminals.to_string(),
          next_sym: Some(rhs[0].name.clone()),
          next_syms: stack_push(stack, &rhs[1].name),
          syms_count: count + 2,
          chain,
        }
      }
    }
    RuleKind::Insertion { .. } | RuleKind::Transposition { .. } => {
      unreachable!("edit rules are not enumerated")
    }
  }
}

/// All bounded paths from one root rule, indexed by produced terminals
struct RootPaths {
  paths: Vec<Path>,
  by_terminals: HashMap<String, Vec<usize>>,
}

impl RootPaths {
  fn push(&mut self, p: Path) {
    self
      .by_terminals
      .entry(p.terminals.clone())
      .or_insert_with(Vec::new)
      .push(self.paths.len());
    self.paths.push(p);
  }
}

fn enumerate_root(g: &Grammar, root: &Rc<Rule>, syms_limit: usize) -> RootPaths {
  let mut root_paths = RootPaths {
    paths: Vec::new(),
    by_terminals: HashMap::new(),
  };
  root_paths.push(apply(root, "", &None, 0, &None));

  // the path list grows while we walk it, so index rather than iterate
  let mut idx = 0;
  while idx < root_paths.paths.len() {
    let p = root_paths.paths[idx].clone();
    idx += 1;

    if p.syms_count >= syms_limit {
      continue;
    }
    let next = match &p.next_sym {
      Some(n) => n.clone(),
      None => continue,
    };
    for rule in g.rules_for(&next) {
      if rule.is_edit() {
        continue;
      }
      root_paths.push(apply(rule, &p.terminals, &p.next_syms, p.syms_count, &p.chain));
    }
  }

  root_paths
}

/// Replays a recorded leftmost derivation into a tree. Nonterminals the
/// enumeration never expanded stay as leaves.
fn build_tree(chain: &RuleChain) -> SynTree<String, String> {
  let mut rules: Vec<Rc<Rule>> = Vec::new();
  let mut cur = chain;
  while let Some(node) = cur {
    rules.push(node.rule.clone());
    cur = &node.prev;
  }
  rules.reverse();

  let mut queue: VecDeque<Rc<Rule>> = rules.into();
  let root = queue.pop_front().expect("empty rule chain");
  expand_rule(&root, &mut queue)
}

fn expand_rule(rule: &Rc<Rule>, queue: &mut VecDeque<Rc<Rule>>) -> SynTree<String, String> {
  let children = match &rule.kind {
    RuleKind::Terminal { token, .. } => vec![SynTree::Leaf(token.clone())],
    RuleKind::Nonterminal { rhs, .. } => rhs
      .iter()
      .map(|sym| expand_symbol(&sym.name, queue))
      .collect(),
    RuleKind::Insertion { .. } | RuleKind::Transposition { .. } => {
      unreachable!("edit rules are not enumerated")
    }
  };
  SynTree::Branch(rule.lhs.name.clone(), children)
}

fn expand_symbol(name: &str, queue: &mut VecDeque<Rc<Rule>>) -> SynTree<String, String> {
  // the chain records a leftmost derivation, so the front rule always
  // belongs to the leftmost unexpanded nonterminal
  let expandable = match queue.front() {
    Some(front) => front.lhs.name == name,
    None => false,
  };
  if expandable {
    let rule = queue.pop_front().unwrap();
    expand_rule(&rule, queue)
  } else {
    SynTree::Leaf(name.to_string())
  }
}

/// Prunes subtrees both derivations share, leaving the minimal
/// differing pair. Walks the rightmost spine: trailing equal children
/// are dropped, then the rightmost differing pair is trimmed
/// recursively. Symmetric in its arguments.
fn diff_trim(a: &mut SynTree<String, String>, b: &mut SynTree<String, String>) {
  if a == b {
    return;
  }
  if let (SynTree::Branch(_, ca), SynTree::Branch(_, cb)) = (a, b) {
    while ca.len() > 1 && cb.len() > 1 && ca.last() == cb.last() {
      ca.pop();
      cb.pop();
    }
    if let (Some(la), Some(lb)) = (ca.last_mut(), cb.last_mut()) {
      diff_trim(la, lb);
    }
  }
}

/// Compares every path of root rule `a` against every same-fringe path
/// of root rule `b`. The `a` side is visited in ascending `syms_count`
/// (stable), so the first hit is the minimal witness.
fn find_witnesses(
  symbol: &str,
  a: &RootPaths,
  b: &RootPaths,
  find_all: bool,
  out: &mut Vec<Ambiguity>,
) {
  let mut order: Vec<usize> = (0..a.paths.len()).collect();
  order.sort_by_key(|&i| a.paths[i].syms_count);

  let mut seen: Vec<(SynTree<String, String>, SynTree<String, String>)> = Vec::new();

  for &i in order.iter() {
    let pa = &a.paths[i];
    let matches = match b.by_terminals.get(&pa.terminals) {
      Some(m) => m,
      None => continue,
    };
    for &j in matches.iter() {
      let pb = &b.paths[j];
      if pa.next_sym != pb.next_sym || !stack_eq(&pa.next_syms, &pb.next_syms) {
        continue;
      }

      let mut tree_a = build_tree(&pa.chain);
      let mut tree_b = build_tree(&pb.chain);
      diff_trim(&mut tree_a, &mut tree_b);

      if !find_all {
        out.push(Ambiguity {
          symbol: symbol.to_string(),
          tree_a,
          tree_b,
        });
        return;
      }

      let dup = seen
        .iter()
        .any(|(x, y)| (x == &tree_a && y == &tree_b) || (x == &tree_b && y == &tree_a));
      if !dup {
        seen.push((tree_a.clone(), tree_b.clone()));
        out.push(Ambiguity {
          symbol: symbol.to_string(),
          tree_a,
          tree_b,
        });
      }
    }
  }
}

fn check_grammar(g: &Grammar, opts: &CheckOptions) -> Vec<Ambiguity> {
  let mut out = Vec::new();

  for sym in g.symbols.iter() {
    let roots: Vec<&Rc<Rule>> = g
      .rules_for(&sym.name)
      .iter()
      .filter(|r| !r.is_edit())
      .collect();
    if roots.len() < 2 {
      continue;
    }

    let enumerated: Vec<RootPaths> = roots
      .iter()
      .map(|r| enumerate_root(g, r, opts.syms_limit))
      .collect();

    for a in 0..enumerated.len() {
      for b in (a + 1)..enumerated.len() {
        find_witnesses(&sym.name, &enumerated[a], &enumerated[b], opts.find_all, &mut out);
      }
    }
  }

  out
}

/// Runs the detector. In self-test mode the input grammar is ignored:
/// the built-in fixtures are checked instead and any fixture symbol
/// whose ambiguity went undetected is reported as a miss.
pub fn check(g: &Grammar, opts: &CheckOptions) -> Result<Report, GrammarError> {
  if opts.syms_limit < 1 {
    return Err(GrammarError::BadConfig(
      "symsLimit must be at least 1".to_string(),
    ));
  }

  if opts.use_test_rules {
    let fixture = self_test_grammar()?;
    let ambiguities = check_grammar(&fixture, opts);
    let test_misses = fixture
      .symbols
      .iter()
      .filter(|s| s.name.contains("ambig"))
      .filter(|s| !ambiguities.iter().any(|a| a.symbol == s.name))
      .map(|s| s.name.clone())
      .collect();
    return Ok(Report {
      ambiguities,
      test_misses,
    });
  }

  Ok(Report {
    ambiguities: check_grammar(g, opts),
    test_misses: Vec::new(),
  })
}

/// Fixture grammar of deliberately ambiguous nonterminals, for
/// exercising the detector against itself. Every symbol with `ambig`
/// in its name must be flagged.
pub fn self_test_grammar() -> Result<Grammar, GrammarError> {
  let mut b = GrammarBuilder::new();
  let start = b.new_symbol(&["test", "start"])?;

  // two rules deriving the same token outright
  let direct = b.new_symbol(&["ambig", "direct"])?;
  let da = b.new_symbol(&["direct", "a"])?;
  let db = b.new_symbol(&["direct", "b"])?;
  b.add_terminal_rule(&da, "x", Default::default())?;
  b.add_terminal_rule(&db, "x", Default::default())?;
  b.add_nonterminal_rule(&direct, &[&da], Default::default())?;
  b.add_nonterminal_rule(&direct, &[&db], Default::default())?;

  // the same token, but one side hides it under a unary chain
  let deep = b.new_symbol(&["ambig", "deep"])?;
  let chain = b.new_symbol(&["deep", "chain"])?;
  let word = b.new_symbol(&["deep", "word"])?;
  let flat = b.new_symbol(&["deep", "flat"])?;
  b.add_terminal_rule(&word, "y", Default::default())?;
  b.add_nonterminal_rule(&chain, &[&word], Default::default())?;
  b.add_terminal_rule(&flat, "y", Default::default())?;
  b.add_nonterminal_rule(&deep, &[&chain], Default::default())?;
  b.add_nonterminal_rule(&deep, &[&flat], Default::default())?;

  // equal fringes with a shared frontier symbol still pending
  let frontier = b.new_symbol(&["ambig", "frontier"])?;
  let fa = b.new_symbol(&["frontier", "a"])?;
  let fb = b.new_symbol(&["frontier", "b"])?;
  let tail = b.new_symbol(&["frontier", "tail"])?;
  b.add_terminal_rule(&fa, "z", Default::default())?;
  b.add_terminal_rule(&fb, "z", Default::default())?;
  b.add_terminal_rule(&tail, "t", Default::default())?;
  b.add_nonterminal_rule(&frontier, &[&fa, &tail], Default::default())?;
  b.add_nonterminal_rule(&frontier, &[&fb, &tail], Default::default())?;

  // control: two rules, unambiguous
  let clean = b.new_symbol(&["clean"])?;
  b.add_terminal_rule(&clean, "c", Default::default())?;
  b.add_terminal_rule(&clean, "d", Default::default())?;

  b.add_nonterminal_rule(&start, &[&direct], Default::default())?;
  b.add_nonterminal_rule(&start, &[&deep], Default::default())?;
  b.add_nonterminal_rule(&start, &[&frontier], Default::default())?;
  b.add_nonterminal_rule(&start, &[&clean], Default::default())?;
  b.set_start(&start);

  let mut g = b.compile()?;
  generate_edit_rules(&mut g);
  Ok(g)
}
