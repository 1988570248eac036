use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::grammar::Grammar;
use crate::rules::Symbol;

/// A unary rewrite chain collapsed to a single edge: `parent` derives
/// `child` through `path` with probability `score`. Reflexive rules
/// (`parent == child`, score 1.0) carry a single-element path.
#[derive(Debug, Clone)]
pub struct ClosedRule {
  pub parent: Symbol,
  pub child: Symbol,
  pub score: f64,
  /// The best chain from parent to child, both inclusive.
  pub path: Vec<Symbol>,
}

impl fmt::Display for ClosedRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ~> {} # {}", self.parent, self.child, self.score)
  }
}

/// Best-score closure of the grammar's unary rules.
///
/// Nodes are grammar states, edges are unary rules weighted by their
/// scores, and "best" means maximum product along the chain. Built once
/// next to the grammar; the chart consults closed rules instead of raw
/// unary rules, so applying a whole chain costs one lookup.
#[derive(Debug, Default)]
pub struct UnaryClosure {
  rules: Vec<Arc<ClosedRule>>,
  by_parent: HashMap<Symbol, Vec<Arc<ClosedRule>>>,
  by_child: HashMap<Symbol, Vec<Arc<ClosedRule>>>,
}

impl UnaryClosure {
  pub fn from_grammar(grammar: &Grammar) -> Self {
    let mut relaxation = Relaxation::default();
    for state in grammar.states() {
      for rule in grammar.unary_by_child(state.as_str()) {
        relaxation.relax(&rule.parent, None, &rule.child, rule.score);
      }
    }
    // One sweep over intermediates in sorted order, not a fixpoint: a
    // chain that needs a second pass through an earlier intermediate
    // stays undiscovered. Markovized grammars keep unary chains short
    // enough that this does not come up.
    for state in grammar.states() {
      relaxation.sweep(state);
    }
    for state in grammar.states() {
      relaxation.set_reflexive(state);
    }

    let mut pairs: Vec<(Symbol, Symbol)> = relaxation.edges.keys().cloned().collect();
    pairs.sort();
    let mut rules = Vec::with_capacity(pairs.len());
    let mut by_parent: HashMap<Symbol, Vec<Arc<ClosedRule>>> = HashMap::new();
    let mut by_child: HashMap<Symbol, Vec<Arc<ClosedRule>>> = HashMap::new();
    for (parent, child) in pairs {
      let rule = Arc::new(ClosedRule {
        score: relaxation.score_of(&parent, &child),
        path: relaxation.extract_path(&parent, &child),
        parent: parent.clone(),
        child: child.clone(),
      });
      by_parent
        .entry(parent)
        .or_insert_with(Vec::new)
        .push(Arc::clone(&rule));
      by_child
        .entry(child)
        .or_insert_with(Vec::new)
        .push(Arc::clone(&rule));
      rules.push(rule);
    }
    tracing::debug!(closed = rules.len(), "computed unary closure");
    Self {
      rules,
      by_parent,
      by_child,
    }
  }

  /// All closed rules, sorted by (parent, child).
  pub fn rules(&self) -> &[Arc<ClosedRule>] {
    &self.rules
  }

  pub fn closed_by_parent(&self, parent: &str) -> &[Arc<ClosedRule>] {
    self
      .by_parent
      .get(parent)
      .map(|rules| rules.as_slice())
      .unwrap_or(&[])
  }

  pub fn closed_by_child(&self, child: &str) -> &[Arc<ClosedRule>] {
    self
      .by_child
      .get(child)
      .map(|rules| rules.as_slice())
      .unwrap_or(&[])
  }

  pub fn closed(&self, parent: &str, child: &str) -> Option<&Arc<ClosedRule>> {
    self
      .closed_by_parent(parent)
      .iter()
      .find(|rule| rule.child.as_str() == child)
  }
}

/// Working state for the relaxation: best score and witness intermediate
/// per (parent, child) pair, plus adjacency lists feeding the sweep.
#[derive(Debug, Default)]
struct Relaxation {
  edges: HashMap<(Symbol, Symbol), (f64, Option<Symbol>)>,
  out_edges: HashMap<Symbol, Vec<Symbol>>,
  in_edges: HashMap<Symbol, Vec<Symbol>>,
}

impl Relaxation {
  /// Records `score` for parent -> child if it strictly beats the best
  /// known score; a tie keeps the witness recorded first. A witness equal
  /// to either endpoint would put a cycle in the path and is skipped.
  fn relax(&mut self, parent: &Symbol, witness: Option<&Symbol>, child: &Symbol, score: f64) {
    if let Some(witness) = witness {
      if witness == parent || witness == child {
        return;
      }
    }
    let key = (parent.clone(), child.clone());
    match self.edges.get_mut(&key) {
      Some(edge) => {
        if score > edge.0 {
          *edge = (score, witness.cloned());
        }
      }
      None => {
        self.edges.insert(key, (score, witness.cloned()));
        self
          .out_edges
          .entry(parent.clone())
          .or_insert_with(Vec::new)
          .push(child.clone());
        self
          .in_edges
          .entry(child.clone())
          .or_insert_with(Vec::new)
          .push(parent.clone());
      }
    }
  }

  /// Composes every edge ending at `state` with every edge starting at
  /// it. New pairs never have `state` as an endpoint, so the snapshots
  /// stay complete while we mutate.
  fn sweep(&mut self, state: &Symbol) {
    let parents = match self.in_edges.get(state) {
      Some(parents) => parents.clone(),
      None => return,
    };
    let children = match self.out_edges.get(state) {
      Some(children) => children.clone(),
      None => return,
    };
    for parent in &parents {
      for child in &children {
        let score = self.score_of(parent, state) * self.score_of(state, child);
        self.relax(parent, Some(state), child, score);
      }
    }
  }

  /// Zero-length chains: every state derives itself with probability one,
  /// whatever cycle score the sweep may have recorded for the pair.
  fn set_reflexive(&mut self, state: &Symbol) {
    let key = (state.clone(), state.clone());
    if !self.edges.contains_key(&key) {
      self
        .out_edges
        .entry(state.clone())
        .or_insert_with(Vec::new)
        .push(state.clone());
      self
        .in_edges
        .entry(state.clone())
        .or_insert_with(Vec::new)
        .push(state.clone());
    }
    self.edges.insert(key, (1.0, None));
  }

  fn score_of(&self, parent: &Symbol, child: &Symbol) -> f64 {
    self.edges[&(parent.clone(), child.clone())].0
  }

  /// Unfolds recorded witnesses into the full parent-to-child chain.
  fn extract_path(&self, parent: &Symbol, child: &Symbol) -> Vec<Symbol> {
    let mut path = vec![parent.clone()];
    let (_, witness) = &self.edges[&(parent.clone(), child.clone())];
    if let Some(witness) = witness {
      let head = self.extract_path(parent, witness);
      path.extend(head[1..head.len() - 1].iter().cloned());
      path.push(witness.clone());
      let tail = self.extract_path(witness, child);
      path.extend(tail[1..tail.len() - 1].iter().cloned());
    }
    if path.len() == 1 && parent == child {
      return path;
    }
    path.push(child.clone());
    path
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tree::Tree;

  fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
  }

  fn grammar(sources: &[&str]) -> Grammar {
    let trees: Vec<Tree> = sources.iter().map(|s| s.parse().unwrap()).collect();
    Grammar::from_trees(&trees)
  }

  fn labels(path: &[Symbol]) -> Vec<&str> {
    path.iter().map(|s| s.as_str()).collect()
  }

  #[test]
  fn every_state_gets_a_reflexive_rule() {
    let grammar = grammar(&["(ROOT (S (NP (DT the) (NN dog)) (VBD barked)))"]);
    let closure = UnaryClosure::from_grammar(&grammar);
    // Includes states like DT that no unary rule touches.
    for state in grammar.states() {
      let rule = closure.closed(state.as_str(), state.as_str()).unwrap();
      assert_eq!(rule.score, 1.0);
      assert_eq!(labels(&rule.path), vec![state.as_str()]);
    }
  }

  #[test]
  fn chains_compose_through_intermediates() {
    let grammar = grammar(&["(ROOT (S (VP (VBD ran))))"]);
    let closure = UnaryClosure::from_grammar(&grammar);
    let rule = closure.closed("ROOT", "VBD").unwrap();
    assert_eq!(rule.score, 1.0);
    assert_eq!(labels(&rule.path), vec!["ROOT", "S", "VP", "VBD"]);
    let rule = closure.closed("ROOT", "VP").unwrap();
    assert_eq!(labels(&rule.path), vec!["ROOT", "S", "VP"]);
  }

  #[test]
  fn better_path_beats_direct_rule() {
    let mut sources = vec!["(A (B b))"];
    for _ in 0..9 {
      sources.push("(A (X (B b)))");
    }
    let closure = UnaryClosure::from_grammar(&grammar(&sources));
    let rule = closure.closed("A", "B").unwrap();
    assert!(close(rule.score, 0.9));
    assert_eq!(labels(&rule.path), vec!["A", "X", "B"]);
  }

  #[test]
  fn equal_paths_keep_the_first_intermediate() {
    let closure = UnaryClosure::from_grammar(&grammar(&["(A (X (B b)))", "(A (Y (B c)))"]));
    let rule = closure.closed("A", "B").unwrap();
    assert_eq!(rule.score, 0.5);
    assert_eq!(labels(&rule.path), vec!["A", "X", "B"]);
    assert_eq!(rule.to_string(), "A ~> B # 0.5");
  }

  #[test]
  fn scores_stay_within_probability_bounds() {
    let closure = UnaryClosure::from_grammar(&grammar(&[
      "(ROOT (S (VP (VBD ran))))",
      "(ROOT (S (VP (VBD sat))))",
      "(ROOT (VP (VBD slept)))",
    ]));
    assert!(!closure.rules().is_empty());
    for rule in closure.rules() {
      assert!(rule.score > 0.0 && rule.score <= 1.0, "{}", rule);
    }
  }

  #[test]
  fn indexes_are_sorted_and_complete() {
    let closure = UnaryClosure::from_grammar(&grammar(&["(A (X (B b)))", "(A (Y (B c)))"]));
    let parents: Vec<&str> = closure
      .closed_by_child("B")
      .iter()
      .map(|rule| rule.parent.as_str())
      .collect();
    assert_eq!(parents, vec!["A", "B", "X", "Y"]);
    let children: Vec<&str> = closure
      .closed_by_parent("A")
      .iter()
      .map(|rule| rule.child.as_str())
      .collect();
    assert_eq!(children, vec!["A", "B", "X", "Y"]);
  }

  #[test]
  fn empty_grammar_closes_to_nothing() {
    let closure = UnaryClosure::from_grammar(&Grammar::default());
    assert!(closure.rules().is_empty());
    assert!(closure.closed_by_child("S").is_empty());
  }
}
