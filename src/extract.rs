use crate::chart::Chart;
use crate::rules::Symbol;
use crate::tree::Tree;

/// Materializes the best tree deriving the span from `state` through a
/// unary chain, re-expanding the closed rule into its full path of
/// intermediate nodes. Only valid for a state whose unary slot resolved
/// above zero.
pub fn best_unary_tree(chart: &Chart, start: usize, end: usize, state: &str) -> Tree {
  let rule = chart
    .unary_back(start, end, state)
    .expect("positive unary score without a backpointer");
  let core = if start == end {
    Tree::branch(rule.child.as_str(), vec![Tree::leaf(chart.words()[start])])
  } else {
    best_binary_tree(chart, start, end, rule.child.as_str())
  };
  wrap_path(&rule.path, core)
}

/// Materializes the best tree deriving the span from `state` through a
/// binary rewrite at the recorded split point.
pub fn best_binary_tree(chart: &Chart, start: usize, end: usize, state: &str) -> Tree {
  let (rule, split) = chart
    .binary_back(start, end, state)
    .expect("positive binary score without a backpointer");
  let left = best_unary_tree(chart, start, split - 1, rule.left.as_str());
  let right = best_unary_tree(chart, *split, end, rule.right.as_str());
  Tree::branch(rule.parent.as_str(), vec![left, right])
}

/// Rebuilds the unary chain above `core`: the path's last symbol labels
/// `core` itself, and each earlier symbol wraps one more branch. A
/// reflexive single-symbol path wraps nothing.
fn wrap_path(path: &[Symbol], core: Tree) -> Tree {
  path[..path.len() - 1]
    .iter()
    .rev()
    .fold(core, |tree, label| Tree::branch(label.as_str(), vec![tree]))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::chart::fill_chart;
  use crate::closure::UnaryClosure;
  use crate::grammar::Grammar;
  use crate::lexicon::Lexicon;

  fn parse_with(sources: &[&str], words: &[&str], root: &str) -> Tree {
    let trees: Vec<Tree> = sources.iter().map(|s| s.parse().unwrap()).collect();
    let grammar = Grammar::from_trees(&trees);
    let lexicon = Lexicon::from_trees(&trees);
    let closure = UnaryClosure::from_grammar(&grammar);
    let chart = fill_chart(&grammar, &lexicon, &closure, words);
    assert!(chart.unary_score(0, words.len() - 1, root) > 0.0);
    best_unary_tree(&chart, 0, words.len() - 1, root)
  }

  #[test]
  fn rebuilds_the_training_tree() {
    let source = "(ROOT (S (NP (DT the) (NN dog)) (VBD barked)))";
    let tree = parse_with(&[source], &["the", "dog", "barked"], "ROOT");
    assert_eq!(tree, source.parse().unwrap());
  }

  #[test]
  fn reexpands_closed_chains_into_intermediate_nodes() {
    let source = "(ROOT (S (VP (VBD ran))))";
    let tree = parse_with(&[source], &["ran"], "ROOT");
    // The chart only stores ROOT ~> VBD; the path restores S and VP.
    assert_eq!(tree, source.parse().unwrap());
  }

  #[test]
  fn reflexive_chains_add_no_duplicate_nodes() {
    let source = "(ROOT (S (NP (DT the) (NN dog)) (VBD barked)))";
    let tree = parse_with(&[source], &["the", "dog", "barked"], "S");
    assert_eq!(tree, "(S (NP (DT the) (NN dog)) (VBD barked))".parse().unwrap());
  }
}
