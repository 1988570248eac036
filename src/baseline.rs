use std::collections::HashMap;

use crate::annotate::{annotate_all, un_annotate, MarkovConfig};
use crate::lexicon::Lexicon;
use crate::parse_trees::ROOT_LABEL;
use crate::parser::UNKNOWN_TAG;
use crate::tree::Tree;

/// A memorizing baseline: sentences whose best tag sequence was seen in
/// training get the most frequent training parse for that sequence, with
/// the new words substituted in; everything else gets a right-branching
/// tree labeled by the most frequent category per span length.
#[derive(Debug)]
pub struct BaselineParser {
  lexicon: Lexicon,
  known_parses: HashMap<Vec<String>, HashMap<Tree, f64>>,
  span_to_categories: HashMap<usize, HashMap<String, f64>>,
}

impl BaselineParser {
  pub fn train(trees: &[Tree], config: &MarkovConfig) -> Self {
    let annotated = annotate_all(trees, config);
    let mut parser = Self {
      lexicon: Lexicon::from_trees(&annotated),
      known_parses: HashMap::new(),
      span_to_categories: HashMap::new(),
    };
    for tree in &annotated {
      parser.tally_spans(tree, 0);
      let tags: Vec<String> = tree.preterminals().iter().map(|tag| tag.to_string()).collect();
      *parser
        .known_parses
        .entry(tags)
        .or_insert_with(HashMap::new)
        .entry(tree.clone())
        .or_insert(0.0) += 1.0;
    }
    tracing::info!(
      known = parser.known_parses.len(),
      spans = parser.span_to_categories.len(),
      "trained baseline"
    );
    parser
  }

  pub fn parse(&self, words: &[&str]) -> Tree {
    if words.is_empty() {
      return Tree::branch(ROOT_LABEL, Vec::new());
    }
    let tags: Vec<String> = words
      .iter()
      .map(|word| {
        self
          .lexicon
          .best_tag(word)
          .unwrap_or(UNKNOWN_TAG)
          .to_string()
      })
      .collect();
    let annotated = match self.known_parses.get(&tags) {
      Some(parses) => {
        let best = arg_max(parses).expect("known parse entries are never empty");
        with_words(best, &mut words.iter())
      }
      None => self.right_branch_parse(words, &tags),
    };
    un_annotate(&annotated)
  }

  /// Returns the span length (in tokens) under `tree`, counting category
  /// occurrences per span length along the way. The root label is not a
  /// category worth counting.
  fn tally_spans(&mut self, tree: &Tree, start: usize) -> usize {
    if tree.is_leaf() || tree.is_preterminal() {
      return 1;
    }
    let mut end = start;
    for child in tree.children() {
      end += self.tally_spans(child, end);
    }
    let span = end - start;
    if tree.label() != ROOT_LABEL {
      *self
        .span_to_categories
        .entry(span)
        .or_insert_with(HashMap::new)
        .entry(tree.label().to_string())
        .or_insert(0.0) += 1.0;
    }
    span
  }

  /// Tags each word, then folds the tag trees together right to left,
  /// labeling every merge with the most frequent category for the merged
  /// span length.
  fn right_branch_parse(&self, words: &[&str], tags: &[String]) -> Tree {
    let mut position = words.len() - 1;
    let mut tree = tag_tree(words, tags, position);
    while position > 0 {
      position -= 1;
      tree = self.merge(tag_tree(words, tags, position), tree);
    }
    Tree::branch(ROOT_LABEL, vec![tree])
  }

  fn merge(&self, left: Tree, right: Tree) -> Tree {
    let span = left.words().len() + right.words().len();
    let label = self
      .span_to_categories
      .get(&span)
      .and_then(|counts| arg_max(counts))
      .map(|label| label.as_str())
      .unwrap_or(UNKNOWN_TAG);
    Tree::branch(label, vec![left, right])
  }
}

fn tag_tree(words: &[&str], tags: &[String], position: usize) -> Tree {
  Tree::branch(&tags[position], vec![Tree::leaf(words[position])])
}

/// Highest-count entry; ties go to the smallest key so nothing depends
/// on hash order.
fn arg_max<K: Ord>(counts: &HashMap<K, f64>) -> Option<&K> {
  let mut best: Option<(&K, f64)> = None;
  for (key, &count) in counts {
    best = match best {
      Some((top, most)) if most > count || (most == count && top < key) => Some((top, most)),
      _ => Some((key, count)),
    };
  }
  best.map(|(key, _)| key)
}

/// The known parse's structure with this sentence's words in its leaves.
fn with_words(tree: &Tree, words: &mut std::slice::Iter<'_, &str>) -> Tree {
  match tree {
    Tree::Leaf(_) => Tree::leaf(
      words
        .next()
        .expect("known parse yield matches the sentence length"),
    ),
    Tree::Branch(label, children) => Tree::branch(
      label,
      children
        .iter()
        .map(|child| with_words(child, words))
        .collect(),
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn t(s: &str) -> Tree {
    s.parse().unwrap()
  }

  fn trained() -> BaselineParser {
    let trees = vec![
      t("(ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))"),
      t("(ROOT (S (NP (DT a) (NN cat)) (VP (VBD slept))))"),
    ];
    BaselineParser::train(&trees, &MarkovConfig::default())
  }

  #[test]
  fn known_tag_sequences_return_a_training_parse() {
    let parser = trained();
    assert_eq!(
      parser.parse(&["the", "dog", "barked"]),
      t("(ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))")
    );
  }

  #[test]
  fn known_parses_substitute_the_new_words() {
    let parser = trained();
    assert_eq!(
      parser.parse(&["the", "cat", "barked"]),
      t("(ROOT (S (NP (DT the) (NN cat)) (VP (VBD barked))))")
    );
  }

  #[test]
  fn unknown_tag_sequences_build_right_branching_trees() {
    let parser = trained();
    // span 2 was always an NP in training, span 3 always an S.
    assert_eq!(
      parser.parse(&["barked", "barked"]),
      t("(ROOT (NP (VBD barked) (VBD barked)))")
    );
    assert_eq!(
      parser.parse(&["barked", "barked", "barked"]),
      t("(ROOT (S (VBD barked) (NP (VBD barked) (VBD barked))))")
    );
  }

  #[test]
  fn empty_sentences_parse_to_a_bare_root() {
    assert_eq!(trained().parse(&[]), Tree::branch(ROOT_LABEL, Vec::new()));
  }
}
