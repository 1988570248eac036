use crate::annotate::{annotate_all, un_annotate, MarkovConfig};
use crate::chart::{fill_chart, Chart};
use crate::closure::UnaryClosure;
use crate::extract::{best_binary_tree, best_unary_tree};
use crate::grammar::Grammar;
use crate::lexicon::Lexicon;
use crate::parse_trees::ROOT_LABEL;
use crate::tree::Tree;

/// The tag a token falls back to when the lexicon has nothing for it.
pub(crate) const UNKNOWN_TAG: &str = "X";

/// A probabilistic CKY parser: trains on normalized treebank trees and
/// parses token sequences back into trees over the original label
/// vocabulary. Read-only after training, so one parser can serve many
/// threads as long as each parse keeps its own chart.
#[derive(Debug)]
pub struct CkyParser {
  grammar: Grammar,
  lexicon: Lexicon,
  closure: UnaryClosure,
  /// Root labels of the annotated training trees, sorted and deduplicated.
  roots: Vec<String>,
}

impl CkyParser {
  pub fn train(trees: &[Tree], config: &MarkovConfig) -> Self {
    let annotated = annotate_all(trees, config);
    // Annotation can rewrite the root label too, so eligible roots come
    // from the annotated trees, not the raw ones.
    let mut roots: Vec<String> = annotated.iter().map(|tree| tree.label().to_string()).collect();
    roots.sort();
    roots.dedup();
    let grammar = Grammar::from_trees(&annotated);
    let closure = UnaryClosure::from_grammar(&grammar);
    let lexicon = Lexicon::from_trees(&annotated);
    tracing::info!(
      trees = trees.len(),
      states = grammar.n_states(),
      binary = grammar.binary_rules().len(),
      unary = grammar.unary_rules().len(),
      closed = closure.rules().len(),
      "trained parser"
    );
    Self {
      grammar,
      lexicon,
      closure,
      roots,
    }
  }

  /// The best parse for `words` under the trained grammar. Falls back to
  /// a flat parse when no derivation from a training root covers the
  /// whole sentence.
  pub fn parse(&self, words: &[&str]) -> Tree {
    if words.is_empty() {
      return Tree::branch(ROOT_LABEL, Vec::new());
    }
    let chart = fill_chart(&self.grammar, &self.lexicon, &self.closure, words);
    let annotated = match self.best_annotated_parse(&chart, words.len()) {
      Some(tree) => tree,
      None => self.flat_parse(words),
    };
    un_annotate(&annotated)
  }

  pub fn grammar(&self) -> &Grammar {
    &self.grammar
  }

  pub fn lexicon(&self) -> &Lexicon {
    &self.lexicon
  }

  pub fn unary_closure(&self) -> &UnaryClosure {
    &self.closure
  }

  pub fn roots(&self) -> &[String] {
    &self.roots
  }

  /// Top-level selection: track the best whole-sentence unary and binary
  /// scores over the sorted roots and extract from whichever wins.
  /// Binary only wins strictly; a zero maximum on both means no
  /// derivation exists.
  fn best_annotated_parse(&self, chart: &Chart, n: usize) -> Option<Tree> {
    let mut unary_max = 0.0_f64;
    let mut binary_max = 0.0_f64;
    let mut unary_root: Option<&str> = None;
    let mut binary_root: Option<&str> = None;
    for root in &self.roots {
      let score = chart.unary_score(0, n - 1, root);
      if score > unary_max {
        unary_max = score;
        unary_root = Some(root);
      }
      if n > 1 {
        let score = chart.binary_score(0, n - 1, root);
        if score > binary_max {
          binary_max = score;
          binary_root = Some(root);
        }
      }
    }
    if binary_max > unary_max {
      let root = binary_root.expect("positive binary maximum without a root");
      Some(best_binary_tree(chart, 0, n - 1, root))
    } else if unary_max > 0.0 {
      let root = unary_root.expect("positive unary maximum without a root");
      Some(best_unary_tree(chart, 0, n - 1, root))
    } else {
      None
    }
  }

  /// One preterminal per token under a plain root, each token taking its
  /// best lexicon tag.
  fn flat_parse(&self, words: &[&str]) -> Tree {
    let children = words
      .iter()
      .map(|word| {
        let tag = self.lexicon.best_tag(word).unwrap_or(UNKNOWN_TAG);
        Tree::branch(tag, vec![Tree::leaf(word)])
      })
      .collect();
    Tree::branch(ROOT_LABEL, children)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn t(s: &str) -> Tree {
    s.parse().unwrap()
  }

  fn dog_parser() -> CkyParser {
    let trees = vec![t("(ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))")];
    CkyParser::train(&trees, &MarkovConfig::default())
  }

  #[test]
  fn recovers_the_training_sentence_exactly() {
    let parser = dog_parser();
    assert_eq!(
      parser.parse(&["the", "dog", "barked"]),
      t("(ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))")
    );
  }

  #[test]
  fn unknown_words_parse_by_structure() {
    let parser = dog_parser();
    // Smoothing scores every tag equally for unseen words; the rules
    // still force the trained shape onto them.
    assert_eq!(
      parser.parse(&["a", "cat", "slept"]),
      t("(ROOT (S (NP (DT a) (NN cat)) (VP (VBD slept))))")
    );
  }

  #[test]
  fn underivable_sentences_fall_back_to_flat_parses() {
    let parser = dog_parser();
    assert_eq!(parser.parse(&["dog", "dog"]), t("(ROOT (NN dog) (NN dog))"));
    assert_eq!(parser.parse(&["barked"]), t("(ROOT (VBD barked))"));
  }

  #[test]
  fn ruleless_grammars_always_fall_back() {
    // Preterminal-only training leaves the grammar with no rewrite rules
    // at all; every sentence takes the flat default parse.
    let trees = vec![t("(NN dog)")];
    let parser = CkyParser::train(&trees, &MarkovConfig::default());
    assert!(parser.grammar().binary_rules().is_empty());
    assert_eq!(
      parser.parse(&["dog", "dog", "dog"]),
      t("(ROOT (NN dog) (NN dog) (NN dog))")
    );
  }

  #[test]
  fn single_tokens_parse_through_unary_chains() {
    let trees = vec![t("(ROOT (S (VP (VBD ran))))")];
    let parser = CkyParser::train(&trees, &MarkovConfig::default());
    assert_eq!(parser.parse(&["ran"]), t("(ROOT (S (VP (VBD ran))))"));
  }

  #[test]
  fn empty_sentences_parse_to_a_bare_root() {
    let parser = dog_parser();
    assert_eq!(parser.parse(&[]), Tree::branch(ROOT_LABEL, Vec::new()));
  }

  #[test]
  fn markovized_roots_stay_eligible() {
    let trees = vec![t("(ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))")];
    let config = MarkovConfig {
      vertical_order: 2,
      horizontal_order: Some(1),
      mark_unary_rewrites: true,
    };
    let parser = CkyParser::train(&trees, &config);
    assert_eq!(parser.roots(), &["ROOT-U".to_string()]);
    assert_eq!(
      parser.parse(&["the", "dog", "barked"]),
      t("(ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))")
    );
  }

  #[test]
  fn parsing_is_deterministic() {
    let trees = vec![
      t("(ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))"),
      t("(ROOT (S (NP (DT a) (NN cat)) (VP (VBD slept))))"),
    ];
    let first = CkyParser::train(&trees, &MarkovConfig::default());
    let second = CkyParser::train(&trees, &MarkovConfig::default());
    let words = ["the", "cat", "barked"];
    assert_eq!(first.parse(&words), second.parse(&words));
    assert_eq!(first.parse(&words), first.parse(&words));
  }
}
