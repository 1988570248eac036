use std::collections::HashSet;
use std::fmt;

use crate::tree::Tree;

/// Labeled-constituent precision, recall, and F1 accumulated over a test
/// set, in the EVALB tradition: the root span and punctuation tokens do
/// not count, and punctuation does not advance the span positions.
#[derive(Debug)]
pub struct ConstituentEval {
  ignored_labels: HashSet<String>,
  punctuation_tags: HashSet<String>,
  correct: f64,
  guessed: f64,
  gold: f64,
  exact: f64,
  sentences: f64,
}

impl ConstituentEval {
  pub fn new(ignored_labels: &[&str], punctuation_tags: &[&str]) -> Self {
    Self {
      ignored_labels: ignored_labels.iter().map(|s| s.to_string()).collect(),
      punctuation_tags: punctuation_tags.iter().map(|s| s.to_string()).collect(),
      correct: 0.0,
      guessed: 0.0,
      gold: 0.0,
      exact: 0.0,
      sentences: 0.0,
    }
  }

  /// The standard English setup: ignore the root, skip Penn Treebank
  /// punctuation tags.
  pub fn english() -> Self {
    Self::new(&["ROOT"], &["''", "``", ".", ":", ","])
  }

  /// Scores one sentence and folds it into the running totals. Returns
  /// the sentence's own F1.
  pub fn add(&mut self, guess: &Tree, gold: &Tree) -> f64 {
    let guessed = self.constituents(guess);
    let correct_gold = self.constituents(gold);
    let correct = guessed.intersection(&correct_gold).count() as f64;
    self.correct += correct;
    self.guessed += guessed.len() as f64;
    self.gold += correct_gold.len() as f64;
    self.sentences += 1.0;
    if guessed == correct_gold {
      self.exact += 1.0;
    }
    f1(
      ratio(correct, guessed.len() as f64),
      ratio(correct, correct_gold.len() as f64),
    )
  }

  pub fn precision(&self) -> f64 {
    ratio(self.correct, self.guessed)
  }

  pub fn recall(&self) -> f64 {
    ratio(self.correct, self.gold)
  }

  pub fn f1(&self) -> f64 {
    f1(self.precision(), self.recall())
  }

  pub fn exact_rate(&self) -> f64 {
    ratio(self.exact, self.sentences)
  }

  fn constituents(&self, tree: &Tree) -> HashSet<(String, usize, usize)> {
    let mut set = HashSet::new();
    self.collect_constituents(tree, 0, &mut set);
    set
  }

  /// Returns the tree's span length with punctuation tokens skipped;
  /// records every multi-token non-ignored constituent as
  /// `(label, start, end)` over the punctuation-free positions.
  fn collect_constituents(
    &self,
    tree: &Tree,
    start: usize,
    set: &mut HashSet<(String, usize, usize)>,
  ) -> usize {
    if tree.is_leaf() {
      return 1;
    }
    if tree.is_preterminal() {
      return if self.punctuation_tags.contains(tree.label()) {
        0
      } else {
        1
      };
    }
    let mut end = start;
    for child in tree.children() {
      end += self.collect_constituents(child, end, set);
    }
    if end > start + 1 && !self.ignored_labels.contains(tree.label()) {
      set.insert((tree.label().to_string(), start, end));
    }
    end - start
  }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
  if denominator == 0.0 {
    1.0
  } else {
    numerator / denominator
  }
}

fn f1(precision: f64, recall: f64) -> f64 {
  if precision + recall == 0.0 {
    0.0
  } else {
    2.0 * precision * recall / (precision + recall)
  }
}

impl fmt::Display for ConstituentEval {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "P: {:.2} R: {:.2} F1: {:.2} EX: {:.2}",
      100.0 * self.precision(),
      100.0 * self.recall(),
      100.0 * self.f1(),
      100.0 * self.exact_rate()
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn t(s: &str) -> Tree {
    s.parse().unwrap()
  }

  #[test]
  fn identical_trees_score_perfectly() {
    let mut eval = ConstituentEval::english();
    let tree = t("(ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))");
    assert_eq!(eval.add(&tree, &tree), 1.0);
    assert_eq!(eval.f1(), 1.0);
    assert_eq!(eval.exact_rate(), 1.0);
  }

  #[test]
  fn flat_guesses_recall_nothing() {
    let mut eval = ConstituentEval::english();
    let guess = t("(ROOT (DT the) (NN dog) (VBD barked))");
    let gold = t("(ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))");
    // The gold tree has S over 0..3 and NP over 0..2; VP spans a single
    // token and does not count. The guess proposes no constituents at
    // all, so precision is vacuously perfect and recall is zero.
    assert_eq!(eval.add(&guess, &gold), 0.0);
    assert_eq!(eval.precision(), 1.0);
    assert_eq!(eval.recall(), 0.0);
    assert_eq!(eval.f1(), 0.0);
    assert_eq!(eval.exact_rate(), 0.0);
  }

  #[test]
  fn punctuation_does_not_shift_spans() {
    let mut eval = ConstituentEval::english();
    // The comma attaches differently in the two trees, but the
    // punctuation-free spans agree.
    let guess = t("(ROOT (S (NP (NP (NN dogs)) (, ,)) (VP (VBD barked))))");
    let gold = t("(ROOT (S (NP (NN dogs)) (, ,) (VP (VBD barked))))");
    assert_eq!(eval.add(&guess, &gold), 1.0);
    assert_eq!(eval.f1(), 1.0);
  }

  #[test]
  fn totals_accumulate_across_sentences() {
    let mut eval = ConstituentEval::english();
    let gold = t("(ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))");
    eval.add(&gold, &gold);
    eval.add(&t("(ROOT (DT the) (NN dog) (VBD barked))"), &gold);
    // 2 of 2 guessed constituents are correct, 2 of 4 gold ones found.
    assert_eq!(eval.precision(), 1.0);
    assert_eq!(eval.recall(), 0.5);
    assert_eq!(eval.exact_rate(), 0.5);
    assert_eq!(eval.to_string(), "P: 100.00 R: 50.00 F1: 66.67 EX: 50.00");
  }
}
