use std::collections::HashMap;

use crate::tree::Tree;

/// Words seen fewer times than this get type-level smoothing mixed into
/// their tag counts.
const RARE_WORD_CUTOFF: f64 = 10.0;

/// Tagging scores trained from the preterminal yield of annotated trees.
/// `score_tagging` is `P(tag | word) / P(tag) * P(word)` with additive
/// smoothing, so unknown words still score above zero for every known tag.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
  word_to_tag_counts: HashMap<String, HashMap<String, f64>>,
  tag_counts: HashMap<String, f64>,
  word_counts: HashMap<String, f64>,
  /// Per tag, how many distinct word types it was first seen with.
  type_tag_counts: HashMap<String, f64>,
  total_tokens: f64,
  total_word_types: f64,
  /// Known tags, sorted.
  tags: Vec<String>,
}

impl Lexicon {
  pub fn from_trees(trees: &[Tree]) -> Self {
    let mut lexicon = Self::default();
    for tree in trees {
      let words = tree.words();
      let tags = tree.preterminals();
      for (word, tag) in words.iter().zip(tags.iter()) {
        lexicon.tally_tagging(word, tag);
      }
    }
    let mut tags: Vec<String> = lexicon.tag_counts.keys().cloned().collect();
    tags.sort();
    lexicon.tags = tags;
    lexicon
  }

  fn tally_tagging(&mut self, word: &str, tag: &str) {
    if !self.is_known(word) {
      self.total_word_types += 1.0;
      *self.type_tag_counts.entry(tag.to_string()).or_insert(0.0) += 1.0;
    }
    self.total_tokens += 1.0;
    *self.tag_counts.entry(tag.to_string()).or_insert(0.0) += 1.0;
    *self.word_counts.entry(word.to_string()).or_insert(0.0) += 1.0;
    *self
      .word_to_tag_counts
      .entry(word.to_string())
      .or_insert_with(HashMap::new)
      .entry(tag.to_string())
      .or_insert(0.0) += 1.0;
  }

  pub fn is_known(&self, word: &str) -> bool {
    self.word_counts.contains_key(word)
  }

  /// Known tags in sorted order.
  pub fn tags(&self) -> &[String] {
    &self.tags
  }

  /// Smoothed tagging score, always >= 0. A tag the lexicon never saw
  /// scores exactly zero.
  pub fn score_tagging(&self, word: &str, tag: &str) -> f64 {
    let p_tag = match self.tag_counts.get(tag) {
      Some(count) => count / self.total_tokens,
      None => return 0.0,
    };
    let mut c_word = self.word_counts.get(word).copied().unwrap_or(0.0);
    let mut c_tag_and_word = self
      .word_to_tag_counts
      .get(word)
      .and_then(|tags| tags.get(tag))
      .copied()
      .unwrap_or(0.0);
    if c_word < RARE_WORD_CUTOFF {
      let type_smoothing =
        self.type_tag_counts.get(tag).copied().unwrap_or(0.0) / self.total_word_types;
      c_word += 1.0;
      c_tag_and_word += type_smoothing;
    }
    let p_word = (1.0 + c_word) / (1.0 + self.total_tokens);
    let p_tag_given_word = c_tag_and_word / c_word;
    p_tag_given_word / p_tag * p_word
  }

  /// The highest-scoring tag for `word`; ties go to the first in sorted
  /// order. None only for an untrained lexicon.
  pub fn best_tag(&self, word: &str) -> Option<&str> {
    let mut best: Option<(&str, f64)> = None;
    for tag in &self.tags {
      let score = self.score_tagging(word, tag);
      match best {
        Some((_, top)) if top >= score => {}
        _ => best = Some((tag, score)),
      }
    }
    best.map(|(tag, _)| tag)
  }
}
