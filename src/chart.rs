use std::fmt;
use std::sync::Arc;

use crate::closure::{ClosedRule, UnaryClosure};
use crate::grammar::Grammar;
use crate::lexicon::Lexicon;
use crate::rules::BinaryRule;

/// One (start, end, state) entry. `NEG_INFINITY` marks a slot whose
/// resolution pass has not run yet; a resolved slot is always >= 0, with
/// 0.0 meaning "resolved, no derivation".
#[derive(Debug, Clone)]
struct Cell {
  binary: f64,
  unary: f64,
  binary_back: Option<(Arc<BinaryRule>, usize)>,
  unary_back: Option<Arc<ClosedRule>>,
}

impl Default for Cell {
  fn default() -> Self {
    Self {
      binary: f64::NEG_INFINITY,
      unary: f64::NEG_INFINITY,
      binary_back: None,
      unary_back: None,
    }
  }
}

/// The CKY chart for one sentence: a triangular array of cells addressed
/// by (start, end, state id), spans inclusive on both ends. Every cell
/// keeps its best binary-resolved and unary-resolved scores separately,
/// with backpointers for extraction. Scores are raw probability products.
/// Filled bottom-up by `fill_chart`; read-only afterwards.
#[derive(Debug)]
pub struct Chart<'a> {
  grammar: &'a Grammar,
  words: &'a [&'a str],
  n_states: usize,
  cells: Vec<Cell>,
}

/// Fills a chart for `words`: lexical spans first, then spans by
/// increasing length, resolving binary rewrites before unary chains over
/// each span.
pub fn fill_chart<'a>(
  grammar: &'a Grammar,
  lexicon: &Lexicon,
  closure: &UnaryClosure,
  words: &'a [&'a str],
) -> Chart<'a> {
  let mut chart = Chart::new(grammar, words);
  let binary_ids = index_binary_rules(grammar);
  let closed_ids = index_closed_rules(grammar, closure);
  for start in 0..words.len() {
    chart.resolve_lexical(start, lexicon, &closed_ids);
  }
  for length in 2..=words.len() {
    for start in 0..=(words.len() - length) {
      let end = start + length - 1;
      chart.resolve_binary(start, end, &binary_ids);
      chart.resolve_unary_span(start, end, &closed_ids);
    }
  }
  chart
}

/// Binary rules keyed by parent id, with child ids resolved once so the
/// split loop never touches the symbol table.
fn index_binary_rules(grammar: &Grammar) -> Vec<Vec<(usize, usize, &Arc<BinaryRule>)>> {
  grammar
    .states()
    .iter()
    .map(|state| {
      grammar
        .binary_by_parent(state.as_str())
        .iter()
        .map(|rule| {
          let left = grammar
            .state_id(rule.left.as_str())
            .expect("binary rule left child is an interned state");
          let right = grammar
            .state_id(rule.right.as_str())
            .expect("binary rule right child is an interned state");
          (left, right, rule)
        })
        .collect()
    })
    .collect()
}

/// Closed unary rules keyed by child id, as (parent id, rule) pairs.
fn index_closed_rules<'g>(
  grammar: &'g Grammar,
  closure: &'g UnaryClosure,
) -> Vec<Vec<(usize, &'g Arc<ClosedRule>)>> {
  grammar
    .states()
    .iter()
    .map(|state| {
      closure
        .closed_by_child(state.as_str())
        .iter()
        .map(|rule| {
          let parent = grammar
            .state_id(rule.parent.as_str())
            .expect("closed rule parent is an interned state");
          (parent, rule)
        })
        .collect()
    })
    .collect()
}

impl<'a> Chart<'a> {
  fn new(grammar: &'a Grammar, words: &'a [&'a str]) -> Self {
    let n_states = grammar.n_states();
    let spans = words.len() * (words.len() + 1) / 2;
    Self {
      grammar,
      words,
      n_states,
      cells: vec![Cell::default(); spans * n_states],
    }
  }

  pub fn words(&self) -> &[&'a str] {
    self.words
  }

  /// Best score for deriving `words[start..=end]` from `state` with a
  /// unary chain on top. States the grammar has never seen score 0.
  pub fn unary_score(&self, start: usize, end: usize, state: &str) -> f64 {
    match self.grammar.state_id(state) {
      Some(id) => self.cells[self.cell_base(start, end) + id].unary,
      None => 0.0,
    }
  }

  /// Best score for deriving `words[start..=end]` from `state` with a
  /// binary rewrite on top. A single-token span has no split point, so
  /// asking for one is a caller bug.
  pub fn binary_score(&self, start: usize, end: usize, state: &str) -> f64 {
    assert!(
      start != end,
      "no binary analyses over the single-token span {}..{}",
      start,
      end
    );
    match self.grammar.state_id(state) {
      Some(id) => self.cells[self.cell_base(start, end) + id].binary,
      None => 0.0,
    }
  }

  pub(crate) fn unary_back(
    &self,
    start: usize,
    end: usize,
    state: &str,
  ) -> Option<&Arc<ClosedRule>> {
    let id = self.grammar.state_id(state)?;
    self.cells[self.cell_base(start, end) + id].unary_back.as_ref()
  }

  pub(crate) fn binary_back(
    &self,
    start: usize,
    end: usize,
    state: &str,
  ) -> Option<&(Arc<BinaryRule>, usize)> {
    let id = self.grammar.state_id(state)?;
    self.cells[self.cell_base(start, end) + id].binary_back.as_ref()
  }

  fn cell_base(&self, start: usize, end: usize) -> usize {
    assert!(start <= end, "span {}..{} runs backwards", start, end);
    (end * (end + 1) / 2 + start) * self.n_states
  }

  fn unary_at(&self, start: usize, end: usize, id: usize) -> f64 {
    self.cells[self.cell_base(start, end) + id].unary
  }

  /// Tags `words[start]` with every lexicon tag the grammar knows, then
  /// lifts the tag scores through closed unary chains.
  fn resolve_lexical(
    &mut self,
    start: usize,
    lexicon: &Lexicon,
    closed_ids: &[Vec<(usize, &Arc<ClosedRule>)>],
  ) {
    let n = self.n_states;
    let base = self.cell_base(start, start);
    for cell in &mut self.cells[base..base + n] {
      cell.unary = 0.0;
    }
    let word = self.words[start];
    for tag in lexicon.tags() {
      let tag_id = match self.grammar.state_id(tag) {
        Some(id) => id,
        None => continue,
      };
      let word_score = lexicon.score_tagging(word, tag);
      for &(parent_id, rule) in &closed_ids[tag_id] {
        let score = rule.score * word_score;
        let cell = &mut self.cells[base + parent_id];
        if score > cell.unary {
          cell.unary = score;
          cell.unary_back = Some(Arc::clone(rule));
        }
      }
    }
  }

  /// Best binary rewrite per parent state: splits ascending outside,
  /// that parent's rules inside, both child factors read from strictly
  /// smaller spans already resolved.
  fn resolve_binary(
    &mut self,
    start: usize,
    end: usize,
    binary_ids: &[Vec<(usize, usize, &Arc<BinaryRule>)>],
  ) {
    let n = self.n_states;
    let base = self.cell_base(start, end);
    for cell in &mut self.cells[base..base + n] {
      cell.binary = 0.0;
    }
    for (parent_id, rules) in binary_ids.iter().enumerate() {
      if rules.is_empty() {
        continue;
      }
      let mut best = 0.0_f64;
      let mut back: Option<(Arc<BinaryRule>, usize)> = None;
      for split in (start + 1)..=end {
        for &(left_id, right_id, rule) in rules {
          let left = self.unary_at(start, split - 1, left_id);
          if left <= 0.0 {
            continue;
          }
          let right = self.unary_at(split, end, right_id);
          if right <= 0.0 {
            continue;
          }
          let score = rule.score * left * right;
          if score > best {
            best = score;
            back = Some((Arc::clone(rule), split));
          }
        }
      }
      let cell = &mut self.cells[base + parent_id];
      cell.binary = best;
      cell.binary_back = back;
    }
  }

  /// Lifts the span's binary scores through closed unary chains. Reads
  /// and writes the same span: binary slots in, unary slots out.
  fn resolve_unary_span(
    &mut self,
    start: usize,
    end: usize,
    closed_ids: &[Vec<(usize, &Arc<ClosedRule>)>],
  ) {
    let n = self.n_states;
    let base = self.cell_base(start, end);
    for cell in &mut self.cells[base..base + n] {
      cell.unary = 0.0;
    }
    for child_id in 0..n {
      let binary = self.cells[base + child_id].binary;
      if binary <= 0.0 {
        continue;
      }
      for &(parent_id, rule) in &closed_ids[child_id] {
        let score = rule.score * binary;
        let cell = &mut self.cells[base + parent_id];
        if score > cell.unary {
          cell.unary = score;
          cell.unary_back = Some(Arc::clone(rule));
        }
      }
    }
  }
}

impl fmt::Display for Chart<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for end in 0..self.words.len() {
      for start in 0..=end {
        writeln!(f, "[{}, {}] {}", start, end, self.words[start..=end].join(" "))?;
        let base = self.cell_base(start, end);
        for (id, state) in self.grammar.states().iter().enumerate() {
          let cell = &self.cells[base + id];
          if start == end {
            if cell.unary > 0.0 {
              writeln!(f, "  {}: unary {}", state, cell.unary)?;
            }
          } else if cell.unary > 0.0 || cell.binary > 0.0 {
            writeln!(f, "  {}: unary {}, binary {}", state, cell.unary, cell.binary)?;
          }
        }
      }
    }
    Ok(())
  }
}
