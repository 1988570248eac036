use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::rules::{BinaryRule, Symbol, SymbolTable, UnaryRule};
use crate::tree::Tree;

/// Rewrite rules tallied from annotated, binarized training trees.
///
/// A rule's score is its count over its parent label's count, so the
/// scores of each parent's rewrites sum to one. Lexical rewrites
/// (preterminal -> word) are not grammar rules; the lexicon owns those.
/// Immutable once built.
#[derive(Debug, Default)]
pub struct Grammar {
  symbols: SymbolTable,
  binary_rules: Vec<Arc<BinaryRule>>,
  unary_rules: Vec<Arc<UnaryRule>>,
  binary_by_parent: HashMap<Symbol, Vec<Arc<BinaryRule>>>,
  binary_by_left: HashMap<Symbol, Vec<Arc<BinaryRule>>>,
  binary_by_right: HashMap<Symbol, Vec<Arc<BinaryRule>>>,
  unary_by_child: HashMap<Symbol, Vec<Arc<UnaryRule>>>,
}

impl Grammar {
  /// Tallies every internal node of every tree. Panics if a branch has
  /// zero or more than two children, since such trees cannot come out of
  /// the binarizer.
  pub fn from_trees(trees: &[Tree]) -> Self {
    let mut tally = RuleTally::default();
    for tree in trees {
      tally.tally_tree(tree);
    }
    tally.into_grammar()
  }

  /// Grammar states in sorted label order; a state's position is its
  /// dense id, which the chart uses to address cells.
  pub fn states(&self) -> &[Symbol] {
    self.symbols.symbols()
  }

  pub fn state_id(&self, label: &str) -> Option<usize> {
    self.symbols.id(label)
  }

  pub fn n_states(&self) -> usize {
    self.symbols.len()
  }

  /// All binary rules, sorted by (parent, left, right).
  pub fn binary_rules(&self) -> &[Arc<BinaryRule>] {
    &self.binary_rules
  }

  /// All unary rules, sorted by (parent, child).
  pub fn unary_rules(&self) -> &[Arc<UnaryRule>] {
    &self.unary_rules
  }

  pub fn binary_by_parent(&self, parent: &str) -> &[Arc<BinaryRule>] {
    self
      .binary_by_parent
      .get(parent)
      .map(|rules| rules.as_slice())
      .unwrap_or(&[])
  }

  pub fn binary_by_left(&self, left: &str) -> &[Arc<BinaryRule>] {
    self
      .binary_by_left
      .get(left)
      .map(|rules| rules.as_slice())
      .unwrap_or(&[])
  }

  pub fn binary_by_right(&self, right: &str) -> &[Arc<BinaryRule>] {
    self
      .binary_by_right
      .get(right)
      .map(|rules| rules.as_slice())
      .unwrap_or(&[])
  }

  pub fn unary_by_child(&self, child: &str) -> &[Arc<UnaryRule>] {
    self
      .unary_by_child
      .get(child)
      .map(|rules| rules.as_slice())
      .unwrap_or(&[])
  }
}

impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for rule in &self.binary_rules {
      writeln!(f, "{}", rule)?;
    }
    for rule in &self.unary_rules {
      writeln!(f, "{}", rule)?;
    }
    Ok(())
  }
}

#[derive(Debug, Default)]
struct RuleTally {
  binary: HashMap<(String, String, String), f64>,
  unary: HashMap<(String, String), f64>,
  parents: HashMap<String, f64>,
}

impl RuleTally {
  fn tally_tree(&mut self, tree: &Tree) {
    if tree.is_leaf() || tree.is_preterminal() {
      return;
    }
    let children = tree.children();
    match children {
      [child] => {
        *self
          .unary
          .entry((tree.label().to_string(), child.label().to_string()))
          .or_insert(0.0) += 1.0;
      }
      [left, right] => {
        *self
          .binary
          .entry((
            tree.label().to_string(),
            left.label().to_string(),
            right.label().to_string(),
          ))
          .or_insert(0.0) += 1.0;
      }
      _ => panic!(
        "branch {} rewrites to {} children: tree is not binarized",
        tree.label(),
        children.len()
      ),
    }
    *self.parents.entry(tree.label().to_string()).or_insert(0.0) += 1.0;
    for child in children {
      self.tally_tree(child);
    }
  }

  fn into_grammar(self) -> Grammar {
    // Interning the sorted label set first keeps ids equal to sorted rank.
    let mut labels: BTreeSet<&str> = BTreeSet::new();
    for (parent, left, right) in self.binary.keys() {
      labels.insert(parent);
      labels.insert(left);
      labels.insert(right);
    }
    for (parent, child) in self.unary.keys() {
      labels.insert(parent);
      labels.insert(child);
    }
    let mut symbols = SymbolTable::new();
    for label in &labels {
      symbols.intern(label);
    }

    let mut binary_keys: Vec<&(String, String, String)> = self.binary.keys().collect();
    binary_keys.sort();
    let mut binary_rules = Vec::with_capacity(binary_keys.len());
    for key in binary_keys {
      let (parent, left, right) = key;
      binary_rules.push(Arc::new(BinaryRule {
        parent: symbols.intern(parent),
        left: symbols.intern(left),
        right: symbols.intern(right),
        score: self.binary[key] / self.parents[parent],
      }));
    }

    let mut unary_keys: Vec<&(String, String)> = self.unary.keys().collect();
    unary_keys.sort();
    let mut unary_rules = Vec::with_capacity(unary_keys.len());
    for key in unary_keys {
      let (parent, child) = key;
      unary_rules.push(Arc::new(UnaryRule {
        parent: symbols.intern(parent),
        child: symbols.intern(child),
        score: self.unary[key] / self.parents[parent],
      }));
    }

    let mut binary_by_parent: HashMap<Symbol, Vec<Arc<BinaryRule>>> = HashMap::new();
    let mut binary_by_left: HashMap<Symbol, Vec<Arc<BinaryRule>>> = HashMap::new();
    let mut binary_by_right: HashMap<Symbol, Vec<Arc<BinaryRule>>> = HashMap::new();
    for rule in &binary_rules {
      binary_by_parent
        .entry(rule.parent.clone())
        .or_insert_with(Vec::new)
        .push(Arc::clone(rule));
      binary_by_left
        .entry(rule.left.clone())
        .or_insert_with(Vec::new)
        .push(Arc::clone(rule));
      binary_by_right
        .entry(rule.right.clone())
        .or_insert_with(Vec::new)
        .push(Arc::clone(rule));
    }
    let mut unary_by_child: HashMap<Symbol, Vec<Arc<UnaryRule>>> = HashMap::new();
    for rule in &unary_rules {
      unary_by_child
        .entry(rule.child.clone())
        .or_insert_with(Vec::new)
        .push(Arc::clone(rule));
    }

    tracing::debug!(
      states = symbols.len(),
      binary = binary_rules.len(),
      unary = unary_rules.len(),
      "tallied grammar"
    );

    Grammar {
      symbols,
      binary_rules,
      unary_rules,
      binary_by_parent,
      binary_by_left,
      binary_by_right,
      unary_by_child,
    }
  }
}
