use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An interned grammar label. Cloning bumps a refcount; comparison,
/// hashing and ordering go through the label text, so symbols from
/// different tables still compare by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
  pub fn new(name: &str) -> Self {
    Self(Arc::from(name))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Borrow<str> for Symbol {
  fn borrow(&self) -> &str {
    &self.0
  }
}

impl From<&str> for Symbol {
  fn from(name: &str) -> Self {
    Self::new(name)
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Interns labels and assigns them dense indices, which the chart uses to
/// address its cells.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
  symbols: Vec<Symbol>,
  ids: HashMap<Symbol, usize>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// The symbol for `label`, created on first sight.
  pub fn intern(&mut self, label: &str) -> Symbol {
    match self.ids.get_key_value(label) {
      Some((symbol, _)) => symbol.clone(),
      None => {
        let symbol = Symbol::new(label);
        self.ids.insert(symbol.clone(), self.symbols.len());
        self.symbols.push(symbol.clone());
        symbol
      }
    }
  }

  pub fn id(&self, label: &str) -> Option<usize> {
    self.ids.get(label).copied()
  }

  pub fn contains(&self, label: &str) -> bool {
    self.ids.contains_key(label)
  }

  /// All interned symbols, in insertion order (index = id).
  pub fn symbols(&self) -> &[Symbol] {
    &self.symbols
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }
}

/// A binary rewrite `parent -> left right` with its relative-frequency
/// probability. Immutable once built; identity is the symbol triple.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryRule {
  pub parent: Symbol,
  pub left: Symbol,
  pub right: Symbol,
  pub score: f64,
}

impl fmt::Display for BinaryRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} -> {} {} # {}",
      self.parent, self.left, self.right, self.score
    )
  }
}

/// A unary rewrite `parent -> child`, same conventions as `BinaryRule`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryRule {
  pub parent: Symbol,
  pub child: Symbol,
  pub score: f64,
}

impl fmt::Display for UnaryRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} -> {} # {}", self.parent, self.child, self.score)
  }
}
