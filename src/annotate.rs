use crate::tree::Tree;

/// Markovization settings for training-tree binarization.
#[derive(Debug, Clone)]
pub struct MarkovConfig {
  /// How many ancestor labels (the node's own included) make up its
  /// vertical context; 1 reproduces the plain label.
  pub vertical_order: usize,
  /// How many sibling labels intermediate nodes remember; None keeps the
  /// full history.
  pub horizontal_order: Option<usize>,
  /// Suffix `-U` onto the label of every branch rewriting to a single
  /// non-leaf child.
  pub mark_unary_rewrites: bool,
}

impl Default for MarkovConfig {
  fn default() -> Self {
    Self {
      vertical_order: 1,
      horizontal_order: None,
      mark_unary_rewrites: false,
    }
  }
}

/// Ancestor and sibling context at one point of the binarization
/// recursion. Never mutated in place: descending derives an extended copy,
/// so no cleanup is owed on any exit path.
#[derive(Debug, Clone)]
struct Context<'a> {
  config: &'a MarkovConfig,
  /// Munged labels from the root down to and including the current node.
  ancestors: Vec<String>,
  /// Raw labels of the siblings already emitted at the current cascade
  /// level.
  siblings: Vec<String>,
}

impl<'a> Context<'a> {
  fn new(config: &'a MarkovConfig) -> Self {
    Self {
      config,
      ancestors: Vec::new(),
      siblings: Vec::new(),
    }
  }

  fn with_parent(&self, munged: String) -> Self {
    let mut ancestors = self.ancestors.clone();
    ancestors.push(munged);
    Self {
      config: self.config,
      ancestors,
      siblings: Vec::new(),
    }
  }

  fn with_sibling(&self, label: &str) -> Self {
    let mut siblings = self.siblings.clone();
    siblings.push(label.to_string());
    Self {
      config: self.config,
      ancestors: self.ancestors.clone(),
      siblings,
    }
  }

  /// The label to emit here: the vertical label at the top of a cascade,
  /// the intermediate label once siblings have been emitted.
  fn label(&self) -> String {
    if self.siblings.is_empty() {
      self.vertical_label()
    } else {
      self.intermediate_label()
    }
  }

  /// The last `vertical_order` ancestors joined with `^`, the node's own
  /// label first: `NP` under `S` at order 2 is `NP^S`. The context is a
  /// suffix, so `strip_annotations` recovers the plain label.
  fn vertical_label(&self) -> String {
    let len = self.ancestors.len();
    let take = self.config.vertical_order.min(len);
    let mut label = String::new();
    for ancestor in self.ancestors[len - take..].iter().rev() {
      if !label.is_empty() {
        label.push('^');
      }
      label.push_str(ancestor);
    }
    label
  }

  /// `@` + vertical label + `->` + the last `horizontal_order` sibling
  /// labels, each prefixed `_`: `@NP->_DT_JJ`.
  fn intermediate_label(&self) -> String {
    let len = self.siblings.len();
    let take = match self.config.horizontal_order {
      Some(order) => order.min(len),
      None => len,
    };
    let mut label = format!("@{}->", self.vertical_label());
    for sibling in &self.siblings[len - take..] {
      label.push('_');
      label.push_str(sibling);
    }
    label
  }
}

/// Binarizes and Markovizes one training tree: n-ary branches become
/// right-branching cascades of `@`-labeled intermediate nodes, and every
/// label absorbs its configured vertical context.
///
/// At defaults, `(P (A a) (B b) (C c))` becomes
/// `(P (A a) (@P->_A (B b) (@P->_A_B (C c))))`.
pub fn annotate(tree: &Tree, config: &MarkovConfig) -> Tree {
  binarize(tree, &Context::new(config))
}

pub fn annotate_all(trees: &[Tree], config: &MarkovConfig) -> Vec<Tree> {
  trees.iter().map(|tree| annotate(tree, config)).collect()
}

fn munged_label(tree: &Tree, config: &MarkovConfig) -> String {
  match tree {
    Tree::Branch(label, children)
      if config.mark_unary_rewrites && children.len() == 1 && !children[0].is_leaf() =>
    {
      format!("{}-U", label)
    }
    _ => tree.label().to_string(),
  }
}

fn binarize(tree: &Tree, context: &Context) -> Tree {
  let context = context.with_parent(munged_label(tree, context.config));
  match tree {
    Tree::Leaf(word) => Tree::Leaf(word.clone()),
    Tree::Branch(_, children) => match children.len() {
      0 => Tree::Branch(context.label(), Vec::new()),
      1 => Tree::Branch(context.label(), vec![binarize(&children[0], &context)]),
      _ => binarize_cascade(children, 0, &context),
    },
  }
}

/// One level of the right-branching cascade over an n-ary branch's
/// children. The level after the first is labeled with the intermediate
/// label for the siblings emitted so far; the deepest level holds the last
/// child alone.
fn binarize_cascade(children: &[Tree], idx: usize, context: &Context) -> Tree {
  let mut emitted = vec![binarize(&children[idx], context)];
  if idx + 1 < children.len() {
    let rest = context.with_sibling(children[idx].label());
    emitted.push(binarize_cascade(children, idx + 1, &rest));
  }
  Tree::Branch(context.label(), emitted)
}

/// Inverse of `annotate`, applied to parser output: splices out the
/// synthetic `@` nodes, then strips labels back to the original
/// vocabulary.
pub fn un_annotate(tree: &Tree) -> Tree {
  let spliced = splice_synthetic(tree);
  assert!(
    spliced.len() == 1,
    "tree root is a synthetic node: {}",
    tree.label()
  );
  strip_tree(&spliced[0])
}

/// Removes `@`-labeled nodes, hoisting their children into the parent in
/// order.
fn splice_synthetic(tree: &Tree) -> Vec<Tree> {
  match tree {
    Tree::Leaf(word) => vec![Tree::Leaf(word.clone())],
    Tree::Branch(label, children) => {
      let children: Vec<Tree> = children.iter().flat_map(splice_synthetic).collect();
      if label.starts_with('@') {
        children
      } else {
        vec![Tree::Branch(label.clone(), children)]
      }
    }
  }
}

/// Cuts a label at the leftmost `-`, `^` or `:`. A delimiter in first
/// position is part of the label itself (`-NONE-`, `-LRB-`, the `:` tag),
/// so such labels pass through whole.
pub fn strip_annotations(label: &str) -> &str {
  match label.find(['-', '^', ':']) {
    Some(idx) if idx > 0 => &label[..idx],
    _ => label,
  }
}

fn strip_tree(tree: &Tree) -> Tree {
  match tree {
    Tree::Leaf(word) => Tree::Leaf(word.clone()),
    Tree::Branch(label, children) => Tree::Branch(
      strip_annotations(label).to_string(),
      children.iter().map(strip_tree).collect(),
    ),
  }
}
