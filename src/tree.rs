use std::fmt;

/// A constituency tree: branches carry category labels, leaves carry words.
/// A branch whose single child is a leaf is a *preterminal* (a
/// part-of-speech node like `(NN dog)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tree {
  Branch(String, Vec<Tree>),
  Leaf(String),
}

impl Tree {
  pub fn branch(label: &str, children: Vec<Tree>) -> Self {
    Self::Branch(label.to_string(), children)
  }

  pub fn leaf(word: &str) -> Self {
    Self::Leaf(word.to_string())
  }

  /// The node's label: the category of a branch, the word of a leaf.
  pub fn label(&self) -> &str {
    match self {
      Self::Branch(label, _) => label,
      Self::Leaf(word) => word,
    }
  }

  pub fn is_leaf(&self) -> bool {
    match self {
      Self::Leaf(_) => true,
      _ => false,
    }
  }

  pub fn is_branch(&self) -> bool {
    match self {
      Self::Branch(_, _) => true,
      _ => false,
    }
  }

  pub fn is_preterminal(&self) -> bool {
    match self {
      Self::Branch(_, children) => children.len() == 1 && children[0].is_leaf(),
      Self::Leaf(_) => false,
    }
  }

  pub fn children(&self) -> &[Tree] {
    match self {
      Self::Branch(_, children) => children,
      Self::Leaf(_) => &[],
    }
  }

  /// The leaf words, left to right.
  pub fn words(&self) -> Vec<&str> {
    let mut words = Vec::new();
    self.collect_words(&mut words);
    words
  }

  fn collect_words<'a>(&'a self, words: &mut Vec<&'a str>) {
    match self {
      Self::Leaf(word) => words.push(word),
      Self::Branch(_, children) => {
        for child in children {
          child.collect_words(words);
        }
      }
    }
  }

  /// The preterminal labels, left to right; parallel to `words`.
  pub fn preterminals(&self) -> Vec<&str> {
    let mut tags = Vec::new();
    self.collect_preterminals(&mut tags);
    tags
  }

  fn collect_preterminals<'a>(&'a self, tags: &mut Vec<&'a str>) {
    if self.is_preterminal() {
      tags.push(self.label());
    } else if let Self::Branch(_, children) = self {
      for child in children {
        child.collect_preterminals(tags);
      }
    }
  }
}

/// Single-line Penn Treebank bracketing; the inverse of the reader in
/// `parse_trees`.
impl fmt::Display for Tree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Leaf(word) => write!(f, "{}", word),
      Self::Branch(label, children) => {
        write!(f, "({}", label)?;
        for child in children {
          write!(f, " {}", child)?;
        }
        write!(f, ")")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dog_tree() -> Tree {
    Tree::branch(
      "S",
      vec![
        Tree::branch(
          "NP",
          vec![
            Tree::branch("DT", vec![Tree::leaf("the")]),
            Tree::branch("NN", vec![Tree::leaf("dog")]),
          ],
        ),
        Tree::branch("VP", vec![Tree::branch("VBD", vec![Tree::leaf("barked")])]),
      ],
    )
  }

  #[test]
  fn words_are_left_to_right() {
    assert_eq!(dog_tree().words(), vec!["the", "dog", "barked"]);
  }

  #[test]
  fn preterminals_parallel_words() {
    assert_eq!(dog_tree().preterminals(), vec!["DT", "NN", "VBD"]);
  }

  #[test]
  fn preterminal_detection() {
    let tree = dog_tree();
    assert!(!tree.is_preterminal());
    assert!(tree.children()[0].children()[0].is_preterminal());
    assert!(!Tree::leaf("dog").is_preterminal());
  }

  #[test]
  fn displays_as_brackets() {
    assert_eq!(
      dog_tree().to_string(),
      "(S (NP (DT the) (NN dog)) (VP (VBD barked)))"
    );
  }
}
