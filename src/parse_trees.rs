use regex::Regex;
/// Recursive-descent parsing of Penn-Treebank bracketed trees
use std::str::FromStr;

use crate::annotate::strip_annotations;
use crate::tree::Tree;
use crate::Err;

/// Label given to headless wrapper roots, so `( (S ...))` reads as
/// `(ROOT (S ...))`. Also the root of flat fallback parses.
pub const ROOT_LABEL: &str = "ROOT";

impl FromStr for Tree {
  type Err = Err;

  /// Parses exactly one bracketed tree, ignoring surrounding whitespace.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (tree, rest) = parse_tree(skip_whitespace(s))?;
    let rest = skip_whitespace(rest);
    if rest.is_empty() {
      Ok(tree)
    } else {
      Err(format!("trailing input after tree: {}", rest).into())
    }
  }
}

/// Parses a whole treebank: zero or more bracketed trees.
pub fn parse_trees(s: &str) -> Result<Vec<Tree>, Err> {
  let mut trees = Vec::new();
  let mut rem = skip_whitespace(s);
  while !rem.is_empty() {
    let (tree, s) = parse_tree(rem)?;
    trees.push(tree);
    rem = skip_whitespace(s);
  }
  Ok(trees)
}

/// Treebank hygiene for trees read from disk: drops `-NONE-` empty
/// elements and any branch the removal leaves childless, strips function
/// annotations from branch labels, and collapses X-over-X unary rewrites.
/// Returns None when nothing survives.
pub fn normalize(tree: &Tree) -> Option<Tree> {
  match tree {
    Tree::Leaf(word) => Some(Tree::Leaf(word.clone())),
    Tree::Branch(label, children) => {
      if label == "-NONE-" {
        return None;
      }
      let label = strip_annotations(label);
      let children: Vec<Tree> = children.iter().filter_map(normalize).collect();
      if children.is_empty() {
        return None;
      }
      if children.len() == 1 && children[0].is_branch() && children[0].label() == label {
        return children.into_iter().next();
      }
      Some(Tree::Branch(label.to_string(), children))
    }
  }
}

type Infallible<'a, T> = (T, &'a str);
type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// Try to consume a regex, returning None if it doesn't match
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  if let Some(caps) = re.captures(s) {
    let m = caps.get(0).unwrap();
    if m.start() > 0 {
      return (None, s);
    }
    let (_, rest) = s.split_at(m.end());
    (Some(m.as_str()), rest)
  } else {
    (None, s)
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<Option<char>> {
  let mut iter = s.char_indices().peekable();
  if let Some((_, c1)) = iter.next() {
    if c == c1 {
      let rest = if let Some((idx, _)) = iter.peek() {
        s.split_at(*idx).1
      } else {
        ""
      };
      return (Some(c), rest);
    }
  }
  (None, s)
}

/// Try to consume a char, failing if it doesn't match
fn needed_char(c: char, s: &str) -> ParseResult<char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", c, s).into())
  }
}

fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE, r"\s+");
  optional_re(&*WHITESPACE, s).1
}

/// A label or word: anything up to whitespace or a paren
fn parse_atom(s: &str) -> Infallible<Option<&str>> {
  regex_static!(ATOM, r"[^\s()]+");
  optional_re(&*ATOM, s)
}

/// `(LABEL child ...)` where children are nested trees or bare words;
/// a missing label means a headless wrapper root.
fn parse_tree(s: &str) -> ParseResult<Tree> {
  let (_, s) = needed_char('(', s)?;
  let s = skip_whitespace(s);
  let (label, s) = parse_atom(s);
  let label = label.unwrap_or(ROOT_LABEL);

  let mut children = Vec::new();
  let mut rem = skip_whitespace(s);
  loop {
    if let (Some(_), s) = optional_char(')', rem) {
      return Ok((Tree::Branch(label.to_string(), children), s));
    }
    if rem.starts_with('(') {
      let (child, s) = parse_tree(rem)?;
      children.push(child);
      rem = skip_whitespace(s);
    } else {
      match parse_atom(rem) {
        (Some(word), s) => {
          children.push(Tree::Leaf(word.to_string()));
          rem = skip_whitespace(s);
        }
        (None, s) => return Err(format!("expected subtree, word or ) at {}", s).into()),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_nested_brackets() {
    let tree: Tree = "(S (NP (DT the) (NN dog)) (VP (VBD barked)))"
      .parse()
      .unwrap();
    assert_eq!(tree.label(), "S");
    assert_eq!(tree.words(), vec!["the", "dog", "barked"]);
    assert_eq!(tree.preterminals(), vec!["DT", "NN", "VBD"]);
  }

  #[test]
  fn display_round_trips() {
    let text = "(ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))";
    let tree: Tree = text.parse().unwrap();
    assert_eq!(tree.to_string(), text);
    assert_eq!(tree.to_string().parse::<Tree>().unwrap(), tree);
  }

  #[test]
  fn headless_root_becomes_root() {
    let tree: Tree = "( (S (NN dogs) (VBP bark)))".parse().unwrap();
    assert_eq!(tree.label(), ROOT_LABEL);
    assert_eq!(tree.children().len(), 1);
    assert_eq!(tree.children()[0].label(), "S");
  }

  #[test]
  fn parses_whole_treebanks() {
    let trees = parse_trees("(S (NN dogs))\n\n( (NP (NN cats)))\n").unwrap();
    assert_eq!(trees.len(), 2);
    assert_eq!(trees[0].label(), "S");
    assert_eq!(trees[1].label(), ROOT_LABEL);
    assert!(parse_trees("  \n ").unwrap().is_empty());
  }

  #[test]
  fn rejects_unbalanced_input() {
    assert!("(S (NN dogs)".parse::<Tree>().is_err());
    assert!("(S (NN dogs))) extra".parse::<Tree>().is_err());
    assert!("dogs".parse::<Tree>().is_err());
  }

  #[test]
  fn punctuation_labels_survive() {
    let tree: Tree = "(S (PRP$ its) (-LRB- -LRB-) (: ;))".parse().unwrap();
    assert_eq!(tree.preterminals(), vec!["PRP$", "-LRB-", ":"]);
  }

  #[test]
  fn normalize_drops_empty_elements() {
    let tree: Tree = "(S (NP-SBJ (-NONE- *T*)) (VP (VBD barked)))".parse().unwrap();
    let normalized = normalize(&tree).unwrap();
    assert_eq!(normalized.to_string(), "(S (VP (VBD barked)))");
  }

  #[test]
  fn normalize_strips_function_tags() {
    let tree: Tree = "(NP-SBJ-1 (NN dog))".parse().unwrap();
    assert_eq!(normalize(&tree).unwrap().to_string(), "(NP (NN dog))");
  }

  #[test]
  fn normalize_collapses_x_over_x() {
    let tree: Tree = "(NP (NP (NN dog)))".parse().unwrap();
    assert_eq!(normalize(&tree).unwrap().to_string(), "(NP (NN dog))");
    // a preterminal over a word spelled like its tag is not a collapse target
    let tree: Tree = "(NN NN)".parse().unwrap();
    assert_eq!(normalize(&tree).unwrap().to_string(), "(NN NN)");
  }

  #[test]
  fn normalize_can_empty_a_tree() {
    let tree: Tree = "(S (NP (-NONE- *)))".parse().unwrap();
    assert_eq!(normalize(&tree), None);
  }
}
