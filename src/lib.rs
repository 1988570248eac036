#[macro_use]
extern crate lazy_static;

pub mod annotate;
pub mod baseline;
pub mod chart;
pub mod closure;
pub mod eval;
pub mod extract;
pub mod grammar;
pub mod lexicon;
pub mod parse_trees;
pub mod parser;
pub mod rules;
pub mod tree;
pub mod utils;

pub use crate::annotate::MarkovConfig;
pub use crate::baseline::BaselineParser;
pub use crate::eval::ConstituentEval;
pub use crate::parse_trees::{normalize, parse_trees, ROOT_LABEL};
pub use crate::parser::CkyParser;
pub use crate::tree::Tree;
pub use crate::utils::Err;

#[test]
fn test_parse_recovers_training_sentences() {
  let treebank = r#"
    (ROOT (S (NP (DT the) (NN dog)) (VP (VBD barked))))
    (ROOT (S (NP (DT a) (NN cat)) (VP (VBD slept))))
    (ROOT (S (NP (DT every) (NN bird)) (VP (VBD sang))))
  "#;
  let trees: Vec<Tree> = parse_trees(treebank)
    .unwrap()
    .iter()
    .filter_map(normalize)
    .collect();

  let parser = CkyParser::train(&trees, &MarkovConfig::default());
  let mut eval = ConstituentEval::english();
  for tree in &trees {
    let guess = parser.parse(&tree.words());
    eval.add(&guess, tree);
  }

  assert_eq!(eval.exact_rate(), 1.0, "{}", eval);
  assert_eq!(eval.f1(), 1.0, "{}", eval);
}
