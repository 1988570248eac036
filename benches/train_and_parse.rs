use criterion::{black_box, criterion_group, criterion_main, Criterion};

use espalier::{normalize, parse_trees, CkyParser, MarkovConfig, Tree};

const TREEBANK_SRC: &str = include_str!("./mini.mrg");

fn criterion_benchmark(c: &mut Criterion) {
  let trees: Vec<Tree> = parse_trees(TREEBANK_SRC)
    .unwrap()
    .iter()
    .filter_map(normalize)
    .collect();
  let config = MarkovConfig::default();

  c.bench_function("train", |b| {
    b.iter(|| CkyParser::train(black_box(&trees), black_box(&config)))
  });

  let parser = CkyParser::train(&trees, &config);
  let short_input = "The dog barked .".split(' ').collect::<Vec<_>>();
  let long_input = "The man saw a dog in the park .".split(' ').collect::<Vec<_>>();

  c.bench_function("parse short", |b| {
    b.iter(|| parser.parse(black_box(&short_input)))
  });

  c.bench_function("parse long", |b| {
    b.iter(|| parser.parse(black_box(&long_input)))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
