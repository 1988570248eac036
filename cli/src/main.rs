use std::env;
use std::fs;
use std::io;
use std::io::Write;
use std::process;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use espalier::{
  normalize, parse_trees, BaselineParser, CkyParser, ConstituentEval, MarkovConfig, Tree,
};
use espalier::Err;

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} TRAIN_FILE [options]

Options:
  -h, --help          Print this message
  -t, --test FILE     Parse FILE's sentences and score them against its trees
                      (defaults to a read-parse-print loop on stdin)
  -v, --vertical N    Vertical Markovization order (defaults to 1)
  -z, --horizontal N  Horizontal Markovization order (defaults to unbounded)
  -u, --mark-unaries  Mark unary rewrites in the annotated grammar
  -b, --baseline      Use the memorizing baseline instead of the CKY parser
  -s, --max-length N  Skip test sentences longer than N words (defaults to 40)",
    prog_name
  )
}

enum Parser {
  Cky(CkyParser),
  Baseline(BaselineParser),
}

impl Parser {
  fn parse(&self, words: &[&str]) -> Tree {
    match self {
      Self::Cky(parser) => parser.parse(words),
      Self::Baseline(parser) => parser.parse(words),
    }
  }
}

fn read_treebank(path: &str) -> Result<Vec<Tree>, Err> {
  let text = fs::read_to_string(path)?;
  Ok(parse_trees(&text)?.iter().filter_map(normalize).collect())
}

fn evaluate(parser: &Parser, test_trees: &[Tree], max_length: usize) {
  let mut eval = ConstituentEval::english();
  let mut skipped = 0;
  for gold in test_trees {
    let words = gold.words();
    if words.len() > max_length {
      skipped += 1;
      continue;
    }
    let start = Instant::now();
    let guess = parser.parse(&words);
    let f1 = eval.add(&guess, gold);
    println!("guess: {}", guess);
    println!("gold:  {}", gold);
    println!(
      "f1: {:.2} ({} words in {:.1?})\n",
      100.0 * f1,
      words.len(),
      start.elapsed()
    );
  }
  if skipped > 0 {
    println!("skipped {} sentences over {} words", skipped, max_length);
  }
  println!("{}", eval);
}

fn repl(parser: &Parser) -> Result<(), Err> {
  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(_) => {
        if input.is_empty() {
          // ctrl+d
          return Ok(());
        }
        let words: Vec<&str> = input.split_whitespace().collect();
        println!("{}", parser.parse(&words));
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}

struct Args {
  train_file: String,
  test_file: Option<String>,
  config: MarkovConfig,
  baseline: bool,
  max_length: usize,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    if v.is_empty() {
      return Err(Self::make_error_message("bad argument vector", "espalier"));
    }

    let args_len = v.len();
    let mut iter = v.into_iter();
    let prog_name = iter.next().unwrap();

    if args_len < 2 {
      return Err(Self::make_error_message("not enough arguments", prog_name));
    }

    let mut train_file: Option<String> = None;
    let mut test_file: Option<String> = None;
    let mut config = MarkovConfig::default();
    let mut baseline = false;
    let mut max_length = 40;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-u" || o == "--mark-unaries" {
        config.mark_unary_rewrites = true;
      } else if o == "-b" || o == "--baseline" {
        baseline = true;
      } else if o == "-t" || o == "--test" {
        test_file = Some(Self::value(&mut iter, &o, &prog_name)?);
      } else if o == "-v" || o == "--vertical" {
        config.vertical_order = Self::numeric(&mut iter, &o, &prog_name)?;
        if config.vertical_order == 0 {
          return Err(Self::make_error_message(
            "the vertical order counts the node itself and must be at least 1",
            prog_name,
          ));
        }
      } else if o == "-z" || o == "--horizontal" {
        config.horizontal_order = Some(Self::numeric(&mut iter, &o, &prog_name)?);
      } else if o == "-s" || o == "--max-length" {
        max_length = Self::numeric(&mut iter, &o, &prog_name)?;
      } else if train_file.is_none() {
        train_file = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    if let Some(train_file) = train_file {
      Ok(Self {
        train_file,
        test_file,
        config,
        baseline,
        max_length,
      })
    } else {
      Err(Self::make_error_message(
        "missing treebank filename",
        prog_name,
      ))
    }
  }

  fn value(
    iter: &mut impl Iterator<Item = String>,
    flag: &str,
    prog_name: &str,
  ) -> Result<String, String> {
    iter
      .next()
      .ok_or_else(|| Self::make_error_message(&format!("{} needs a value", flag), prog_name))
  }

  fn numeric(
    iter: &mut impl Iterator<Item = String>,
    flag: &str,
    prog_name: &str,
  ) -> Result<usize, String> {
    Self::value(iter, flag, prog_name)?
      .parse()
      .map_err(|_| Self::make_error_message(&format!("{} needs a number", flag), prog_name))
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let train_trees = read_treebank(&opts.train_file)?;
  if train_trees.is_empty() {
    return Err(format!("no trees in {}", opts.train_file).into());
  }

  let start = Instant::now();
  let parser = if opts.baseline {
    Parser::Baseline(BaselineParser::train(&train_trees, &opts.config))
  } else {
    Parser::Cky(CkyParser::train(&train_trees, &opts.config))
  };
  println!(
    "trained on {} trees in {:.1?}",
    train_trees.len(),
    start.elapsed()
  );

  match &opts.test_file {
    Some(test_file) => {
      let test_trees = read_treebank(test_file)?;
      evaluate(&parser, &test_trees, opts.max_length);
      Ok(())
    }
    None => repl(&parser),
  }
}
