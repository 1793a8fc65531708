use std::path::PathBuf;

use clap::{Args, ValueEnum};
use hn_core::combine::{CombineOptions, DedupMode, combine};

use super::{ExitWith as _, Outcome, exit};

#[derive(Args, Debug)]
pub struct CombineArgs {
  /// Directory holding the part files.
  #[arg(short, long, value_name = "DIR")]
  pub input_dir: PathBuf,

  /// Gzip-compressed JSONL output.
  #[arg(short, long, value_name = "PATH")]
  pub output: PathBuf,

  /// Glob matched against file names (`*`, `?`, `[...]`).
  #[arg(short, long, default_value = "*.jsonl.gz")]
  pub pattern: String,

  /// Descend into subdirectories.
  #[arg(short, long)]
  pub recursive: bool,

  /// How duplicate lines are recognised.
  #[arg(long, value_enum, default_value_t = Dedup::Line)]
  pub dedup: Dedup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Dedup {
  /// Identical text.
  Line,
  /// Identical JSON, ignoring key order and whitespace.
  Json,
}

impl From<Dedup> for DedupMode {
  fn from(value: Dedup) -> Self {
    match value {
      Dedup::Line => Self::Line,
      Dedup::Json => Self::Json,
    }
  }
}

pub fn run(args: CombineArgs) -> Outcome {
  let options = CombineOptions {
    pattern:   args.pattern,
    recursive: args.recursive,
    dedup:     args.dedup.into(),
  };

  let total = combine(&args.input_dir, &args.output, &options, |idx, n, path, counts| {
    let name = path.file_name().unwrap_or(path.as_os_str()).to_string_lossy();
    println!(
      "[{idx}/{n}] {name}: lines {}, unique {}, duplicates {}",
      counts.lines, counts.unique, counts.duplicates
    );
  })
  .exit_with(exit::FAILURE)?;

  println!("Done: {}", args.output.display());
  println!(
    "Total: lines {}, unique written {}, duplicates removed {}",
    total.lines, total.unique, total.duplicates
  );
  Ok(exit::OK)
}

#[cfg(test)]
mod tests {
  use std::{
    fs::File,
    io::{Read as _, Write as _},
  };

  use super::*;

  fn args(dir: &std::path::Path, dedup: Dedup) -> CombineArgs {
    CombineArgs {
      input_dir: dir.join("parts"),
      output:    dir.join("all.jsonl.gz"),
      pattern:   "*.jsonl".to_owned(),
      recursive: false,
      dedup,
    }
  }

  #[test]
  fn no_matching_inputs_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("parts")).unwrap();
    let failure = run(args(dir.path(), Dedup::Line)).unwrap_err();
    assert_eq!(failure.code, exit::FAILURE);
    assert!(!dir.path().join("all.jsonl.gz").exists());
  }

  #[test]
  fn writes_deduplicated_output() {
    let dir = tempfile::tempdir().unwrap();
    let parts = dir.path().join("parts");
    std::fs::create_dir(&parts).unwrap();
    let mut a = File::create(parts.join("a.jsonl")).unwrap();
    writeln!(a, r#"{{"id":1,"type":"story"}}"#).unwrap();
    let mut b = File::create(parts.join("b.jsonl")).unwrap();
    writeln!(b, r#"{{"type":"story","id":1}}"#).unwrap();
    drop((a, b));

    assert_eq!(run(args(dir.path(), Dedup::Json)).unwrap(), exit::OK);

    let mut gz = Vec::new();
    File::open(dir.path().join("all.jsonl.gz")).unwrap().read_to_end(&mut gz).unwrap();
    // gzip magic
    assert_eq!(&gz[..2], &[0x1f, 0x8b]);
  }
}
