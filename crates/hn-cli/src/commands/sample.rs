use std::path::PathBuf;

use clap::{Args, ValueEnum};
use hn_core::sample::{self, DEFAULT_SEED, SampleFormat, SampleMode, SampleOptions, SampleSet};

use super::{ExitWith as _, Outcome, exit};

#[derive(Args, Debug)]
pub struct SampleArgs {
  /// Item file to draw from (`.gz` and `.zst` are decompressed).
  #[arg(short, long, value_name = "PATH")]
  pub input: PathBuf,

  /// Directory the set files are written to.
  #[arg(short, long, value_name = "DIR", default_value = "samples")]
  pub out_root: PathBuf,

  /// Sets to write, as `name:count`.
  #[arg(long, required = true, num_args = 1.., value_name = "NAME:COUNT")]
  pub sets: Vec<SampleSet>,

  /// Keep only these item types (e.g. `story comment`).
  #[arg(long, num_args = 1.., value_name = "TYPE")]
  pub filter_types: Vec<String>,

  /// Seed for `--mode random`.
  #[arg(long, default_value_t = DEFAULT_SEED)]
  pub seed: u64,

  #[arg(long, value_enum, default_value_t = Mode::Random)]
  pub mode: Mode,

  #[arg(long, value_enum, default_value_t = Format::Json)]
  pub format: Format,

  /// Compact JSON arrays.
  #[arg(long)]
  pub no_pretty: bool,

  /// Keep items flagged `deleted` or `dead`.
  #[arg(long)]
  pub keep_deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
  /// Seeded uniform sample of the whole file.
  Random,
  /// First items in file order.
  Head,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
  /// One JSON array per set.
  Json,
  /// One object per line.
  Jsonl,
}

impl SampleArgs {
  fn options(&self) -> SampleOptions {
    SampleOptions {
      sets:         self.sets.clone(),
      types:        self.filter_types.clone(),
      keep_deleted: self.keep_deleted,
      mode:         match self.mode {
        Mode::Random => SampleMode::Random { seed: self.seed },
        Mode::Head => SampleMode::Head,
      },
      format:       match self.format {
        Format::Json => SampleFormat::Json,
        Format::Jsonl => SampleFormat::Jsonl,
      },
      pretty:       !self.no_pretty,
    }
  }
}

pub fn run(args: SampleArgs) -> Outcome {
  let options = args.options();
  let written = sample::sample(&args.input, &args.out_root, &options).exit_with(exit::FAILURE)?;
  print!("{}", summary(&written, &options.sets));
  Ok(exit::OK)
}

fn summary(written: &[PathBuf], sets: &[SampleSet]) -> String {
  let mut out = String::from("Done:\n");
  for (path, set) in written.iter().zip(sets) {
    out.push_str(&format!("- {} ({} items)\n", path.display(), set.count));
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(input: PathBuf, out_root: PathBuf, sets: &[&str]) -> SampleArgs {
    SampleArgs {
      input,
      out_root,
      sets: sets.iter().map(|s| s.parse().unwrap()).collect(),
      filter_types: vec![],
      seed: DEFAULT_SEED,
      mode: Mode::Random,
      format: Format::Jsonl,
      no_pretty: false,
      keep_deleted: false,
    }
  }

  #[test]
  fn writes_sets_and_lists_them() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("items.jsonl");
    let body: String = (1..=20).map(|id| format!("{{\"id\":{id},\"type\":\"story\"}}\n")).collect();
    std::fs::write(&input, body).unwrap();

    let out = dir.path().join("samples");
    assert_eq!(run(args(input, out.clone(), &["small:3", "large:10"])).unwrap(), exit::OK);
    let small = std::fs::read_to_string(out.join("small.jsonl")).unwrap();
    let large = std::fs::read_to_string(out.join("large.jsonl")).unwrap();
    assert_eq!(small.lines().count(), 3);
    assert_eq!(large.lines().count(), 10);

    let written = vec![out.join("small.jsonl"), out.join("large.jsonl")];
    let sets: Vec<SampleSet> = vec!["small:3".parse().unwrap(), "large:10".parse().unwrap()];
    assert_eq!(
      summary(&written, &sets),
      format!(
        "Done:\n- {} (3 items)\n- {} (10 items)\n",
        out.join("small.jsonl").display(),
        out.join("large.jsonl").display()
      )
    );
  }

  #[test]
  fn too_few_items_fails_with_1() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("items.jsonl");
    std::fs::write(&input, "{\"id\":1,\"type\":\"story\"}\n").unwrap();

    let failure = run(args(input, dir.path().join("out"), &["a:2"])).unwrap_err();
    assert_eq!(failure.code, exit::FAILURE);
    assert!(!dir.path().join("out").exists());
  }
}
