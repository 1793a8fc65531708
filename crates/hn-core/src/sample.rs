//! Demo samples drawn from a raw item file.
//!
//! Items pass a filter (kind, `deleted`/`dead`, first occurrence of each id),
//! then either the first `k` or a seeded reservoir sample of `k` are kept and
//! cut into named sets, one output file per set.

use std::{
  collections::HashSet,
  fs::File,
  io::{BufWriter, Write},
  path::{Path, PathBuf},
  str::FromStr,
};

use rand::{Rng as _, SeedableRng as _};
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Value};

use crate::{Error, Result, source::ItemReader};

pub const DEFAULT_SEED: u64 = 42;

type Raw = Map<String, Value>;

/// One output set, written as `<name>.json` or `<name>.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSet {
  pub name:  String,
  pub count: usize,
}

impl FromStr for SampleSet {
  type Err = Error;

  /// `name:count`, with a non-empty name and a count of at least one.
  fn from_str(s: &str) -> Result<Self> {
    let bad = || Error::BadSampleSet(s.to_owned());
    let (name, count) = s.split_once(':').ok_or_else(bad)?;
    let name = name.trim();
    let count: usize = count.trim().parse().map_err(|_| bad())?;
    if name.is_empty() || count == 0 {
      return Err(bad());
    }
    Ok(Self { name: name.to_owned(), count })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
  /// Uniform reservoir sample, reproducible for a given seed.
  Random { seed: u64 },
  /// The first items that pass the filter.
  Head,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
  /// One JSON array per set.
  #[default]
  Json,
  /// One object per line.
  Jsonl,
}

impl SampleFormat {
  fn extension(self) -> &'static str {
    match self {
      Self::Json => "json",
      Self::Jsonl => "jsonl",
    }
  }
}

#[derive(Debug, Clone)]
pub struct SampleOptions {
  pub sets:         Vec<SampleSet>,
  /// Accepted `type` values; empty accepts every kind.
  pub types:        Vec<String>,
  pub keep_deleted: bool,
  pub mode:         SampleMode,
  pub format:       SampleFormat,
  /// Indented output for [`SampleFormat::Json`].
  pub pretty:       bool,
}

impl SampleOptions {
  pub fn total(&self) -> usize { self.sets.iter().map(|s| s.count).sum() }
}

// ─── Filtering ───────────────────────────────────────────────────────────────

fn truthy(value: Option<&Value>) -> bool {
  match value {
    None | Some(Value::Null) => false,
    Some(Value::Bool(b)) => *b,
    Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
    Some(Value::String(s)) => !s.is_empty(),
    Some(Value::Array(a)) => !a.is_empty(),
    Some(Value::Object(o)) => !o.is_empty(),
  }
}

/// Keeps the first occurrence of each id among items that pass the kind and
/// `deleted`/`dead` checks. Items without an id are dropped.
struct SampleFilter<'a> {
  types:        &'a [String],
  keep_deleted: bool,
  seen:         HashSet<String>,
}

impl SampleFilter<'_> {
  fn accept(&mut self, raw: &Raw) -> bool {
    if !self.types.is_empty() {
      let kind = raw.get("type").and_then(Value::as_str);
      if !kind.is_some_and(|k| self.types.iter().any(|t| t == k)) {
        return false;
      }
    }
    if !self.keep_deleted && (truthy(raw.get("deleted")) || truthy(raw.get("dead"))) {
      return false;
    }
    match raw.get("id") {
      None | Some(Value::Null) => false,
      Some(id) => self.seen.insert(id.to_string()),
    }
  }
}

// ─── Drawing ─────────────────────────────────────────────────────────────────

/// Reservoir sampling: every item of the stream ends up in the result with
/// probability `k / n`.
fn reservoir(items: impl Iterator<Item = Result<Raw>>, k: usize, rng: &mut ChaCha8Rng) -> Result<Vec<Raw>> {
  let mut kept = Vec::with_capacity(k);
  for (seen, item) in items.enumerate() {
    let item = item?;
    if kept.len() < k {
      kept.push(item);
    } else {
      let j = rng.gen_range(0..=seen);
      if j < k {
        kept[j] = item;
      }
    }
  }
  Ok(kept)
}

/// Filter `items` and draw enough of them to fill every set.
pub fn draw(items: impl Iterator<Item = Result<Raw>>, options: &SampleOptions) -> Result<Vec<Raw>> {
  let wanted = options.total();
  let mut filter = SampleFilter {
    types:        &options.types,
    keep_deleted: options.keep_deleted,
    seen:         HashSet::new(),
  };
  let accepted = items.filter(|item| item.as_ref().map_or(true, |raw| filter.accept(raw)));

  let drawn = match options.mode {
    SampleMode::Head => accepted.take(wanted).collect::<Result<Vec<_>>>()?,
    SampleMode::Random { seed } => reservoir(accepted, wanted, &mut ChaCha8Rng::seed_from_u64(seed))?,
  };
  if drawn.len() < wanted {
    return Err(Error::NotEnoughItems { wanted, got: drawn.len() });
  }
  Ok(drawn)
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// Cut `items` into consecutive sets and write one file per set under
/// `out_root`. Returns the written paths in set order.
pub fn write_sets(out_root: &Path, items: &[Raw], options: &SampleOptions) -> Result<Vec<PathBuf>> {
  std::fs::create_dir_all(out_root).map_err(|e| Error::io(out_root, e))?;

  let mut written = Vec::with_capacity(options.sets.len());
  let mut rest = items;
  for set in &options.sets {
    if rest.len() < set.count {
      return Err(Error::NotEnoughItems { wanted: options.total(), got: items.len() });
    }
    let (chunk, tail) = rest.split_at(set.count);
    rest = tail;

    let path = out_root.join(format!("{}.{}", set.name, options.format.extension()));
    write_set(&path, chunk, options).map_err(|e| Error::io(&path, e))?;
    written.push(path);
  }
  Ok(written)
}

fn write_set(path: &Path, items: &[Raw], options: &SampleOptions) -> std::io::Result<()> {
  let mut out = BufWriter::new(File::create(path)?);
  match options.format {
    SampleFormat::Jsonl => {
      for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.write_all(b"\n")?;
      }
    }
    SampleFormat::Json if options.pretty => serde_json::to_writer_pretty(&mut out, items)?,
    SampleFormat::Json => serde_json::to_writer(&mut out, items)?,
  }
  if options.format == SampleFormat::Json {
    out.write_all(b"\n")?;
  }
  out.flush()
}

/// Read `input`, draw the sample and write the sets.
pub fn sample(input: &Path, out_root: &Path, options: &SampleOptions) -> Result<Vec<PathBuf>> {
  let reader = ItemReader::open(input)?;
  let items = draw(reader, options)?;
  tracing::info!(input = %input.display(), items = items.len(), sets = options.sets.len(), "sample drawn");
  write_sets(out_root, &items, options)
}
