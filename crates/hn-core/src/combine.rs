//! Merge many JSONL(.gz) captures into one gzip file without duplicate lines.
//!
//! Overlapping fetch runs produce the same item many times. Merging them
//! before ingest shrinks the input; ingest itself stays correct either way.
//!
//! Lines are copied byte for byte. Only the trailing line break is ignored
//! when comparing, and a last line without one gets a `\n` so it cannot run
//! into the next file.

use std::{
  collections::HashSet,
  fs::File,
  io::{BufRead as _, BufWriter, Write},
  path::{Path, PathBuf},
};

use flate2::{Compression, write::GzEncoder};
use glob::Pattern;
use serde_json::Value;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::{Error, Result, source::open_source};

/// How two lines are judged equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupMode {
  /// Byte-identical after trimming.
  #[default]
  Line,
  /// Equal as JSON: key order and whitespace are ignored. Lines that are not
  /// JSON fall back to [`DedupMode::Line`].
  Json,
}

/// Counts for one input file, or the totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombineCounts {
  pub lines:      u64,
  pub unique:     u64,
  pub duplicates: u64,
}

#[derive(Debug, Clone)]
pub struct CombineOptions {
  /// File-name pattern; a single `*` wildcard is supported.
  pub pattern:   String,
  pub recursive: bool,
  pub dedup:     DedupMode,
}

impl Default for CombineOptions {
  fn default() -> Self {
    Self { pattern: "*.jsonl.gz".to_owned(), recursive: false, dedup: DedupMode::Line }
  }
}

type Key = [u8; 16];

fn dedup_key(line: &[u8], mode: DedupMode) -> Key {
  let canonical = match mode {
    DedupMode::Line => None,
    // serde_json's default map is a BTreeMap, so re-serialising sorts keys.
    DedupMode::Json => serde_json::from_slice::<Value>(line)
      .ok()
      .and_then(|v| serde_json::to_vec(&v).ok()),
  };
  let digest = Sha256::digest(canonical.as_deref().unwrap_or(line));
  let mut key = [0u8; 16];
  key.copy_from_slice(&digest[..16]);
  key
}

/// `line` without its trailing `\r`/`\n` bytes.
fn strip_line_end(line: &[u8]) -> &[u8] {
  let end = line.iter().rposition(|&b| !matches!(b, b'\r' | b'\n')).map_or(0, |i| i + 1);
  &line[..end]
}

/// Files under `dir` whose name matches the glob `pattern`, sorted by path.
///
/// Without `recursive` only the direct children of `dir` are considered.
pub fn find_inputs(dir: &Path, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>> {
  let matcher = Pattern::new(pattern)
    .map_err(|source| Error::Pattern { pattern: pattern.to_owned(), source })?;
  let walker = WalkDir::new(dir)
    .min_depth(1)
    .max_depth(if recursive { usize::MAX } else { 1 })
    .follow_links(true);

  let mut found = Vec::new();
  for entry in walker {
    let entry = entry.map_err(|e| {
      let path = e.path().unwrap_or(dir).to_path_buf();
      Error::io(path, e.into())
    })?;
    if entry.file_type().is_file() && matcher.matches(&entry.file_name().to_string_lossy()) {
      found.push(entry.into_path());
    }
  }
  found.sort();
  Ok(found)
}

/// Merge every matching file under `input_dir` into `output`.
///
/// `on_file` is called after each input with its 1-based index, the number of
/// inputs, and its counts. Returns the totals.
pub fn combine(
  input_dir: &Path,
  output: &Path,
  options: &CombineOptions,
  mut on_file: impl FnMut(usize, usize, &Path, &CombineCounts),
) -> Result<CombineCounts> {
  let inputs = find_inputs(input_dir, &options.pattern, options.recursive)?;
  if inputs.is_empty() {
    return Err(Error::NoInputs { dir: input_dir.to_path_buf(), pattern: options.pattern.clone() });
  }
  if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
  }

  let file = File::create(output).map_err(|e| Error::io(output, e))?;
  let mut writer = GzEncoder::new(BufWriter::new(file), Compression::default());
  let mut seen: HashSet<Key> = HashSet::new();
  let mut total = CombineCounts::default();

  for (idx, input) in inputs.iter().enumerate() {
    let mut counts = CombineCounts::default();
    let mut reader = open_source(input)?;
    let mut line = Vec::new();
    loop {
      line.clear();
      if reader.read_until(b'\n', &mut line).map_err(|e| Error::io(input, e))? == 0 {
        break;
      }
      counts.lines += 1;
      if !seen.insert(dedup_key(strip_line_end(&line), options.dedup)) {
        counts.duplicates += 1;
        continue;
      }
      writer.write_all(&line).map_err(|e| Error::io(output, e))?;
      if !line.ends_with(b"\n") {
        writer.write_all(b"\n").map_err(|e| Error::io(output, e))?;
      }
      counts.unique += 1;
    }

    total.lines += counts.lines;
    total.unique += counts.unique;
    total.duplicates += counts.duplicates;
    on_file(idx + 1, inputs.len(), input, &counts);
  }

  writer
    .finish()
    .and_then(|mut inner| inner.flush())
    .map_err(|e| Error::io(output, e))?;
  Ok(total)
}

#[cfg(test)]
mod tests {
  use std::io::Read as _;

  use super::*;
  use crate::source::LineReader;

  fn gz(path: &Path, body: &str) {
    let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    enc.write_all(body.as_bytes()).unwrap();
    enc.finish().unwrap();
  }

  fn read_lines(path: &Path) -> Vec<String> {
    LineReader::open(path)
      .unwrap()
      .map(|l| String::from_utf8(l.unwrap()).unwrap())
      .collect()
  }

  #[test]
  fn glob_patterns() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["hn_2024_01.jsonl.gz", "hn_2024.jsonl.gz", "part1.jsonl.gz", "part12.jsonl.gz"] {
      std::fs::write(dir.path().join(name), "").unwrap();
    }
    let names = |pattern: &str| -> Vec<String> {
      find_inputs(dir.path(), pattern, false)
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
    };

    assert_eq!(names("hn_*_*.jsonl.gz"), vec!["hn_2024_01.jsonl.gz"]);
    assert_eq!(names("part?.jsonl.gz"), vec!["part1.jsonl.gz"]);
    assert_eq!(names("part[0-9][0-9].jsonl.gz"), vec!["part12.jsonl.gz"]);
    assert_eq!(names("*.jsonl.gz").len(), 4);
    assert!(matches!(find_inputs(dir.path(), "[", false), Err(Error::Pattern { .. })));
  }

  #[test]
  fn lines_are_copied_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    gz(&dir.path().join("1.jsonl.gz"), "{ \"id\": 1 }  \r\n\n{\"id\":2}\n\n");
    gz(&dir.path().join("2.jsonl.gz"), "{ \"id\": 1 }  \n{\"id\":3}");
    gz(&dir.path().join("3.jsonl.gz"), "{\"id\":4}\n");
    let out = dir.path().join("all.gz");

    let total = combine(dir.path(), &out, &CombineOptions::default(), |_, _, _, _| {}).unwrap();
    assert_eq!(total, CombineCounts { lines: 7, unique: 5, duplicates: 2 });

    let mut body = String::new();
    flate2::read::MultiGzDecoder::new(File::open(&out).unwrap()).read_to_string(&mut body).unwrap();
    assert_eq!(body, "{ \"id\": 1 }  \r\n\n{\"id\":2}\n{\"id\":3}\n{\"id\":4}\n");
  }

  #[test]
  fn drops_repeated_lines_across_files() {
    let dir = tempfile::tempdir().unwrap();
    gz(&dir.path().join("1.jsonl.gz"), "{\"id\":1}\n{\"id\":2}\n");
    gz(&dir.path().join("2.jsonl.gz"), "{\"id\":2}\n{\"id\":3}\n{\"id\":1}\n");
    std::fs::write(dir.path().join("ignored.txt"), "{\"id\":4}\n").unwrap();
    let out = dir.path().join("out").join("all.jsonl.gz");

    let mut per_file = Vec::new();
    let total = combine(dir.path(), &out, &CombineOptions::default(), |i, n, _, c| {
      per_file.push((i, n, *c));
    })
    .unwrap();

    assert_eq!(total, CombineCounts { lines: 5, unique: 3, duplicates: 2 });
    assert_eq!(per_file[1], (2, 2, CombineCounts { lines: 3, unique: 1, duplicates: 2 }));
    assert_eq!(read_lines(&out), vec!["{\"id\":1}", "{\"id\":2}", "{\"id\":3}"]);
  }

  #[test]
  fn json_mode_ignores_key_order() {
    let dir = tempfile::tempdir().unwrap();
    gz(&dir.path().join("a.jsonl.gz"), "{\"id\":1,\"type\":\"story\"}\n{ \"type\": \"story\", \"id\": 1 }\n");
    let out = dir.path().join("merged.gz");

    let line_mode = combine(dir.path(), &out, &CombineOptions::default(), |_, _, _, _| {}).unwrap();
    assert_eq!(line_mode.unique, 2);

    let options = CombineOptions { dedup: DedupMode::Json, ..CombineOptions::default() };
    let json_mode = combine(dir.path(), &out, &options, |_, _, _, _| {}).unwrap();
    assert_eq!(json_mode.unique, 1);
  }

  #[test]
  fn recursive_search() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    gz(&dir.path().join("nested").join("a.jsonl.gz"), "{\"id\":1}\n");
    let out = dir.path().join("merged.gz");

    let flat = combine(dir.path(), &out, &CombineOptions::default(), |_, _, _, _| {});
    assert!(matches!(flat, Err(Error::NoInputs { .. })));

    let options = CombineOptions { recursive: true, ..CombineOptions::default() };
    assert_eq!(combine(dir.path(), &out, &options, |_, _, _, _| {}).unwrap().unique, 1);
  }
}
