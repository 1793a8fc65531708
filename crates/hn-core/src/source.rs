//! Line-delimited JSON sources, optionally compressed.
//!
//! Decompression is picked from the file suffix: `.gz` is read as
//! (multi-member) gzip, `.zst` as zstd, anything else as plain text. Readers
//! are lazy and single-pass; re-reading a source means opening it again.

use std::{
  fs::File,
  io::{BufRead, BufReader},
  path::{Path, PathBuf},
};

use flate2::read::MultiGzDecoder;
use serde_json::{Map, Value};

use crate::{Error, Result};

const READ_BUF_BYTES: usize = 256 * 1024;

/// Compression applied to a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
  None,
  Gzip,
  Zstd,
}

impl Compression {
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some("gz") => Self::Gzip,
      Some("zst") => Self::Zstd,
      _ => Self::None,
    }
  }
}

/// Open `path` as a buffered, decompressed byte stream.
pub fn open_source(path: &Path) -> Result<Box<dyn BufRead + Send>> {
  let file = File::open(path).map_err(|e| match e.kind() {
    std::io::ErrorKind::NotFound => Error::SourceNotFound(path.to_path_buf()),
    _ => Error::io(path, e),
  })?;

  Ok(match Compression::from_path(path) {
    Compression::None => Box::new(BufReader::with_capacity(READ_BUF_BYTES, file)),
    Compression::Gzip => Box::new(BufReader::with_capacity(
      READ_BUF_BYTES,
      MultiGzDecoder::new(BufReader::new(file)),
    )),
    Compression::Zstd => {
      let decoder = zstd::stream::read::Decoder::new(file).map_err(|e| Error::io(path, e))?;
      Box::new(BufReader::with_capacity(READ_BUF_BYTES, decoder))
    }
  })
}

// ─── Lines ───────────────────────────────────────────────────────────────────

/// Yields every non-blank line of a source, with surrounding whitespace and
/// the line terminator removed.
///
/// Lines are raw bytes: invalid UTF-8 is left for the consumer to judge.
pub struct LineReader {
  path:  PathBuf,
  inner: Box<dyn BufRead + Send>,
  buf:   Vec<u8>,
  lines: u64,
  done:  bool,
}

impl LineReader {
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    Ok(Self {
      path:  path.to_path_buf(),
      inner: open_source(path)?,
      buf:   Vec::with_capacity(4096),
      lines: 0,
      done:  false,
    })
  }

  pub fn path(&self) -> &Path { &self.path }

  /// Physical lines consumed so far, blank ones included.
  pub fn lines_read(&self) -> u64 { self.lines }
}

impl Iterator for LineReader {
  type Item = Result<Vec<u8>>;

  fn next(&mut self) -> Option<Self::Item> {
    while !self.done {
      self.buf.clear();
      match self.inner.read_until(b'\n', &mut self.buf) {
        Ok(0) => self.done = true,
        Ok(_) => {
          self.lines += 1;
          let line = self.buf.trim_ascii();
          if !line.is_empty() {
            return Some(Ok(line.to_vec()));
          }
        }
        Err(e) => {
          // A mid-stream read error (e.g. a truncated gzip member) ends the
          // source.
          self.done = true;
          return Some(Err(Error::io(&self.path, e)));
        }
      }
    }
    None
  }
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// Counters kept by an [`ItemReader`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
  /// Non-blank lines seen.
  pub lines:   u64,
  /// Non-blank lines that were not a JSON object.
  pub skipped: u64,
}

/// Yields one JSON object per non-blank line of a source.
///
/// Lines that fail to parse, or parse to something other than an object, are
/// skipped and counted in [`ReadStats::skipped`].
pub struct ItemReader {
  lines: LineReader,
  stats: ReadStats,
}

impl ItemReader {
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    Ok(Self { lines: LineReader::open(path)?, stats: ReadStats::default() })
  }

  pub fn path(&self) -> &Path { self.lines.path() }

  pub fn stats(&self) -> ReadStats { self.stats }
}

impl Iterator for ItemReader {
  type Item = Result<Map<String, Value>>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let line = match self.lines.next()? {
        Ok(line) => line,
        Err(e) => return Some(Err(e)),
      };
      self.stats.lines += 1;
      match serde_json::from_slice::<Value>(&line) {
        Ok(Value::Object(obj)) => return Some(Ok(obj)),
        Ok(_) | Err(_) => {
          self.stats.skipped += 1;
          tracing::trace!(
            path = %self.lines.path().display(),
            line = self.lines.lines_read(),
            "skipping line that is not a JSON object"
          );
        }
      }
    }
  }
}

/// Chain several sources into one lazy sequence: file order, then list order.
///
/// Each source is opened only when the previous one is exhausted. Opening
/// errors are yielded in place, so a missing second file surfaces after every
/// item of the first.
pub fn read_items<I, P>(paths: I) -> impl Iterator<Item = Result<Map<String, Value>>>
where
  I: IntoIterator<Item = P>,
  P: AsRef<Path>,
{
  paths.into_iter().flat_map(|path| {
    let reader: Box<dyn Iterator<Item = Result<Map<String, Value>>>> =
      match ItemReader::open(path) {
        Ok(reader) => Box::new(reader),
        Err(e) => Box::new(std::iter::once(Err(e))),
      };
    reader
  })
}
