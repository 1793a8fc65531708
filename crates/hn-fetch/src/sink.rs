//! The single writer every fetched item goes through.

use std::{
  fs::File,
  io::{BufWriter, Write},
  path::{Path, PathBuf},
};

use flate2::{Compression, write::GzEncoder};
use serde_json::Value;

use crate::{Error, Result};

enum Writer {
  Gzip(GzEncoder<BufWriter<File>>),
  Plain(BufWriter<File>),
}

impl Writer {
  fn as_write(&mut self) -> &mut dyn Write {
    match self {
      Self::Gzip(w) => w,
      Self::Plain(w) => w,
    }
  }
}

/// JSONL output, one item per line, gzip-compressed unless disabled.
pub struct ItemSink {
  path:   PathBuf,
  writer: Writer,
}

impl ItemSink {
  /// Create (or truncate) `path`, creating parent directories as needed.
  pub fn create(path: impl AsRef<Path>, compress: bool) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let file = BufWriter::new(File::create(&path).map_err(|e| Error::io(&path, e))?);
    let writer = if compress {
      Writer::Gzip(GzEncoder::new(file, Compression::default()))
    } else {
      Writer::Plain(file)
    };
    Ok(Self { path, writer })
  }

  pub fn path(&self) -> &Path { &self.path }

  /// Append one item as a compact JSON line. Non-ASCII text is written as-is.
  pub fn write(&mut self, item: &Value) -> Result<()> {
    let w = self.writer.as_write();
    serde_json::to_writer(&mut *w, item)?;
    w.write_all(b"\n").map_err(|e| Error::io(&self.path, e))
  }

  /// Flush everything to disk and return the output size in bytes.
  pub fn finish(self) -> Result<u64> {
    let flushed = match self.writer {
      Writer::Gzip(w) => w.finish().and_then(|mut inner| inner.flush()),
      Writer::Plain(mut w) => w.flush(),
    };
    flushed.map_err(|e| Error::io(&self.path, e))?;
    let meta = std::fs::metadata(&self.path).map_err(|e| Error::io(&self.path, e))?;
    Ok(meta.len())
  }
}

#[cfg(test)]
mod tests {
  use std::io::Read as _;

  use flate2::read::MultiGzDecoder;
  use serde_json::json;

  use super::*;

  #[test]
  fn gzip_output_is_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("items.jsonl.gz");
    let mut sink = ItemSink::create(&path, true).unwrap();
    sink.write(&json!({ "id": 1, "title": "Привет" })).unwrap();
    sink.write(&json!({ "id": 2 })).unwrap();
    let size = sink.finish().unwrap();
    assert_eq!(size, std::fs::metadata(&path).unwrap().len());

    let mut body = String::new();
    MultiGzDecoder::new(File::open(&path).unwrap()).read_to_string(&mut body).unwrap();
    assert_eq!(body, "{\"id\":1,\"title\":\"Привет\"}\n{\"id\":2}\n");
  }

  #[test]
  fn plain_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.jsonl");
    let mut sink = ItemSink::create(&path, false).unwrap();
    sink.write(&json!([1, 2])).unwrap();
    sink.finish().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1,2]\n");
  }
}
