//! Error types for `hn-core`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An input locator does not exist.
  #[error("source not found: {}", .0.display())]
  SourceNotFound(PathBuf),

  #[error("i/o error on {}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A flush failed inside the backing store. Nothing from that flush was
  /// committed.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("no files matching {pattern:?} in {}", dir.display())]
  NoInputs { dir: PathBuf, pattern: String },

  #[error("invalid file pattern {pattern:?}: {source}")]
  Pattern {
    pattern: String,
    #[source]
    source:  glob::PatternError,
  },

  /// A sample set that is not `name:count` with a positive count.
  #[error("bad sample set {0:?}; expected name:count with count >= 1")]
  BadSampleSet(String),

  #[error("not enough items after filtering: wanted {wanted}, got {got}")]
  NotEnoughItems { wanted: usize, got: usize },
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io { path: path.into(), source }
  }

  /// Wrap a backend error.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
