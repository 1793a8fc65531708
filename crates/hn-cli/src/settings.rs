//! Settings from the optional config file and `HN_*` environment variables.
//!
//! Command-line flags override these; these override the built-in defaults.
//! Nested keys use a double underscore in the environment, e.g.
//! `HN_FETCH__WORKERS=8`.
//!
//! ```toml
//! db         = "sqlite:///hn.db"
//! batch_size = 1000
//!
//! [fetch]
//! out     = "raw_data/hn_data.jsonl.gz"
//! workers = 32
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Connection string used when `--db` is not given.
  pub db:         Option<String>,
  pub batch_size: usize,
  pub echo:       bool,
  pub fetch:      FetchSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
  pub out:            PathBuf,
  pub workers:        usize,
  pub compress:       bool,
  pub progress_every: u64,
  pub base_url:       String,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      db:         None,
      batch_size: hn_core::ingest::DEFAULT_BATCH_SIZE,
      echo:       false,
      fetch:      FetchSettings::default(),
    }
  }
}

impl Default for FetchSettings {
  fn default() -> Self {
    Self {
      out:            PathBuf::from("raw_data/hn_data.jsonl.gz"),
      workers:        hn_fetch::pool::DEFAULT_WORKERS,
      compress:       true,
      progress_every: hn_fetch::pool::DEFAULT_PROGRESS_EVERY,
      base_url:       hn_fetch::DEFAULT_BASE_URL.to_owned(),
    }
  }
}

impl Settings {
  /// Read `path` if it exists, then the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("HN").separator("__"))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    settings.try_deserialize().context("failed to deserialise settings")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings.batch_size, 1000);
    assert_eq!(settings.fetch.workers, 32);
    assert!(settings.fetch.compress);
    assert_eq!(settings.fetch.base_url, "https://hacker-news.firebaseio.com/v0/");
  }

  #[test]
  fn file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hn.toml");
    std::fs::write(
      &path,
      "db = \"sqlite:///test.db\"\nbatch_size = 250\n\n[fetch]\nworkers = 4\ncompress = false\n",
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.db.as_deref(), Some("sqlite:///test.db"));
    assert_eq!(settings.batch_size, 250);
    assert_eq!(settings.fetch.workers, 4);
    assert!(!settings.fetch.compress);
    assert_eq!(settings.fetch.progress_every, 10_000);
  }
}
