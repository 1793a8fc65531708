//! Subcommand implementations.
//!
//! Every command returns the process exit status on success, or a
//! [`Failure`] carrying the status to exit with and the error to report.

pub mod combine;
pub mod export_titles;
pub mod fetch;
pub mod ingest;
pub mod sample;
pub mod schema;
pub mod status;

use std::fmt;

/// Exit statuses.
pub mod exit {
  pub const OK: u8 = 0;
  /// Generic failure; for `ingest`, the database could not be opened.
  pub const FAILURE: u8 = 1;
  /// An `ingest` input file does not exist.
  pub const NOT_FOUND: u8 = 2;
  /// `ingest` failed after the database was opened.
  pub const INGEST_FAILED: u8 = 3;
  /// `fetch` was stopped with Ctrl+C.
  pub const INTERRUPTED: u8 = 130;
}

pub struct Failure {
  pub code:  u8,
  pub error: anyhow::Error,
}

impl Failure {
  pub fn new(code: u8, error: impl Into<anyhow::Error>) -> Self {
    Self { code, error: error.into() }
  }
}

impl fmt::Debug for Failure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "exit {}: {:#}", self.code, self.error)
  }
}

pub type Outcome = std::result::Result<u8, Failure>;

/// Attach an exit status to any error.
pub trait ExitWith<T> {
  fn exit_with(self, code: u8) -> std::result::Result<T, Failure>;
}

impl<T, E: Into<anyhow::Error>> ExitWith<T> for std::result::Result<T, E> {
  fn exit_with(self, code: u8) -> std::result::Result<T, Failure> {
    self.map_err(|e| Failure::new(code, e))
  }
}
