//! Error type for `hn-store-sql`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("postgres error: {0}")]
  Postgres(#[from] tokio_postgres::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The connection string names no backend this crate knows.
  #[error("unsupported database url: {0:?}")]
  UnsupportedUrl(String),

  /// The backend is recognised but no driver is built in.
  #[error("no driver for {0} connections; use `hn schema --dialect {0}` to render its DDL")]
  NoDriver(&'static str),

  #[error("unknown table: {0:?}")]
  UnknownTable(String),
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { Self::Database(e.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
