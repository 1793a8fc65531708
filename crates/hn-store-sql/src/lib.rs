//! SQL backends for the `hn` item store.
//!
//! SQLite runs through [`tokio_rusqlite`] so database work stays off the
//! async runtime; PostgreSQL through [`tokio_postgres`]. Each store picks an
//! [`UpsertDialect`](dialect::UpsertDialect) when it is constructed and keeps
//! it for every flush.

mod encode;
mod postgres;
mod sqlite;

pub mod connect;
pub mod dialect;
pub mod error;
pub mod schema;

pub use connect::{AnyStore, ConnectOptions, DatabaseUrl, connect, parse_url};
pub use encode::SqlValue;
pub use error::{Error, Result};
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;
