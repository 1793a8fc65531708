//! Connection strings and the backend-erased [`AnyStore`].
//!
//! The upsert strategy is fixed here, once per connection, by the URL scheme.

use std::path::PathBuf;

use hn_core::{Comment, ItemId, ItemStore, Story, TableCounts, UpsertCounts};

use crate::{
  Error, Result, dialect::UpsertDialect, postgres::PostgresStore, sqlite::SqliteStore,
};

/// Where a connection string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
  SqliteMemory,
  SqliteFile(PathBuf),
  /// Normalised to a `postgresql://` URL tokio-postgres understands.
  Postgres(String),
  MySql,
}

/// Parse a SQLAlchemy-style connection string.
///
/// A `+driver` suffix on the scheme (`postgresql+psycopg2://`) is ignored.
pub fn parse_url(url: &str) -> Result<DatabaseUrl> {
  let unsupported = || Error::UnsupportedUrl(url.to_owned());
  let (scheme, rest) = url.split_once(':').ok_or_else(unsupported)?;
  let backend = scheme.split_once('+').map_or(scheme, |(b, _)| b);

  match backend.to_ascii_lowercase().as_str() {
    "sqlite" => Ok(sqlite_target(rest)),
    "postgres" | "postgresql" => Ok(DatabaseUrl::Postgres(format!("postgresql:{rest}"))),
    "mysql" | "mariadb" => Ok(DatabaseUrl::MySql),
    _ => Err(unsupported()),
  }
}

fn sqlite_target(rest: &str) -> DatabaseUrl {
  // `sqlite:///rel.db` is relative and `sqlite:////abs.db` absolute.
  let path = rest
    .strip_prefix("///")
    .or_else(|| rest.strip_prefix("//"))
    .unwrap_or(rest);
  match path {
    "" | ":memory:" => DatabaseUrl::SqliteMemory,
    p => DatabaseUrl::SqliteFile(PathBuf::from(p)),
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectOptions {
  /// Log every statement under the `hn_store_sql::echo` target.
  pub echo: bool,
}

/// Open a store for `url` and make sure its schema exists.
pub async fn connect(url: &str, options: ConnectOptions) -> Result<AnyStore> {
  let store = match parse_url(url)? {
    DatabaseUrl::SqliteMemory => AnyStore::Sqlite(SqliteStore::open_in_memory().await?),
    DatabaseUrl::SqliteFile(path) => AnyStore::Sqlite(SqliteStore::open(path).await?),
    DatabaseUrl::Postgres(url) => AnyStore::Postgres(PostgresStore::connect(&url).await?),
    DatabaseUrl::MySql => return Err(Error::NoDriver("mysql")),
  };
  let store = store.with_echo(options.echo);
  tracing::info!(dialect = store.dialect().name(), "connected");
  Ok(store)
}

// ─── AnyStore ────────────────────────────────────────────────────────────────

/// A store of whichever backend the connection string selected.
pub enum AnyStore {
  Sqlite(SqliteStore),
  Postgres(PostgresStore),
}

impl AnyStore {
  fn with_echo(self, echo: bool) -> Self {
    match self {
      Self::Sqlite(s) => Self::Sqlite(s.with_echo(echo)),
      Self::Postgres(s) => Self::Postgres(s.with_echo(echo)),
    }
  }

  pub fn dialect(&self) -> &'static dyn UpsertDialect {
    match self {
      Self::Sqlite(s) => s.dialect(),
      Self::Postgres(s) => s.dialect(),
    }
  }

  pub async fn tables(&self) -> Result<Vec<String>> {
    match self {
      Self::Sqlite(s) => s.tables().await,
      Self::Postgres(s) => s.tables().await,
    }
  }

  pub async fn count_rows(&self, table: &str) -> Result<u64> {
    match self {
      Self::Sqlite(s) => s.count_rows(table).await,
      Self::Postgres(s) => s.count_rows(table).await,
    }
  }
}

impl ItemStore for AnyStore {
  type Error = Error;

  async fn upsert(&self, stories: &[Story], comments: &[Comment]) -> Result<UpsertCounts> {
    match self {
      Self::Sqlite(s) => s.upsert(stories, comments).await,
      Self::Postgres(s) => s.upsert(stories, comments).await,
    }
  }

  async fn counts(&self) -> Result<TableCounts> {
    match self {
      Self::Sqlite(s) => s.counts().await,
      Self::Postgres(s) => s.counts().await,
    }
  }

  async fn get_story(&self, id: ItemId) -> Result<Option<Story>> {
    match self {
      Self::Sqlite(s) => s.get_story(id).await,
      Self::Postgres(s) => s.get_story(id).await,
    }
  }

  async fn get_comment(&self, id: ItemId) -> Result<Option<Comment>> {
    match self {
      Self::Sqlite(s) => s.get_comment(id).await,
      Self::Postgres(s) => s.get_comment(id).await,
    }
  }

  async fn stories(&self) -> Result<Vec<Story>> {
    match self {
      Self::Sqlite(s) => s.stories().await,
      Self::Postgres(s) => s.stories().await,
    }
  }

  async fn comments(&self) -> Result<Vec<Comment>> {
    match self {
      Self::Sqlite(s) => s.comments().await,
      Self::Postgres(s) => s.comments().await,
    }
  }

  async fn comments_by_parent(&self, parent: ItemId) -> Result<Vec<Comment>> {
    match self {
      Self::Sqlite(s) => s.comments_by_parent(parent).await,
      Self::Postgres(s) => s.comments_by_parent(parent).await,
    }
  }

  async fn story_titles(&self, limit: Option<usize>) -> Result<Vec<(ItemId, String)>> {
    match self {
      Self::Sqlite(s) => s.story_titles(limit).await,
      Self::Postgres(s) => s.story_titles(limit).await,
    }
  }
}
