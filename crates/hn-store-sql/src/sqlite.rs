//! [`SqliteStore`]: the SQLite implementation of [`ItemStore`].

use std::{path::Path, time::Duration};

use hn_core::{Comment, ItemId, ItemStore, Story, TableCounts, UpsertCounts};
use rusqlite::{
  OptionalExtension as _,
  types::{ToSqlOutput, Value, ValueRef},
};

use crate::{
  Error, Result,
  dialect::{self, COMMENT, STORY, Sqlite, Statement, UpsertDialect, plan_upsert, select_sql},
  encode::{RawComment, RawStory, SqlValue, comment_values, encode_dt, story_values},
  schema,
};

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

impl rusqlite::ToSql for SqlValue {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(match self {
      SqlValue::Int(Some(v)) => ToSqlOutput::Owned(Value::Integer(*v)),
      SqlValue::Text(Some(s)) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
      SqlValue::Time(Some(t)) => ToSqlOutput::Owned(Value::Text(encode_dt(*t))),
      SqlValue::Json(v) => ToSqlOutput::Owned(Value::Text(v.to_string())),
      SqlValue::Int(None) | SqlValue::Text(None) | SqlValue::Time(None) => {
        ToSqlOutput::Owned(Value::Null)
      }
    })
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An item store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  dialect: &'static dyn UpsertDialect,
  echo:    bool,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(schema::SQLITE_PRAGMAS)?;
        let tx = conn.transaction()?;
        tx.execute_batch(&schema::script(schema::SQLITE))?;
        tx.pragma_update(None, "user_version", schema::SQLITE_SCHEMA_VERSION)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    tracing::debug!(version = schema::SQLITE_SCHEMA_VERSION, "sqlite schema ready");
    Ok(Self { conn, dialect: &Sqlite, echo: false })
  }

  /// Replace the upsert strategy. The schema stays SQLite's.
  pub fn with_dialect(mut self, dialect: &'static dyn UpsertDialect) -> Self {
    self.dialect = dialect;
    self
  }

  /// Log every statement under the `hn_store_sql::echo` target.
  pub fn with_echo(mut self, echo: bool) -> Self {
    self.echo = echo;
    self
  }

  pub fn dialect(&self) -> &'static dyn UpsertDialect { self.dialect }

  /// Names of the user tables, sorted.
  pub async fn tables(&self) -> Result<Vec<String>> {
    let sql = "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
               ORDER BY name";
    self.select(sql.to_owned(), None, |row| row.get(0)).await
  }

  /// Row count of one of the tables this store creates.
  pub async fn count_rows(&self, table: &str) -> Result<u64> {
    let table = schema::TABLES
      .iter()
      .find(|t| **t == table)
      .ok_or_else(|| Error::UnknownTable(table.to_owned()))?;
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let counts = self.select(sql, None, |row| row.get::<_, i64>(0)).await?;
    Ok(counts.first().copied().unwrap_or(0) as u64)
  }

  fn echo(&self, sql: &str, params: usize) {
    if self.echo {
      dialect::echo(sql, params);
    }
  }

  /// Run one query with at most one integer parameter.
  async fn select<T, F>(&self, sql: String, param: Option<i64>, map: F) -> Result<Vec<T>>
  where
    T: Send + 'static,
    F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T> + Send + 'static,
  {
    self.echo(&sql, usize::from(param.is_some()));
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(param), map)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn get_one<T, F>(&self, sql: String, id: ItemId, map: F) -> Result<Option<T>>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T> + Send + 'static,
  {
    self.echo(&sql, 1);
    let row = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, rusqlite::params![id], map).optional()?))
      .await?;
    Ok(row)
  }
}

/// Execute `statements` on `conn`, returning the total rows affected.
fn execute_all(conn: &rusqlite::Connection, statements: &[Statement]) -> rusqlite::Result<u64> {
  let mut affected = 0;
  for stmt in statements {
    let mut prepared = conn.prepare_cached(&stmt.sql)?;
    affected += prepared.execute(rusqlite::params_from_iter(&stmt.params))? as u64;
  }
  Ok(affected)
}

// ─── ItemStore impl ──────────────────────────────────────────────────────────

impl ItemStore for SqliteStore {
  type Error = Error;

  async fn upsert(&self, stories: &[Story], comments: &[Comment]) -> Result<UpsertCounts> {
    let story_stmts = plan_upsert(self.dialect, &STORY, stories.iter().map(story_values).collect());
    let comment_stmts =
      plan_upsert(self.dialect, &COMMENT, comments.iter().map(comment_values).collect());
    for stmt in story_stmts.iter().chain(&comment_stmts) {
      self.echo(&stmt.sql, stmt.params.len());
    }

    let counts = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let stories = execute_all(&tx, &story_stmts)?;
        let comments = execute_all(&tx, &comment_stmts)?;
        tx.commit()?;
        Ok(UpsertCounts { stories, comments })
      })
      .await?;
    Ok(counts)
  }

  async fn counts(&self) -> Result<TableCounts> {
    Ok(TableCounts {
      stories:  self.count_rows("story").await?,
      comments: self.count_rows("comment").await?,
      techs:    self.count_rows("tech").await?,
    })
  }

  async fn get_story(&self, id: ItemId) -> Result<Option<Story>> {
    let raw = self.get_one(select_sql(&STORY, "WHERE id = ?1"), id, RawStory::from_row).await?;
    raw.map(RawStory::into_story).transpose()
  }

  async fn get_comment(&self, id: ItemId) -> Result<Option<Comment>> {
    let raw = self.get_one(select_sql(&COMMENT, "WHERE id = ?1"), id, RawComment::from_row).await?;
    raw.map(RawComment::into_comment).transpose()
  }

  async fn stories(&self) -> Result<Vec<Story>> {
    let raws = self.select(select_sql(&STORY, "ORDER BY id"), None, RawStory::from_row).await?;
    raws.into_iter().map(RawStory::into_story).collect()
  }

  async fn comments(&self) -> Result<Vec<Comment>> {
    let raws = self.select(select_sql(&COMMENT, "ORDER BY id"), None, RawComment::from_row).await?;
    raws.into_iter().map(RawComment::into_comment).collect()
  }

  async fn comments_by_parent(&self, parent: ItemId) -> Result<Vec<Comment>> {
    let sql = select_sql(&COMMENT, "WHERE parent = ?1 ORDER BY id");
    let raws = self.select(sql, Some(parent), RawComment::from_row).await?;
    raws.into_iter().map(RawComment::into_comment).collect()
  }

  async fn story_titles(&self, limit: Option<usize>) -> Result<Vec<(ItemId, String)>> {
    // A negative LIMIT means no limit.
    let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
    let sql = "SELECT id, title FROM story WHERE title IS NOT NULL AND title <> '' \
               ORDER BY id LIMIT ?1";
    self.select(sql.to_owned(), Some(limit), |row| Ok((row.get(0)?, row.get(1)?))).await
  }
}
