//! [`PostgresStore`]: the PostgreSQL implementation of [`ItemStore`].
//!
//! One client per store. Its connection future runs on a spawned task; the
//! client sits behind an async mutex because a transaction needs `&mut`.

use bytes::BytesMut;
use hn_core::{Comment, ItemId, ItemStore, Story, TableCounts, UpsertCounts};
use tokio::sync::Mutex;
use tokio_postgres::{
  Client, NoTls, Row, Transaction,
  types::{IsNull, ToSql, Type, to_sql_checked},
};

use crate::{
  Error, Result,
  dialect::{self, COMMENT, Postgres, STORY, Statement, UpsertDialect, plan_upsert, select_sql},
  encode::{SqlValue, comment_values, decode_kids_json, story_values},
  schema,
};

impl ToSql for SqlValue {
  fn to_sql(
    &self,
    ty: &Type,
    out: &mut BytesMut,
  ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
    match self {
      SqlValue::Int(v) => v.to_sql_checked(ty, out),
      SqlValue::Text(v) => v.to_sql_checked(ty, out),
      SqlValue::Time(v) => v.to_sql_checked(ty, out),
      SqlValue::Json(v) => v.to_sql_checked(ty, out),
    }
  }

  // Each variant checks the column type itself.
  fn accepts(_ty: &Type) -> bool { true }

  to_sql_checked!();
}

// ─── Store ───────────────────────────────────────────────────────────────────

pub struct PostgresStore {
  client:  Mutex<Client>,
  dialect: &'static dyn UpsertDialect,
  echo:    bool,
}

impl PostgresStore {
  /// Connect with a libpq-style URL and create the schema if absent.
  pub async fn connect(url: &str) -> Result<Self> {
    let (mut client, connection) = tokio_postgres::connect(url, NoTls).await?;
    tokio::spawn(async move {
      if let Err(e) = connection.await {
        tracing::error!(error = %e, "postgres connection error");
      }
    });

    // Concurrent first runs would race on CREATE TABLE IF NOT EXISTS.
    let tx = client.transaction().await?;
    tx.execute("SELECT pg_advisory_xact_lock($1)", &[&schema::POSTGRES_DDL_LOCK])
      .await?;
    tx.batch_execute(&schema::script(schema::POSTGRES)).await?;
    tx.commit().await?;
    tracing::debug!("postgres schema ready");

    Ok(Self { client: Mutex::new(client), dialect: &Postgres, echo: false })
  }

  /// Log every statement under the `hn_store_sql::echo` target.
  pub fn with_echo(mut self, echo: bool) -> Self {
    self.echo = echo;
    self
  }

  pub fn dialect(&self) -> &'static dyn UpsertDialect { self.dialect }

  /// Names of the tables in the current schema, sorted.
  pub async fn tables(&self) -> Result<Vec<String>> {
    let sql = "SELECT table_name::text FROM information_schema.tables \
               WHERE table_schema = current_schema() ORDER BY table_name";
    let rows = self.query(sql, &[]).await?;
    rows.iter().map(|r| -> Result<String> { Ok(r.try_get(0)?) }).collect()
  }

  /// Row count of one of the tables this store creates.
  pub async fn count_rows(&self, table: &str) -> Result<u64> {
    let table = schema::TABLES
      .iter()
      .find(|t| **t == table)
      .ok_or_else(|| Error::UnknownTable(table.to_owned()))?;
    let rows = self.query(&format!("SELECT COUNT(*) FROM {table}"), &[]).await?;
    let count: i64 = match rows.first() {
      Some(row) => row.try_get(0)?,
      None => 0,
    };
    Ok(count as u64)
  }

  async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
    if self.echo {
      dialect::echo(sql, params.len());
    }
    let client = self.client.lock().await;
    Ok(client.query(sql, params).await?)
  }
}

async fn execute_all(tx: &Transaction<'_>, statements: &[Statement]) -> Result<u64> {
  let mut affected = 0;
  for stmt in statements {
    let params: Vec<&(dyn ToSql + Sync)> =
      stmt.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
    affected += tx.execute(stmt.sql.as_str(), &params).await?;
  }
  Ok(affected)
}

fn story_from_row(row: &Row) -> Result<Story> {
  Ok(Story {
    id:          row.try_get("id")?,
    author:      row.try_get("author")?,
    descendants: row.try_get("descendants")?,
    score:       row.try_get("score")?,
    time:        row.try_get("time")?,
    title:       row.try_get::<_, Option<String>>("title")?.unwrap_or_default(),
    url:         row.try_get("url")?,
    kids:        decode_kids_json(row.try_get("kids")?)?,
  })
}

fn comment_from_row(row: &Row) -> Result<Comment> {
  Ok(Comment {
    id:     row.try_get("id")?,
    author: row.try_get("author")?,
    parent: row.try_get("parent")?,
    time:   row.try_get("time")?,
    text:   row.try_get("text")?,
  })
}

// ─── ItemStore impl ──────────────────────────────────────────────────────────

impl ItemStore for PostgresStore {
  type Error = Error;

  async fn upsert(&self, stories: &[Story], comments: &[Comment]) -> Result<UpsertCounts> {
    let story_stmts = plan_upsert(self.dialect, &STORY, stories.iter().map(story_values).collect());
    let comment_stmts =
      plan_upsert(self.dialect, &COMMENT, comments.iter().map(comment_values).collect());
    if self.echo {
      for stmt in story_stmts.iter().chain(&comment_stmts) {
        dialect::echo(&stmt.sql, stmt.params.len());
      }
    }

    let mut client = self.client.lock().await;
    let tx = client.transaction().await?;
    let stories = execute_all(&tx, &story_stmts).await?;
    let comments = execute_all(&tx, &comment_stmts).await?;
    tx.commit().await?;
    Ok(UpsertCounts { stories, comments })
  }

  async fn counts(&self) -> Result<TableCounts> {
    Ok(TableCounts {
      stories:  self.count_rows("story").await?,
      comments: self.count_rows("comment").await?,
      techs:    self.count_rows("tech").await?,
    })
  }

  async fn get_story(&self, id: ItemId) -> Result<Option<Story>> {
    let rows = self.query(&select_sql(&STORY, "WHERE id = $1"), &[&id]).await?;
    rows.first().map(story_from_row).transpose()
  }

  async fn get_comment(&self, id: ItemId) -> Result<Option<Comment>> {
    let rows = self.query(&select_sql(&COMMENT, "WHERE id = $1"), &[&id]).await?;
    rows.first().map(comment_from_row).transpose()
  }

  async fn stories(&self) -> Result<Vec<Story>> {
    let rows = self.query(&select_sql(&STORY, "ORDER BY id"), &[]).await?;
    rows.iter().map(story_from_row).collect()
  }

  async fn comments(&self) -> Result<Vec<Comment>> {
    let rows = self.query(&select_sql(&COMMENT, "ORDER BY id"), &[]).await?;
    rows.iter().map(comment_from_row).collect()
  }

  async fn comments_by_parent(&self, parent: ItemId) -> Result<Vec<Comment>> {
    let sql = select_sql(&COMMENT, "WHERE parent = $1 ORDER BY id");
    let rows = self.query(&sql, &[&parent]).await?;
    rows.iter().map(comment_from_row).collect()
  }

  async fn story_titles(&self, limit: Option<usize>) -> Result<Vec<(ItemId, String)>> {
    // LIMIT NULL means no limit.
    let limit = limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX));
    let sql = "SELECT id, title FROM story WHERE title IS NOT NULL AND title <> '' \
               ORDER BY id LIMIT $1";
    let rows = self.query(sql, &[&limit]).await?;
    rows
      .iter()
      .map(|r| -> Result<(ItemId, String)> { Ok((r.try_get(0)?, r.try_get(1)?)) })
      .collect()
  }
}
