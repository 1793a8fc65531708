//! Upsert strategies, one per SQL dialect.
//!
//! A strategy decides the DDL, the placeholder syntax, and the
//! conflict-resolution clause appended to a bulk `INSERT`. Stores pick one
//! strategy when they are constructed and use it for every flush.

use std::fmt;

use crate::{encode::SqlValue, schema};

// ─── Tables ──────────────────────────────────────────────────────────────────

/// Shape of an upsert target: its name, conflict key, and columns in bind
/// order (key first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
  pub name:    &'static str,
  pub key:     &'static str,
  pub columns: &'static [&'static str],
}

impl TableSpec {
  /// Columns overwritten on conflict.
  pub fn mutable_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.columns.iter().copied().filter(move |c| *c != self.key)
  }
}

pub const STORY: TableSpec = TableSpec {
  name:    "story",
  key:     "id",
  columns: &["id", "author", "descendants", "score", "time", "title", "url", "kids"],
};

pub const COMMENT: TableSpec = TableSpec {
  name:    "comment",
  key:     "id",
  columns: &["id", "author", "parent", "time", "text"],
};

// ─── Strategy trait ──────────────────────────────────────────────────────────

pub trait UpsertDialect: fmt::Debug + Send + Sync {
  fn name(&self) -> &'static str;

  /// DDL statements creating every table if absent.
  fn schema(&self) -> &'static [&'static str];

  /// Bind placeholder for the 1-based parameter `n`.
  fn placeholder(&self, n: usize) -> String;

  /// Clause appended after `VALUES (...)`; `None` means a plain insert.
  fn conflict_clause(&self, table: &TableSpec) -> Option<String>;

  /// Most bind parameters one statement may carry.
  fn max_bind_params(&self) -> usize;

  /// Rows of `table` that fit in a single statement.
  fn rows_per_statement(&self, table: &TableSpec) -> usize {
    (self.max_bind_params() / table.columns.len()).max(1)
  }

  /// A bulk insert of `rows` rows into `table`, with this dialect's
  /// conflict clause.
  fn upsert_sql(&self, table: &TableSpec, rows: usize) -> String {
    let width = table.columns.len();
    let mut sql = format!("INSERT INTO {} ({}) VALUES ", table.name, table.columns.join(", "));
    for row in 0..rows {
      if row > 0 {
        sql.push_str(", ");
      }
      sql.push('(');
      for col in 0..width {
        if col > 0 {
          sql.push_str(", ");
        }
        sql.push_str(&self.placeholder(row * width + col + 1));
      }
      sql.push(')');
    }
    if let Some(clause) = self.conflict_clause(table) {
      sql.push(' ');
      sql.push_str(&clause);
    }
    sql
  }
}

/// `SET c = <prefix>c, ...` over the mutable columns.
fn assignments(table: &TableSpec, value_of: impl Fn(&str) -> String) -> String {
  table
    .mutable_columns()
    .map(|c| format!("{c} = {}", value_of(c)))
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── Strategies ──────────────────────────────────────────────────────────────

/// SQLite ≥ 3.24: `ON CONFLICT (id) DO UPDATE SET c = excluded.c`.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl UpsertDialect for Sqlite {
  fn name(&self) -> &'static str { "sqlite" }

  fn schema(&self) -> &'static [&'static str] { schema::SQLITE }

  fn placeholder(&self, n: usize) -> String { format!("?{n}") }

  fn conflict_clause(&self, table: &TableSpec) -> Option<String> {
    Some(format!(
      "ON CONFLICT ({}) DO UPDATE SET {}",
      table.key,
      assignments(table, |c| format!("excluded.{c}"))
    ))
  }

  // SQLITE_MAX_VARIABLE_NUMBER for the bundled library.
  fn max_bind_params(&self) -> usize { 32_766 }
}

/// PostgreSQL ≥ 9.5: `ON CONFLICT (id) DO UPDATE SET c = EXCLUDED.c`.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl UpsertDialect for Postgres {
  fn name(&self) -> &'static str { "postgresql" }

  fn schema(&self) -> &'static [&'static str] { schema::POSTGRES }

  fn placeholder(&self, n: usize) -> String { format!("${n}") }

  fn conflict_clause(&self, table: &TableSpec) -> Option<String> {
    Some(format!(
      "ON CONFLICT ({}) DO UPDATE SET {}",
      table.key,
      assignments(table, |c| format!("EXCLUDED.{c}"))
    ))
  }

  // Bind messages count parameters in 16 bits.
  fn max_bind_params(&self) -> usize { 65_535 }
}

/// MySQL / MariaDB: `ON DUPLICATE KEY UPDATE c = VALUES(c)`.
///
/// MySQL reports two affected rows for every updated row.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl UpsertDialect for MySql {
  fn name(&self) -> &'static str { "mysql" }

  fn schema(&self) -> &'static [&'static str] { schema::MYSQL }

  fn placeholder(&self, _n: usize) -> String { "?".to_owned() }

  fn conflict_clause(&self, table: &TableSpec) -> Option<String> {
    Some(format!(
      "ON DUPLICATE KEY UPDATE {}",
      assignments(table, |c| format!("VALUES({c})"))
    ))
  }

  fn max_bind_params(&self) -> usize { 65_535 }
}

/// Backends with no upsert syntax: a plain insert.
///
/// An id already committed by an earlier flush makes the flush fail with a
/// primary-key violation.
#[derive(Debug, Clone, Copy)]
pub struct Plain;

impl UpsertDialect for Plain {
  fn name(&self) -> &'static str { "plain" }

  fn schema(&self) -> &'static [&'static str] { schema::PLAIN }

  fn placeholder(&self, _n: usize) -> String { "?".to_owned() }

  fn conflict_clause(&self, _table: &TableSpec) -> Option<String> { None }

  fn max_bind_params(&self) -> usize { 999 }
}

/// Look a strategy up by dialect name, as printed by [`UpsertDialect::name`]
/// (`postgres` and `mariadb` are accepted as aliases).
pub fn by_name(name: &str) -> Option<&'static dyn UpsertDialect> {
  match name {
    "sqlite" => Some(&Sqlite),
    "postgres" | "postgresql" => Some(&Postgres),
    "mysql" | "mariadb" => Some(&MySql),
    "plain" => Some(&Plain),
    _ => None,
  }
}

// ─── Statement planning ──────────────────────────────────────────────────────

/// One statement ready to execute.
#[derive(Debug, Clone)]
pub struct Statement {
  pub sql:    String,
  pub params: Vec<SqlValue>,
}

/// Split `rows` into as few upsert statements as the dialect's parameter
/// limit allows. Every row must have one value per column of `table`.
pub fn plan_upsert(
  dialect: &dyn UpsertDialect,
  table: &TableSpec,
  rows: Vec<Vec<SqlValue>>,
) -> Vec<Statement> {
  let per_statement = dialect.rows_per_statement(table);
  let mut statements = Vec::with_capacity(rows.len().div_ceil(per_statement));
  let mut rows = rows.into_iter().peekable();

  while rows.peek().is_some() {
    let chunk: Vec<_> = rows.by_ref().take(per_statement).collect();
    let sql = dialect.upsert_sql(table, chunk.len());
    let params = chunk.into_iter().flatten().collect();
    statements.push(Statement { sql, params });
  }
  statements
}

/// `SELECT <every column> FROM <table> <tail>`.
pub fn select_sql(table: &TableSpec, tail: &str) -> String {
  format!("SELECT {} FROM {} {tail}", table.columns.join(", "), table.name)
}

/// Log a statement under the `hn_store_sql::echo` target.
pub(crate) fn echo(sql: &str, params: usize) {
  tracing::info!(target: "hn_store_sql::echo", params, "{sql}");
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sqlite_upsert_overwrites_every_mutable_column() {
    let sql = Sqlite.upsert_sql(&COMMENT, 2);
    assert_eq!(
      sql,
      "INSERT INTO comment (id, author, parent, time, text) VALUES \
       (?1, ?2, ?3, ?4, ?5), (?6, ?7, ?8, ?9, ?10) \
       ON CONFLICT (id) DO UPDATE SET author = excluded.author, \
       parent = excluded.parent, time = excluded.time, text = excluded.text"
    );
  }

  #[test]
  fn postgres_uses_numbered_dollar_placeholders() {
    let sql = Postgres.upsert_sql(&STORY, 1);
    assert!(sql.starts_with(
      "INSERT INTO story (id, author, descendants, score, time, title, url, kids) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT (id) DO UPDATE SET"
    ));
    assert!(sql.ends_with("kids = EXCLUDED.kids"));
    assert!(!sql.contains("id = EXCLUDED.id"));
  }

  #[test]
  fn mysql_uses_duplicate_key_update() {
    let sql = MySql.upsert_sql(&COMMENT, 1);
    assert_eq!(
      sql,
      "INSERT INTO comment (id, author, parent, time, text) VALUES (?, ?, ?, ?, ?) \
       ON DUPLICATE KEY UPDATE author = VALUES(author), parent = VALUES(parent), \
       time = VALUES(time), text = VALUES(text)"
    );
  }

  #[test]
  fn plain_has_no_conflict_clause() {
    let sql = Plain.upsert_sql(&COMMENT, 1);
    assert_eq!(sql, "INSERT INTO comment (id, author, parent, time, text) VALUES (?, ?, ?, ?, ?)");
  }

  #[test]
  fn plan_splits_at_parameter_limit() {
    // 999 / 5 columns = 199 rows per statement.
    let rows: Vec<Vec<SqlValue>> = (0..450)
      .map(|id| {
        vec![
          SqlValue::Int(Some(id)),
          SqlValue::Text(None),
          SqlValue::Int(None),
          SqlValue::Time(None),
          SqlValue::Text(None),
        ]
      })
      .collect();

    let plan = plan_upsert(&Plain, &COMMENT, rows);
    let sizes: Vec<_> = plan.iter().map(|s| s.params.len() / 5).collect();
    assert_eq!(sizes, vec![199, 199, 52]);
    assert!(plan.iter().all(|s| s.params.len() <= Plain.max_bind_params()));
  }

  #[test]
  fn plan_of_nothing_is_empty() {
    assert!(plan_upsert(&Sqlite, &STORY, Vec::new()).is_empty());
  }

  #[test]
  fn lookup_by_name() {
    assert_eq!(by_name("postgres").map(|d| d.name()), Some("postgresql"));
    assert_eq!(by_name("mariadb").map(|d| d.name()), Some("mysql"));
    assert!(by_name("oracle").is_none());
  }
}
