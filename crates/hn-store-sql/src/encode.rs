//! Encoding and decoding between item rows and column values.
//!
//! Rows are flattened into [`SqlValue`]s in the column order of
//! [`STORY`](crate::dialect::STORY) and [`COMMENT`](crate::dialect::COMMENT).
//! Each backend binds those values natively (see `sqlite.rs` and
//! `postgres.rs`). SQLite keeps timestamps as RFC 3339 text and `kids` as a
//! JSON array in text.

use chrono::{DateTime, SecondsFormat, Utc};
use hn_core::{Comment, ItemId, Story};
use serde_json::Value;

use crate::{Error, Result};

// ─── Bind values ─────────────────────────────────────────────────────────────

/// One bound column value. `None` binds SQL `NULL`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
  Int(Option<i64>),
  Text(Option<String>),
  Time(Option<DateTime<Utc>>),
  Json(Value),
}

/// A story as bind values, in `story` column order.
pub fn story_values(s: &Story) -> Vec<SqlValue> {
  vec![
    SqlValue::Int(Some(s.id)),
    SqlValue::Text(s.author.clone()),
    SqlValue::Int(s.descendants),
    SqlValue::Int(s.score),
    SqlValue::Time(s.time),
    SqlValue::Text(Some(s.title.clone())),
    SqlValue::Text(s.url.clone()),
    SqlValue::Json(Value::from(s.kids.clone())),
  ]
}

/// A comment as bind values, in `comment` column order.
pub fn comment_values(c: &Comment) -> Vec<SqlValue> {
  vec![
    SqlValue::Int(Some(c.id)),
    SqlValue::Text(c.author.clone()),
    SqlValue::Int(c.parent),
    SqlValue::Time(c.time),
    SqlValue::Text(c.text.clone()),
  ]
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// `2023-11-14T22:15:00Z`, with a fraction only when one is present.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::AutoSi, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── kids ────────────────────────────────────────────────────────────────────

pub fn decode_kids_text(s: &str) -> Result<Vec<ItemId>> { Ok(serde_json::from_str(s)?) }

pub fn decode_kids_json(v: Value) -> Result<Vec<ItemId>> {
  match v {
    Value::Null => Ok(Vec::new()),
    other => Ok(serde_json::from_value(other)?),
  }
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Columns read directly from a SQLite `story` row.
pub struct RawStory {
  pub id:          i64,
  pub author:      Option<String>,
  pub descendants: Option<i64>,
  pub score:       Option<i64>,
  pub time:        Option<String>,
  pub title:       Option<String>,
  pub url:         Option<String>,
  pub kids:        Option<String>,
}

impl RawStory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      author:      row.get(1)?,
      descendants: row.get(2)?,
      score:       row.get(3)?,
      time:        row.get(4)?,
      title:       row.get(5)?,
      url:         row.get(6)?,
      kids:        row.get(7)?,
    })
  }

  pub fn into_story(self) -> Result<Story> {
    Ok(Story {
      id:          self.id,
      author:      self.author,
      descendants: self.descendants,
      score:       self.score,
      time:        self.time.as_deref().map(decode_dt).transpose()?,
      title:       self.title.unwrap_or_default(),
      url:         self.url,
      kids:        match self.kids.as_deref() {
        Some(s) => decode_kids_text(s)?,
        None => Vec::new(),
      },
    })
  }
}

/// Columns read directly from a SQLite `comment` row.
pub struct RawComment {
  pub id:     i64,
  pub author: Option<String>,
  pub parent: Option<i64>,
  pub time:   Option<String>,
  pub text:   Option<String>,
}

impl RawComment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:     row.get(0)?,
      author: row.get(1)?,
      parent: row.get(2)?,
      time:   row.get(3)?,
      text:   row.get(4)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      id:     self.id,
      author: self.author,
      parent: self.parent,
      time:   self.time.as_deref().map(decode_dt).transpose()?,
      text:   self.text,
    })
  }
}
