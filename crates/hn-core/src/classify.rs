//! Item classification: raw JSON object → canonical [`Item`] row.
//!
//! Classification never fails. A record that cannot become a row is reported
//! as a [`Skip`] reason so callers can tally it, and [`classify`] collapses
//! that into `None`.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use quick_xml::escape;
use serde_json::{Map, Value};

use crate::item::{Comment, Item, ItemId, Story};

/// Why a raw record produced no row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
  /// `type` is absent or neither `"story"` nor `"comment"`.
  Unclassified,
  /// `id` is absent or not an integer.
  MissingId,
  /// A story with an absent or empty `title`.
  MissingTitle,
}

/// Map a raw record to a row, or `None` if it must be discarded.
pub fn classify(raw: &Map<String, Value>) -> Option<Item> { try_classify(raw).ok() }

/// Like [`classify`], but reports why a record was discarded.
pub fn try_classify(raw: &Map<String, Value>) -> Result<Item, Skip> {
  match raw.get("type").and_then(Value::as_str) {
    Some("story") => story_row(raw).map(Item::Story),
    Some("comment") => comment_row(raw).map(Item::Comment),
    _ => Err(Skip::Unclassified),
  }
}

fn story_row(raw: &Map<String, Value>) -> Result<Story, Skip> {
  let id = item_id(raw)?;
  let title = match raw.get("title").and_then(Value::as_str) {
    Some(t) if !t.is_empty() => t.to_owned(),
    _ => return Err(Skip::MissingTitle),
  };

  let kids = raw
    .get("kids")
    .and_then(Value::as_array)
    .map(|kids| kids.iter().filter_map(Value::as_i64).collect())
    .unwrap_or_default();

  Ok(Story {
    id,
    author: string_field(raw, "by"),
    descendants: int_field(raw, "descendants"),
    score: int_field(raw, "score"),
    time: raw.get("time").and_then(epoch_to_utc),
    title,
    url: string_field(raw, "url"),
    kids,
  })
}

/// Decode HTML character references one at a time. An unknown or
/// unterminated reference, or a bare `&`, is kept as written.
fn decode_entities(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut rest = text;
  while let Some(amp) = rest.find('&') {
    out.push_str(&rest[..amp]);
    rest = &rest[amp + 1..];
    let name_len = rest
      .bytes()
      .take_while(|b| b.is_ascii_alphanumeric() || *b == b'#')
      .count();
    let decoded = match rest.as_bytes().get(name_len) {
      Some(b';') => resolve_reference(&rest[..name_len]),
      _ => None,
    };
    match decoded {
      Some(decoded) => {
        out.push_str(&decoded);
        rest = &rest[name_len + 1..];
      }
      None => out.push('&'),
    }
  }
  out.push_str(rest);
  out
}

/// `name` is the text between `&` and `;`.
fn resolve_reference(name: &str) -> Option<Cow<'static, str>> {
  let Some(number) = name.strip_prefix('#') else {
    return escape::resolve_html5_entity(name).map(Cow::Borrowed);
  };
  let code = match number.strip_prefix(['x', 'X']) {
    Some(hex) => u32::from_str_radix(hex, 16).ok()?,
    None => number.parse::<u32>().ok()?,
  };
  let c = char::from_u32(code)
    .filter(|c| *c != '\0')
    .unwrap_or(char::REPLACEMENT_CHARACTER);
  Some(Cow::Owned(c.to_string()))
}

fn comment_row(raw: &Map<String, Value>) -> Result<Comment, Skip> {
  let id = item_id(raw)?;
  let text = raw
    .get("text")
    .and_then(Value::as_str)
    .map(decode_entities);

  Ok(Comment {
    id,
    author: string_field(raw, "by"),
    parent: int_field(raw, "parent"),
    time: raw.get("time").and_then(epoch_to_utc),
    text,
  })
}

fn item_id(raw: &Map<String, Value>) -> Result<ItemId, Skip> {
  raw.get("id").and_then(Value::as_i64).ok_or(Skip::MissingId)
}

fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
  raw.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn int_field(raw: &Map<String, Value>, key: &str) -> Option<i64> {
  raw.get(key).and_then(Value::as_i64)
}

/// Convert epoch seconds (integer or fractional) to a UTC timestamp.
///
/// Fractional seconds are kept at microsecond precision. Non-numeric and
/// out-of-range values yield `None`.
pub fn epoch_to_utc(value: &Value) -> Option<DateTime<Utc>> {
  if let Some(secs) = value.as_i64() {
    return DateTime::from_timestamp(secs, 0);
  }
  let secs = value.as_f64()?;
  if !secs.is_finite() {
    return None;
  }
  DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
}
