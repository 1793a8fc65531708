//! Item types: the canonical rows materialised from the raw feed.
//!
//! An item is either a story or a comment. Both are identified by the
//! externally assigned integer id, which is never reused by the source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Externally assigned item identifier.
pub type ItemId = i64;

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// The record kinds the store materialises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
  Story,
  Comment,
}

impl ItemKind {
  /// Table name holding rows of this kind.
  pub fn table(self) -> &'static str {
    match self {
      Self::Story => "story",
      Self::Comment => "comment",
    }
  }
}

impl std::fmt::Display for ItemKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.table())
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A story row. `title` is always non-empty; the classifier discards stories
/// without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
  pub id:          ItemId,
  pub author:      Option<String>,
  /// Size of the comment subtree as reported by the source.
  pub descendants: Option<i64>,
  pub score:       Option<i64>,
  pub time:        Option<DateTime<Utc>>,
  pub title:       String,
  pub url:         Option<String>,
  /// Child ids in the source's display order. Not deduplicated.
  pub kids:        Vec<ItemId>,
}

/// A comment row. No field besides `id` is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub id:     ItemId,
  pub author: Option<String>,
  /// Id of the story or comment this one replies to.
  pub parent: Option<ItemId>,
  pub time:   Option<DateTime<Utc>>,
  /// Entity-decoded body text.
  pub text:   Option<String>,
}

/// A classified record: exactly one of the two row shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
  Story(Story),
  Comment(Comment),
}

impl Item {
  pub fn id(&self) -> ItemId {
    match self {
      Self::Story(s) => s.id,
      Self::Comment(c) => c.id,
    }
  }

  pub fn kind(&self) -> ItemKind {
    match self {
      Self::Story(_) => ItemKind::Story,
      Self::Comment(_) => ItemKind::Comment,
    }
  }
}

impl From<Story> for Item {
  fn from(story: Story) -> Self { Self::Story(story) }
}

impl From<Comment> for Item {
  fn from(comment: Comment) -> Self { Self::Comment(comment) }
}
