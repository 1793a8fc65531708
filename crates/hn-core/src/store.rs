//! The `ItemStore` trait: the upsert executor seen from the pipeline.
//!
//! Each backend (e.g. `hn-store-sql`'s SQLite and PostgreSQL stores) carries
//! its own conflict-resolution strategy, chosen once when the store is
//! constructed. The ingest pipeline depends only on this abstraction.

use std::future::Future;

use crate::item::{Comment, ItemId, Story};

/// Rows affected by one flush, per kind, as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
  pub stories:  u64,
  pub comments: u64,
}

/// Row counts of the materialised tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
  pub stories:  u64,
  pub comments: u64,
  pub techs:    u64,
}

/// Abstraction over a relational item store.
///
/// Implementations must have their schema in place before the first call
/// (constructors run schema setup).
pub trait ItemStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert-or-update `stories` and `comments` inside one transaction.
  ///
  /// On conflict every mutable column takes the incoming value, nulls
  /// included. Callers pass unique ids per kind. On error nothing from this
  /// call is persisted.
  fn upsert<'a>(
    &'a self,
    stories: &'a [Story],
    comments: &'a [Comment],
  ) -> impl Future<Output = Result<UpsertCounts, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn counts(&self) -> impl Future<Output = Result<TableCounts, Self::Error>> + Send + '_;

  fn get_story(
    &self,
    id: ItemId,
  ) -> impl Future<Output = Result<Option<Story>, Self::Error>> + Send + '_;

  fn get_comment(
    &self,
    id: ItemId,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// All stories, ordered by id.
  fn stories(&self) -> impl Future<Output = Result<Vec<Story>, Self::Error>> + Send + '_;

  /// All comments, ordered by id.
  fn comments(&self) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Direct replies to `parent`, ordered by id.
  fn comments_by_parent(
    &self,
    parent: ItemId,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// `(id, title)` for stories with a non-empty title, ordered by id.
  fn story_titles(
    &self,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<(ItemId, String)>, Self::Error>> + Send + '_;
}
