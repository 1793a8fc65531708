//! Batch accumulation with intra-batch deduplication.
//!
//! Rows are buffered by id, so a buffer never holds two rows for the same id:
//! a later row replaces the earlier one before anything reaches the store.
//! Together with the store's primary-key upsert this gives at most one write
//! per distinct id per flush.

use std::collections::BTreeMap;

use crate::{
  Error, Result,
  item::{Comment, Item, ItemId, Story},
  store::{ItemStore, UpsertCounts},
};

// ─── Buffer ──────────────────────────────────────────────────────────────────

/// Pending rows of both kinds, keyed (and therefore ordered) by id.
#[derive(Debug, Default)]
pub struct Batch {
  stories:  BTreeMap<ItemId, Story>,
  comments: BTreeMap<ItemId, Comment>,
}

impl Batch {
  /// Buffer `item`, replacing any pending row with the same id and kind.
  /// Returns `true` if a row was replaced.
  pub fn insert(&mut self, item: Item) -> bool {
    match item {
      Item::Story(s) => self.stories.insert(s.id, s).is_some(),
      Item::Comment(c) => self.comments.insert(c.id, c).is_some(),
    }
  }

  /// Distinct rows buffered, both kinds combined.
  pub fn len(&self) -> usize { self.stories.len() + self.comments.len() }

  pub fn is_empty(&self) -> bool { self.stories.is_empty() && self.comments.is_empty() }

  /// Drain the buffer, leaving it empty.
  pub fn take(&mut self) -> (Vec<Story>, Vec<Comment>) {
    (
      std::mem::take(&mut self.stories).into_values().collect(),
      std::mem::take(&mut self.comments).into_values().collect(),
    )
  }
}

// ─── Accumulator ─────────────────────────────────────────────────────────────

/// Buffers rows up to a combined threshold and writes them to an
/// [`ItemStore`] one flush at a time.
pub struct BatchAccumulator<'s, S> {
  store:      &'s S,
  batch:      Batch,
  batch_size: usize,
  totals:     UpsertCounts,
  flushes:    u64,
  collapsed:  u64,
}

impl<'s, S: ItemStore> BatchAccumulator<'s, S> {
  /// A `batch_size` of zero is treated as one.
  pub fn new(store: &'s S, batch_size: usize) -> Self {
    Self {
      store,
      batch: Batch::default(),
      batch_size: batch_size.max(1),
      totals: UpsertCounts::default(),
      flushes: 0,
      collapsed: 0,
    }
  }

  /// Buffer a classified row.
  pub fn insert(&mut self, item: Item) {
    if self.batch.insert(item) {
      self.collapsed += 1;
    }
  }

  /// Whether the buffer has reached the flush threshold.
  pub fn is_full(&self) -> bool { self.batch.len() >= self.batch_size }

  /// Rows waiting for the next flush.
  pub fn pending(&self) -> usize { self.batch.len() }

  /// Write the buffer to the store in one transaction and clear it.
  ///
  /// An empty buffer is a no-op. On failure the buffer is still cleared and
  /// the totals are left as they were.
  pub async fn flush(&mut self) -> Result<UpsertCounts> {
    if self.batch.is_empty() {
      return Ok(UpsertCounts::default());
    }
    let (stories, comments) = self.batch.take();
    let counts = self
      .store
      .upsert(&stories, &comments)
      .await
      .map_err(Error::store)?;

    self.flushes += 1;
    self.totals.stories += counts.stories;
    self.totals.comments += counts.comments;
    tracing::debug!(
      flush = self.flushes,
      stories = counts.stories,
      comments = counts.comments,
      "flushed batch"
    );
    Ok(counts)
  }

  /// Rows affected across all successful flushes.
  pub fn totals(&self) -> UpsertCounts { self.totals }

  pub fn flushes(&self) -> u64 { self.flushes }

  /// Rows that replaced an already-buffered row with the same id.
  pub fn collapsed(&self) -> u64 { self.collapsed }
}
