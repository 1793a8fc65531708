//! Id ranges to download.

use hn_core::ItemId;

use crate::{Result, client::ItemFetcher};

/// Inclusive run of ids from `start` to `end`, walking down when
/// `start > end`.
#[derive(Debug, Clone)]
pub struct IdRange {
  next: Option<ItemId>,
  end:  ItemId,
}

pub fn id_range(start: ItemId, end: ItemId) -> IdRange { IdRange { next: Some(start), end } }

impl Iterator for IdRange {
  type Item = ItemId;

  fn next(&mut self) -> Option<ItemId> {
    let current = self.next?;
    self.next = match current.cmp(&self.end) {
      std::cmp::Ordering::Less => Some(current + 1),
      std::cmp::Ordering::Greater => Some(current - 1),
      std::cmp::Ordering::Equal => None,
    };
    Some(current)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let len = match self.next {
      Some(n) => usize::try_from(n.abs_diff(self.end)).map_or(usize::MAX, |d| d.saturating_add(1)),
      None => 0,
    };
    (len, Some(len))
  }
}

/// Fill in missing bounds: `start` defaults to the current max item and `end`
/// to 1. The max item is only requested when a bound is missing.
pub async fn resolve_range<F: ItemFetcher>(
  fetcher: &F,
  start: Option<ItemId>,
  end: Option<ItemId>,
) -> Result<IdRange> {
  let (start, end) = match (start, end) {
    (Some(start), Some(end)) => (start, end),
    (start, end) => {
      let max = fetcher.max_item().await?;
      tracing::info!(max, "resolved max item");
      (start.unwrap_or(max), end.unwrap_or(1))
    }
  };
  Ok(id_range(start, end))
}
