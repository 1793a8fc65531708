//! Sliding-window download pool.
//!
//! Exactly `workers` requests are in flight until the ids run out. Each
//! completion is written by the pool loop itself, so the sink has a single
//! writer, and the freed slot is refilled with the next pending id.

use std::{
  future::Future,
  path::PathBuf,
  time::{Duration, Instant},
};

use futures::stream::{FuturesUnordered, StreamExt as _};
use hn_core::ItemId;
use serde_json::Value;

use crate::{Result, client::ItemFetcher, sink::ItemSink};

pub const DEFAULT_WORKERS: usize = 32;
pub const DEFAULT_PROGRESS_EVERY: u64 = 10_000;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  /// Every id was requested and answered.
  Completed,
  /// The shutdown signal fired; in-flight requests were abandoned.
  Interrupted,
}

/// Totals for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchStats {
  /// Items written to the sink.
  pub saved:      u64,
  /// Requests answered, successfully or not.
  pub seen:       u64,
  pub errors:     u64,
  pub elapsed:    Duration,
  pub size_bytes: u64,
  pub out_path:   PathBuf,
  pub outcome:    FetchOutcome,
}

#[derive(Debug, Clone)]
pub struct FetchPool {
  workers:        usize,
  progress_every: u64,
}

impl Default for FetchPool {
  fn default() -> Self { Self::new(DEFAULT_WORKERS) }
}

impl FetchPool {
  /// A `workers` of zero is treated as one.
  pub fn new(workers: usize) -> Self {
    Self { workers: workers.max(1), progress_every: DEFAULT_PROGRESS_EVERY }
  }

  /// Log progress every `n` answered requests; zero disables progress logs.
  pub fn progress_every(mut self, n: u64) -> Self {
    self.progress_every = n;
    self
  }

  pub fn workers(&self) -> usize { self.workers }

  /// Download `ids` into `sink` until they run out or `shutdown` resolves.
  ///
  /// A failed request is counted and the pool moves on. Only a sink write
  /// failure ends the run with an error. On completion and on interruption
  /// the sink is finished before returning.
  pub async fn run<F, I>(
    &self,
    ids: I,
    fetcher: &F,
    mut sink: ItemSink,
    shutdown: impl Future<Output = ()>,
  ) -> Result<FetchStats>
  where
    F: ItemFetcher,
    I: IntoIterator<Item = ItemId>,
  {
    let started = Instant::now();
    let mut ids = ids.into_iter();
    let mut in_flight = FuturesUnordered::new();
    for id in ids.by_ref().take(self.workers) {
      in_flight.push(fetch_one(fetcher, id));
    }

    let (mut saved, mut seen, mut errors) = (0u64, 0u64, 0u64);
    tokio::pin!(shutdown);

    let outcome = loop {
      tokio::select! {
        biased;

        () = &mut shutdown => break FetchOutcome::Interrupted,

        done = in_flight.next() => {
          let Some((id, result)) = done else {
            break FetchOutcome::Completed;
          };
          seen += 1;
          match result {
            Ok(Some(item)) => {
              sink.write(&item)?;
              saved += 1;
            }
            Ok(None) => tracing::trace!(id, "no item"),
            Err(e) => {
              errors += 1;
              tracing::debug!(id, error = %e, "fetch failed");
            }
          }

          if let Some(next) = ids.next() {
            in_flight.push(fetch_one(fetcher, next));
          }

          if self.progress_every > 0 && seen % self.progress_every == 0 {
            let elapsed = started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 { saved as f64 / elapsed } else { 0.0 };
            tracing::info!(
              seen,
              saved,
              errors,
              elapsed = format_args!("{elapsed:.1}s"),
              rate = format_args!("{rate:.1} items/s"),
              "fetch progress"
            );
          }
        }
      }
    };

    drop(in_flight);
    let out_path = sink.path().to_path_buf();
    let size_bytes = sink.finish()?;
    Ok(FetchStats {
      saved,
      seen,
      errors,
      elapsed: started.elapsed(),
      size_bytes,
      out_path,
      outcome,
    })
  }
}

async fn fetch_one<F: ItemFetcher>(fetcher: &F, id: ItemId) -> (ItemId, Result<Option<Value>>) {
  (id, fetcher.fetch(id).await)
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use serde_json::json;

  use super::*;
  use crate::{Error, range::id_range};

  /// Answers after a short, id-dependent delay while tracking concurrency.
  /// Ids divisible by 5 fail, ids divisible by 7 have no item, ids above
  /// `hang_after` never answer.
  #[derive(Default)]
  struct FakeApi {
    current:    AtomicUsize,
    peak:       AtomicUsize,
    requested:  Mutex<Vec<ItemId>>,
    hang_after: Option<ItemId>,
  }

  impl ItemFetcher for FakeApi {
    async fn fetch(&self, id: ItemId) -> Result<Option<Value>> {
      self.requested.lock().unwrap().push(id);
      if self.hang_after.is_some_and(|limit| id > limit) {
        std::future::pending::<()>().await;
      }
      let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
      self.peak.fetch_max(now, Ordering::SeqCst);
      tokio::time::sleep(Duration::from_millis((id % 4) as u64 + 1)).await;
      self.current.fetch_sub(1, Ordering::SeqCst);

      if id % 5 == 0 {
        Err(Error::Status { url: format!("item/{id}.json"), status: reqwest::StatusCode::BAD_GATEWAY })
      } else if id % 7 == 0 {
        Ok(None)
      } else {
        Ok(Some(json!({ "id": id, "type": "comment" })))
      }
    }

    async fn max_item(&self) -> Result<ItemId> { Ok(100) }
  }

  fn read_ids(path: &std::path::Path) -> Vec<ItemId> {
    std::fs::read_to_string(path)
      .unwrap()
      .lines()
      .map(|l| serde_json::from_str::<Value>(l).unwrap()["id"].as_i64().unwrap())
      .collect()
  }

  #[tokio::test]
  async fn bounded_window_and_counts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.jsonl");
    let api = FakeApi::default();
    let sink = ItemSink::create(&path, false).unwrap();

    let stats = FetchPool::new(4)
      .progress_every(10)
      .run(id_range(1, 70), &api, sink, std::future::pending())
      .await
      .unwrap();

    assert_eq!(stats.outcome, FetchOutcome::Completed);
    assert_eq!(stats.seen, 70);
    // 14 multiples of 5; 8 multiples of 7 that are not also multiples of 5.
    assert_eq!(stats.errors, 14);
    assert_eq!(stats.saved, 70 - 14 - 8);
    assert!(api.peak.load(Ordering::SeqCst) <= 4);
    assert_eq!(api.peak.load(Ordering::SeqCst), 4);

    let written = read_ids(&path);
    assert_eq!(written.len() as u64, stats.saved);
    assert!(written.iter().all(|id| id % 5 != 0 && id % 7 != 0));
    assert_eq!(stats.size_bytes, std::fs::metadata(&path).unwrap().len());
  }

  #[tokio::test]
  async fn requests_follow_range_order() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeApi::default();
    let sink = ItemSink::create(dir.path().join("items.jsonl.gz"), true).unwrap();

    FetchPool::new(1).run(id_range(6, 1), &api, sink, std::future::pending()).await.unwrap();
    assert_eq!(*api.requested.lock().unwrap(), vec![6, 5, 4, 3, 2, 1]);
    assert_eq!(api.peak.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn shutdown_interrupts_and_keeps_written_items() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.jsonl");
    let api = FakeApi { hang_after: Some(4), ..FakeApi::default() };
    let sink = ItemSink::create(&path, false).unwrap();

    let stats = FetchPool::new(3)
      .run(id_range(1, 1_000), &api, sink, tokio::time::sleep(Duration::from_millis(200)))
      .await
      .unwrap();

    assert_eq!(stats.outcome, FetchOutcome::Interrupted);
    assert_eq!((stats.seen, stats.saved), (4, 4));
    let mut written = read_ids(&path);
    written.sort();
    assert_eq!(written, vec![1, 2, 3, 4]);
    // Never more than the window was requested.
    assert_eq!(api.requested.lock().unwrap().len(), 4 + 3);
  }

  #[tokio::test]
  async fn empty_range_completes_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeApi::default();
    let sink = ItemSink::create(dir.path().join("none.jsonl"), false).unwrap();

    let stats = FetchPool::new(8).run(Vec::new(), &api, sink, std::future::pending()).await.unwrap();
    assert_eq!(stats.outcome, FetchOutcome::Completed);
    assert_eq!((stats.seen, stats.saved, stats.size_bytes), (0, 0, 0));
  }
}
