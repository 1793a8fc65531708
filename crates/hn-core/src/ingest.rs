//! The ingest pipeline: source → classifier → accumulator → store.
//!
//! One file runs through a small state machine:
//!
//! ```text
//! Open → Reading ⇄ Flushing … → FinalFlush → Closed
//!                    └──────────────┴──────→ Aborted
//! ```
//!
//! Everything happens in sequence on the caller's task. A failed flush ends
//! the file in `Aborted`; flushes committed before it stay committed.

use std::{
  ops::AddAssign,
  path::{Path, PathBuf},
};

use crate::{
  Result,
  batch::BatchAccumulator,
  classify::{Skip, try_classify},
  source::ItemReader,
  store::ItemStore,
};

/// Default number of distinct rows per flush.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

// ─── State machine ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
  Open,
  Reading,
  Flushing,
  FinalFlush,
  Closed,
  Aborted,
}

impl IngestState {
  pub fn is_terminal(self) -> bool { matches!(self, Self::Closed | Self::Aborted) }

  /// Whether `self → next` is a legal transition.
  pub fn can_advance(self, next: Self) -> bool {
    use IngestState::*;
    matches!(
      (self, next),
      (Open, Reading)
        | (Reading, Flushing)
        | (Flushing, Reading)
        | (Reading, FinalFlush)
        | (FinalFlush, Closed)
        | (Open | Reading | Flushing | FinalFlush, Aborted)
    )
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// Counts for one file, or cumulative counts for several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
  /// Story rows affected, as reported by the store.
  pub stories:       u64,
  /// Comment rows affected, as reported by the store.
  pub comments:      u64,
  /// Non-blank lines read.
  pub lines:         u64,
  /// Lines that were not a JSON object.
  pub skipped_lines: u64,
  /// Records of a kind the store does not materialise.
  pub unclassified:  u64,
  /// Stories or comments without an integer id.
  pub missing_id:    u64,
  /// Stories without a title.
  pub missing_title: u64,
  /// Rows collapsed into a buffered row with the same id.
  pub collapsed:     u64,
  pub flushes:       u64,
}

impl AddAssign for IngestReport {
  fn add_assign(&mut self, rhs: Self) {
    self.stories += rhs.stories;
    self.comments += rhs.comments;
    self.lines += rhs.lines;
    self.skipped_lines += rhs.skipped_lines;
    self.unclassified += rhs.unclassified;
    self.missing_id += rhs.missing_id;
    self.missing_title += rhs.missing_title;
    self.collapsed += rhs.collapsed;
    self.flushes += rhs.flushes;
  }
}

/// Progress notifications from [`Ingestor::ingest_paths`].
#[derive(Debug)]
pub enum IngestEvent<'a> {
  Started(&'a Path),
  Finished(&'a Path, &'a IngestReport),
}

// ─── Ingestor ────────────────────────────────────────────────────────────────

/// Streams item files into an [`ItemStore`].
pub struct Ingestor<'s, S> {
  store:      &'s S,
  batch_size: usize,
}

impl<'s, S: ItemStore> Ingestor<'s, S> {
  pub fn new(store: &'s S, batch_size: usize) -> Self { Self { store, batch_size } }

  /// Ingest every path in order, stopping at the first fatal error.
  ///
  /// Returns the cumulative report of all files.
  pub async fn ingest_paths<P: AsRef<Path>>(
    &self,
    paths: &[P],
    mut on_event: impl FnMut(IngestEvent<'_>),
  ) -> Result<IngestReport> {
    let mut total = IngestReport::default();
    for path in paths {
      let path = path.as_ref();
      on_event(IngestEvent::Started(path));
      let report = self.ingest_path(path).await?;
      on_event(IngestEvent::Finished(path, &report));
      total += report;
    }
    Ok(total)
  }

  /// Ingest one file, flushing whenever the buffer reaches the batch size
  /// and once more at end of input.
  pub async fn ingest_path(&self, path: impl AsRef<Path>) -> Result<IngestReport> {
    let mut run = FileRun::new(path.as_ref());
    let outcome = run.drive(self.store, self.batch_size).await;
    if outcome.is_err() {
      run.advance(IngestState::Aborted);
    }
    outcome
  }
}

/// Bookkeeping for a single file.
struct FileRun {
  path:  PathBuf,
  state: IngestState,
}

impl FileRun {
  fn new(path: &Path) -> Self { Self { path: path.to_path_buf(), state: IngestState::Open } }

  fn advance(&mut self, next: IngestState) {
    debug_assert!(
      self.state.can_advance(next),
      "illegal ingest transition {:?} → {next:?}",
      self.state
    );
    tracing::trace!(path = %self.path.display(), from = ?self.state, to = ?next, "ingest state");
    self.state = next;
  }

  async fn drive<S: ItemStore>(&mut self, store: &S, batch_size: usize) -> Result<IngestReport> {
    let mut reader = ItemReader::open(&self.path)?;
    let mut acc = BatchAccumulator::new(store, batch_size);
    let mut report = IngestReport::default();
    self.advance(IngestState::Reading);

    for raw in reader.by_ref() {
      match try_classify(&raw?) {
        Ok(item) => acc.insert(item),
        Err(Skip::Unclassified) => report.unclassified += 1,
        Err(Skip::MissingId) => report.missing_id += 1,
        Err(Skip::MissingTitle) => report.missing_title += 1,
      }

      if acc.is_full() {
        self.advance(IngestState::Flushing);
        acc.flush().await?;
        self.advance(IngestState::Reading);
      }
    }

    self.advance(IngestState::FinalFlush);
    acc.flush().await?;
    self.advance(IngestState::Closed);

    let stats = reader.stats();
    let totals = acc.totals();
    report.stories = totals.stories;
    report.comments = totals.comments;
    report.lines = stats.lines;
    report.skipped_lines = stats.skipped;
    report.collapsed = acc.collapsed();
    report.flushes = acc.flushes();

    tracing::info!(
      path = %self.path.display(),
      stories = report.stories,
      comments = report.comments,
      lines = report.lines,
      skipped_lines = report.skipped_lines,
      unclassified = report.unclassified,
      missing_id = report.missing_id,
      missing_title = report.missing_title,
      flushes = report.flushes,
      "ingested file"
    );
    Ok(report)
  }
}
