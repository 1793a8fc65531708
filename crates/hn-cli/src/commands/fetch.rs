use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, builder::RangedU64ValueParser};
use hn_core::ItemId;
use hn_fetch::{FetchOutcome, FetchPool, FetchStats, HnClient, ItemSink};

use super::{ExitWith as _, Outcome, exit};
use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct FetchArgs {
  /// Output file; parent directories are created.
  #[arg(short, long, value_name = "PATH")]
  pub out: Option<PathBuf>,

  /// First id to request [default: current max item].
  #[arg(long)]
  pub start_id: Option<ItemId>,

  /// Last id to request, inclusive [default: 1].
  #[arg(long)]
  pub end_id: Option<ItemId>,

  /// Requests kept in flight.
  #[arg(short, long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
  pub workers: Option<usize>,

  /// Write plain JSONL instead of gzip.
  #[arg(long)]
  pub no_compress: bool,

  /// Log progress every N answered requests (0 disables).
  #[arg(long, value_name = "N")]
  pub progress_every: Option<u64>,

  /// API root.
  #[arg(long, value_name = "URL")]
  pub base_url: Option<String>,
}

pub async fn run(args: FetchArgs, settings: &Settings) -> Outcome {
  let defaults = &settings.fetch;
  let out = args.out.unwrap_or_else(|| defaults.out.clone());
  let workers = args.workers.unwrap_or(defaults.workers).max(1);
  let compress = defaults.compress && !args.no_compress;
  let base_url = args.base_url.unwrap_or_else(|| defaults.base_url.clone());

  let client = HnClient::new(base_url).exit_with(exit::FAILURE)?;
  let ids = hn_fetch::resolve_range(&client, args.start_id, args.end_id)
    .await
    .context("failed to resolve the id range")
    .exit_with(exit::FAILURE)?;
  let sink = ItemSink::create(&out, compress).exit_with(exit::FAILURE)?;

  tracing::info!(workers, out = %out.display(), compress, "fetching items");
  let stats = FetchPool::new(workers)
    .progress_every(args.progress_every.unwrap_or(defaults.progress_every))
    .run(ids, &client, sink, ctrl_c())
    .await
    .context("fetch failed")
    .exit_with(exit::FAILURE)?;

  println!("{}", summary(&stats));
  match stats.outcome {
    FetchOutcome::Completed => Ok(exit::OK),
    FetchOutcome::Interrupted => {
      eprintln!("Stopped by user (Ctrl+C)");
      Ok(exit::INTERRUPTED)
    }
  }
}

/// Resolves on Ctrl+C. If the handler cannot be installed it never resolves.
async fn ctrl_c() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "cannot listen for Ctrl+C");
    std::future::pending::<()>().await;
  }
}

fn summary(stats: &FetchStats) -> String {
  format!(
    "Done: saved={} seen={} errors={} elapsed={:.1}s size={}B out={}",
    stats.saved,
    stats.seen,
    stats.errors,
    stats.elapsed.as_secs_f64(),
    stats.size_bytes,
    stats.out_path.display(),
  )
}
