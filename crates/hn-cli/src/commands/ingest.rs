use std::path::PathBuf;

use anyhow::{Context as _, anyhow};
use clap::{Args, builder::RangedU64ValueParser};
use hn_core::{IngestEvent, Ingestor};
use hn_store_sql::ConnectOptions;

use super::{ExitWith as _, Failure, Outcome, exit};
use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct IngestArgs {
  /// Connection string, e.g. `sqlite:///hn.db` or `postgresql://user@host/hn`.
  #[arg(short, long)]
  pub db: Option<String>,

  /// Item files to import, in order (`.gz` and `.zst` are decompressed).
  #[arg(short, long = "input", value_name = "PATH", required = true, num_args = 1..)]
  pub inputs: Vec<PathBuf>,

  /// Rows buffered before each flush.
  #[arg(short, long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
  pub batch_size: Option<usize>,

  /// Log every SQL statement.
  #[arg(long)]
  pub echo: bool,
}

pub async fn run(args: IngestArgs, settings: &Settings) -> Outcome {
  let url = args
    .db
    .or_else(|| settings.db.clone())
    .ok_or_else(|| anyhow!("no database given; pass --db or set `db` in the config file"))
    .exit_with(exit::FAILURE)?;
  let batch_size = args.batch_size.unwrap_or(settings.batch_size);
  if batch_size == 0 {
    return Err(Failure::new(exit::FAILURE, anyhow!("batch size must be at least 1")));
  }

  let options = ConnectOptions { echo: args.echo || settings.echo };
  let store = hn_store_sql::connect(&url, options)
    .await
    .context("failed to open database")
    .exit_with(exit::FAILURE)?;

  let total = Ingestor::new(&store, batch_size)
    .ingest_paths(&args.inputs, |event| match event {
      IngestEvent::Started(path) => println!("Importing from file: {}", path.display()),
      IngestEvent::Finished(_, report) => {
        println!("Done: stories={}, comments={}", report.stories, report.comments);
      }
    })
    .await
    .map_err(failure)?;

  println!("Total loaded: stories={}, comments={}", total.stories, total.comments);
  Ok(exit::OK)
}

fn failure(err: hn_core::Error) -> Failure {
  let code = match err {
    hn_core::Error::SourceNotFound(_) => exit::NOT_FOUND,
    _ => exit::INGEST_FAILED,
  };
  Failure::new(code, anyhow::Error::from(err).context("ingest failed"))
}
