//! `hn`: download, merge and load Hacker News items.
//!
//! ```text
//! hn fetch   --start-id 100 --end-id 1 --out raw_data/part.jsonl.gz
//! hn combine --input-dir raw_data --output raw_data/all.jsonl.gz
//! hn ingest  --db sqlite:///hn.db --input raw_data/all.jsonl.gz
//! hn status  --db sqlite:///hn.db
//! hn schema  --dialect postgresql
//! hn sample  --input raw_data/all.jsonl.gz --sets small:100 large:1000
//! hn export-titles --db sqlite:///hn.db --out titles.csv --format csv
//! ```
//!
//! Defaults come from `hn.toml` (or `--config`) and `HN_*` environment
//! variables; flags win over both. Logs go to stderr and follow `RUST_LOG`.

mod commands;
mod settings;

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{
  commands::{
    ExitWith as _, Outcome,
    combine::CombineArgs,
    exit,
    export_titles::ExportTitlesArgs,
    fetch::FetchArgs,
    ingest::IngestArgs,
    sample::SampleArgs,
    schema::SchemaArgs,
    status::StatusArgs,
  },
  settings::Settings,
};

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hn", author, version, about = "Hacker News item pipeline")]
struct Cli {
  /// Path to the TOML configuration file (optional).
  #[arg(short, long, global = true, default_value = "hn.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Load item files into a database.
  Ingest(IngestArgs),
  /// Download items from the Hacker News API.
  Fetch(FetchArgs),
  /// Merge part files into one deduplicated file.
  Combine(CombineArgs),
  /// Show the tables and row counts of a database.
  Status(StatusArgs),
  /// Print the DDL and upsert statements for a dialect.
  Schema(SchemaArgs),
  /// Write demo sample sets drawn from an item file.
  Sample(SampleArgs),
  /// Write story titles from a database to a file.
  ExportTitles(ExportTitlesArgs),
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  match run(cli).await {
    Ok(code) => ExitCode::from(code),
    Err(failure) => {
      eprintln!("error: {:#}", failure.error);
      ExitCode::from(failure.code)
    }
  }
}

async fn run(cli: Cli) -> Outcome {
  let settings = Settings::load(&cli.config).exit_with(exit::FAILURE)?;
  tracing::debug!(?settings, "settings loaded");

  match cli.command {
    Command::Ingest(args) => commands::ingest::run(args, &settings).await,
    Command::Fetch(args) => commands::fetch::run(args, &settings).await,
    Command::Combine(args) => tokio::task::block_in_place(|| commands::combine::run(args)),
    Command::Status(args) => commands::status::run(args, &settings).await,
    Command::Schema(args) => commands::schema::run(args),
    Command::Sample(args) => tokio::task::block_in_place(|| commands::sample::run(args)),
    Command::ExportTitles(args) => commands::export_titles::run(args, &settings).await,
  }
}
