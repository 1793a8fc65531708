use std::{
  fs::File,
  io::{BufWriter, Write},
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, ValueEnum, builder::RangedU64ValueParser};
use hn_core::{ItemId, ItemStore as _};
use hn_store_sql::ConnectOptions;
use serde::Serialize;

use super::{ExitWith as _, Outcome, exit};
use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct ExportTitlesArgs {
  /// Connection string; falls back to `db` in the config file.
  #[arg(short, long)]
  pub db: Option<String>,

  /// Output file; parent directories are created.
  #[arg(short, long, value_name = "PATH")]
  pub out: PathBuf,

  #[arg(long, value_enum, default_value_t = TitleFormat::Txt)]
  pub format: TitleFormat,

  /// Export at most N titles, lowest ids first.
  #[arg(long, value_name = "N", value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
  pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TitleFormat {
  /// One title per line.
  Txt,
  /// `id,title` with a header row.
  Csv,
  /// One `{"id", "title"}` object per line.
  Jsonl,
}

#[derive(Serialize)]
struct TitleRow<'a> {
  id:    ItemId,
  title: &'a str,
}

pub async fn run(args: ExportTitlesArgs, settings: &Settings) -> Outcome {
  let url = args
    .db
    .or_else(|| settings.db.clone())
    .context("no database given; pass --db or set `db` in the config file")
    .exit_with(exit::FAILURE)?;
  let store = hn_store_sql::connect(&url, ConnectOptions::default())
    .await
    .context("failed to open database")
    .exit_with(exit::FAILURE)?;
  let titles = store
    .story_titles(args.limit)
    .await
    .context("failed to read story titles")
    .exit_with(exit::FAILURE)?;

  write_titles(&args.out, args.format, &titles)
    .with_context(|| format!("failed to write {}", args.out.display()))
    .exit_with(exit::FAILURE)?;
  tracing::info!(titles = titles.len(), out = %args.out.display(), "titles exported");
  println!("Done: exported titles to {}", args.out.display());
  Ok(exit::OK)
}

fn write_titles(path: &Path, format: TitleFormat, titles: &[(ItemId, String)]) -> anyhow::Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)?;
  }
  let mut out = BufWriter::new(File::create(path)?);
  match format {
    TitleFormat::Txt => {
      for (_, title) in titles {
        writeln!(out, "{title}")?;
      }
    }
    TitleFormat::Csv => {
      let mut csv = csv::Writer::from_writer(&mut out);
      csv.write_record(["id", "title"])?;
      for (id, title) in titles {
        csv.write_record([id.to_string().as_str(), title.as_str()])?;
      }
      csv.flush()?;
    }
    TitleFormat::Jsonl => {
      for (id, title) in titles {
        serde_json::to_writer(&mut out, &TitleRow { id: *id, title })?;
        out.write_all(b"\n")?;
      }
    }
  }
  out.flush()?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use hn_core::Story;

  use super::*;

  fn titles() -> Vec<(ItemId, String)> {
    vec![(1, "Show HN: a thing".to_owned()), (5, "Quotes \"and\", commas".to_owned())]
  }

  #[test]
  fn formats() {
    let dir = tempfile::tempdir().unwrap();

    let txt = dir.path().join("t.txt");
    write_titles(&txt, TitleFormat::Txt, &titles()).unwrap();
    assert_eq!(std::fs::read_to_string(&txt).unwrap(), "Show HN: a thing\nQuotes \"and\", commas\n");

    let csv = dir.path().join("t.csv");
    write_titles(&csv, TitleFormat::Csv, &titles()).unwrap();
    assert_eq!(
      std::fs::read_to_string(&csv).unwrap(),
      "id,title\n1,Show HN: a thing\n5,\"Quotes \"\"and\"\", commas\"\n"
    );

    let jsonl = dir.path().join("nested").join("t.jsonl");
    write_titles(&jsonl, TitleFormat::Jsonl, &titles()).unwrap();
    assert_eq!(
      std::fs::read_to_string(&jsonl).unwrap(),
      "{\"id\":1,\"title\":\"Show HN: a thing\"}\n{\"id\":5,\"title\":\"Quotes \\\"and\\\", commas\"}\n"
    );
  }

  #[tokio::test]
  async fn exports_from_a_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = format!("sqlite:///{}", dir.path().join("hn.db").display());
    let store = hn_store_sql::connect(&db, ConnectOptions::default()).await.unwrap();
    let story = |id, title: &str| Story {
      id,
      author: None,
      descendants: None,
      score: None,
      time: None,
      title: title.to_owned(),
      url: None,
      kids: vec![],
    };
    store.upsert(&[story(2, "second"), story(1, "first"), story(3, "")], &[]).await.unwrap();
    drop(store);

    let out = dir.path().join("out").join("titles.txt");
    let args = ExportTitlesArgs { db: Some(db), out: out.clone(), format: TitleFormat::Txt, limit: None };
    assert_eq!(run(args, &Settings::default()).await.unwrap(), exit::OK);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "first\nsecond\n");
  }

  #[tokio::test]
  async fn missing_database_fails_with_1() {
    let dir = tempfile::tempdir().unwrap();
    let args = ExportTitlesArgs {
      db:     None,
      out:    dir.path().join("titles.txt"),
      format: TitleFormat::Txt,
      limit:  None,
    };
    let failure = run(args, &Settings::default()).await.unwrap_err();
    assert_eq!(failure.code, exit::FAILURE);
  }
}
