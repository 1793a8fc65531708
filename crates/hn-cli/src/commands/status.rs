use anyhow::Context as _;
use clap::Args;
use hn_store_sql::{AnyStore, ConnectOptions, schema::TABLES};

use super::{ExitWith as _, Outcome, exit};
use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct StatusArgs {
  /// Connection string; falls back to `db` in the config file.
  #[arg(short, long)]
  pub db: Option<String>,
}

pub async fn run(args: StatusArgs, settings: &Settings) -> Outcome {
  let url = args
    .db
    .or_else(|| settings.db.clone())
    .context("no database given; pass --db or set `db` in the config file")
    .exit_with(exit::FAILURE)?;
  let store = hn_store_sql::connect(&url, ConnectOptions::default())
    .await
    .context("failed to open database")
    .exit_with(exit::FAILURE)?;

  print!("{}", report(&store).await.exit_with(exit::FAILURE)?);
  Ok(exit::OK)
}

async fn report(store: &AnyStore) -> hn_store_sql::Result<String> {
  let present = store.tables().await?;
  let mut out = format!("dialect: {}\n", store.dialect().name());
  out.push_str(&format!("tables:  {}\n", present.join(", ")));
  for table in TABLES.iter().filter(|t| present.iter().any(|p| p == *t)) {
    out.push_str(&format!("{table:<10} {}\n", store.count_rows(table).await?));
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use hn_core::{ItemStore as _, Story};

  use super::*;

  #[tokio::test]
  async fn reports_tables_and_counts() {
    let store = hn_store_sql::connect("sqlite://", ConnectOptions::default()).await.unwrap();
    let story = Story {
      id:          1,
      author:      None,
      descendants: None,
      score:       None,
      time:        None,
      title:       "t".to_owned(),
      url:         None,
      kids:        vec![],
    };
    store.upsert(&[story], &[]).await.unwrap();

    let text = report(&store).await.unwrap();
    assert!(text.starts_with("dialect: sqlite\n"), "{text}");
    assert!(text.contains("story      1\n"), "{text}");
    assert!(text.contains("comment    0\n"), "{text}");
    assert!(text.contains("story_tech 0\n"), "{text}");
  }
}
