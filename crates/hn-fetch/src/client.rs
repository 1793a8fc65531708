//! The item-by-id API and its HTTP client.

use std::{future::Future, time::Duration};

use hn_core::ItemId;
use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0/";

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of raw items by id.
pub trait ItemFetcher: Send + Sync {
  /// The raw item, or `None` when the API has nothing under `id`.
  fn fetch(&self, id: ItemId) -> impl Future<Output = Result<Option<Value>>> + Send + '_;

  /// The largest id currently assigned.
  fn max_item(&self) -> impl Future<Output = Result<ItemId>> + Send + '_;
}

/// Async client for the Hacker News Firebase API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HnClient {
  client:   Client,
  base_url: String,
}

impl HnClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{path}", self.base_url.trim_end_matches('/'))
  }

  async fn get_json(&self, path: &str) -> Result<Value> {
    let url = self.url(path);
    let resp = self.client.get(&url).send().await?;
    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status { url, status });
    }
    Ok(resp.json().await?)
  }
}

impl ItemFetcher for HnClient {
  /// `GET item/<id>.json`
  async fn fetch(&self, id: ItemId) -> Result<Option<Value>> {
    match self.get_json(&format!("item/{id}.json")).await? {
      Value::Null => Ok(None),
      item => Ok(Some(item)),
    }
  }

  /// `GET maxitem.json`
  async fn max_item(&self) -> Result<ItemId> {
    let value = self.get_json("maxitem.json").await?;
    match value.as_i64() {
      Some(id) => Ok(id),
      None => Err(Error::BadMaxItem(value)),
    }
  }
}
