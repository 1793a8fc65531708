//! Bulk download of Hacker News items into a JSONL(.gz) file.
//!
//! [`FetchPool`] keeps a fixed number of item requests in flight against an
//! [`ItemFetcher`] (normally [`HnClient`]) and writes each result through a
//! single [`ItemSink`] as it completes.

// Native `async fn` in traits; the trait spells out its `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod client;
pub mod error;
pub mod pool;
pub mod range;
pub mod sink;

pub use client::{DEFAULT_BASE_URL, HnClient, ItemFetcher};
pub use error::{Error, Result};
pub use pool::{FetchOutcome, FetchPool, FetchStats};
pub use range::{IdRange, id_range, resolve_range};
pub use sink::ItemSink;
