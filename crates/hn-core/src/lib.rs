//! Core types and the streaming ingest pipeline for Hacker News items.
//!
//! This crate knows nothing about SQL. It reads item files, classifies
//! records, buffers rows, and hands each batch to an [`store::ItemStore`]
//! implementation (see `hn-store-sql`).

// Native `async fn` in traits; the trait spells out its `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod batch;
pub mod classify;
pub mod combine;
pub mod error;
pub mod ingest;
pub mod item;
pub mod sample;
pub mod source;
pub mod store;

pub use error::{Error, Result};
pub use ingest::{IngestEvent, IngestReport, Ingestor};
pub use item::{Comment, Item, ItemId, ItemKind, Story};
pub use store::{ItemStore, TableCounts, UpsertCounts};

#[cfg(test)]
mod test_store;
