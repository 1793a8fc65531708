//! In-memory [`ItemStore`] used by the unit tests of this crate.

use std::{
  collections::BTreeMap,
  sync::{
    Mutex,
    atomic::{AtomicU64, Ordering},
  },
};

use crate::{
  item::{Comment, ItemId, Story},
  store::{ItemStore, TableCounts, UpsertCounts},
};

#[derive(Debug, thiserror::Error)]
#[error("injected failure on upsert #{0}")]
pub struct InjectedFailure(pub u64);

#[derive(Default)]
pub struct MemoryStore {
  stories:  Mutex<BTreeMap<ItemId, Story>>,
  comments: Mutex<BTreeMap<ItemId, Comment>>,
  calls:    AtomicU64,
  fail_on:  Option<u64>,
}

impl MemoryStore {
  /// A store whose `n`th upsert call (1-based) fails without writing.
  pub fn failing_on(n: u64) -> Self { Self { fail_on: Some(n), ..Self::default() } }

  pub fn upsert_calls(&self) -> u64 { self.calls.load(Ordering::SeqCst) }
}

pub fn story(id: ItemId, title: &str) -> Story {
  Story {
    id,
    author: None,
    descendants: None,
    score: None,
    time: None,
    title: title.to_owned(),
    url: None,
    kids: Vec::new(),
  }
}

pub fn comment(id: ItemId, text: &str) -> Comment {
  Comment { id, author: None, parent: None, time: None, text: Some(text.to_owned()) }
}

impl ItemStore for MemoryStore {
  type Error = InjectedFailure;

  async fn upsert(
    &self,
    stories: &[Story],
    comments: &[Comment],
  ) -> Result<UpsertCounts, InjectedFailure> {
    let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if self.fail_on == Some(call) {
      return Err(InjectedFailure(call));
    }
    let mut s = self.stories.lock().unwrap();
    let mut c = self.comments.lock().unwrap();
    for row in stories {
      s.insert(row.id, row.clone());
    }
    for row in comments {
      c.insert(row.id, row.clone());
    }
    Ok(UpsertCounts { stories: stories.len() as u64, comments: comments.len() as u64 })
  }

  async fn counts(&self) -> Result<TableCounts, InjectedFailure> {
    Ok(TableCounts {
      stories:  self.stories.lock().unwrap().len() as u64,
      comments: self.comments.lock().unwrap().len() as u64,
      techs:    0,
    })
  }

  async fn get_story(&self, id: ItemId) -> Result<Option<Story>, InjectedFailure> {
    Ok(self.stories.lock().unwrap().get(&id).cloned())
  }

  async fn get_comment(&self, id: ItemId) -> Result<Option<Comment>, InjectedFailure> {
    Ok(self.comments.lock().unwrap().get(&id).cloned())
  }

  async fn stories(&self) -> Result<Vec<Story>, InjectedFailure> {
    Ok(self.stories.lock().unwrap().values().cloned().collect())
  }

  async fn comments(&self) -> Result<Vec<Comment>, InjectedFailure> {
    Ok(self.comments.lock().unwrap().values().cloned().collect())
  }

  async fn comments_by_parent(&self, parent: ItemId) -> Result<Vec<Comment>, InjectedFailure> {
    Ok(
      self
        .comments
        .lock()
        .unwrap()
        .values()
        .filter(|c| c.parent == Some(parent))
        .cloned()
        .collect(),
    )
  }

  async fn story_titles(
    &self,
    limit: Option<usize>,
  ) -> Result<Vec<(ItemId, String)>, InjectedFailure> {
    Ok(
      self
        .stories
        .lock()
        .unwrap()
        .values()
        .take(limit.unwrap_or(usize::MAX))
        .map(|s| (s.id, s.title.clone()))
        .collect(),
    )
  }
}
