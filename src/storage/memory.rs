//! In-memory story store.
//!
//! Substitute for [`Database`](super::Database) in tests and embedders that
//! don't want SQLite. Counts `fetch`/`save` calls and can be told to reject
//! saves for specific stories, which is how persistence failures are
//! exercised without a real store.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::repository::StoryRepository;
use super::types::{NewStory, Story, StoryError, StoryId};

#[derive(Default)]
pub struct MemoryStoryRepository {
    stories: Mutex<BTreeMap<StoryId, Story>>,
    feeds: Mutex<Vec<String>>,
    failing_saves: Mutex<HashSet<StoryId>>,
    fetch_calls: AtomicUsize,
    save_calls: AtomicUsize,
}

/// A panicking test thread must not wedge every other caller.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_feed(&self, name: &str) -> i64 {
        let mut feeds = lock(&self.feeds);
        feeds.push(name.to_string());
        feeds.len() as i64
    }

    pub fn insert_story(&self, story: &NewStory) -> StoryId {
        // Feed ids are 1-based positions in `feeds`.
        let source = usize::try_from(story.feed_id - 1)
            .ok()
            .and_then(|idx| lock(&self.feeds).get(idx).cloned())
            .unwrap_or_default();
        let mut stories = lock(&self.stories);
        let id = StoryId(stories.keys().next_back().map_or(1, |last| last.0 + 1));
        stories.insert(
            id,
            Story {
                id,
                feed_id: story.feed_id,
                source: Arc::from(source),
                headline: Arc::from(story.headline.as_str()),
                permalink: story.permalink.clone(),
                body: Arc::from(story.body.as_str()),
                published: story.published,
                is_read: false,
            },
        );
        id
    }

    /// Make every later `save` of this story fail with a persistence error.
    pub fn fail_saves_for(&self, id: StoryId) {
        lock(&self.failing_saves).insert(id);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Current read flag, bypassing the call counters.
    pub fn is_read(&self, id: StoryId) -> Option<bool> {
        lock(&self.stories).get(&id).map(|s| s.is_read)
    }

    fn by_read_state(&self, is_read: bool) -> Vec<Story> {
        let mut stories: Vec<Story> = lock(&self.stories)
            .values()
            .filter(|s| s.is_read == is_read)
            .cloned()
            .collect();
        stories.sort_by(|a, b| b.published.cmp(&a.published).then(b.id.cmp(&a.id)));
        stories
    }
}

#[async_trait]
impl StoryRepository for MemoryStoryRepository {
    async fn unread(&self) -> Result<Vec<Story>, StoryError> {
        Ok(self.by_read_state(false))
    }

    async fn read(&self) -> Result<Vec<Story>, StoryError> {
        Ok(self.by_read_state(true))
    }

    async fn fetch(&self, id: StoryId) -> Result<Story, StoryError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.stories)
            .get(&id)
            .cloned()
            .ok_or(StoryError::NotFound(id))
    }

    async fn save(&self, story: &Story) -> Result<(), StoryError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if lock(&self.failing_saves).contains(&story.id) {
            return Err(StoryError::Persistence(sqlx::Error::Protocol(format!(
                "write rejected for story {}",
                story.id
            ))));
        }
        match lock(&self.stories).get_mut(&story.id) {
            Some(stored) => {
                stored.is_read = story.is_read;
                Ok(())
            }
            None => Err(StoryError::NotFound(story.id)),
        }
    }
}
