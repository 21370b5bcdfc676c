//! The persistence boundary for read state.
//!
//! Everything that reads or writes story state goes through
//! [`StoryRepository`]; nothing else in the crate touches the store.

use async_trait::async_trait;

use super::schema::Database;
use super::types::{Story, StoryError, StoryId};

#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// All stories with `is_read = false`, newest first. Empty is not an error.
    async fn unread(&self) -> Result<Vec<Story>, StoryError>;

    /// All stories with `is_read = true`, newest first.
    async fn read(&self) -> Result<Vec<Story>, StoryError>;

    /// Fails with `StoryError::NotFound` if no story has this id.
    async fn fetch(&self, id: StoryId) -> Result<Story, StoryError>;

    /// Persist the story's read flag. Returns once the write is committed.
    ///
    /// Idempotent: saving the same state twice has no further effect.
    async fn save(&self, story: &Story) -> Result<(), StoryError>;
}

#[async_trait]
impl StoryRepository for Database {
    async fn unread(&self) -> Result<Vec<Story>, StoryError> {
        self.stories_by_read_state(false).await
    }

    async fn read(&self) -> Result<Vec<Story>, StoryError> {
        self.stories_by_read_state(true).await
    }

    async fn fetch(&self, id: StoryId) -> Result<Story, StoryError> {
        self.story_by_id(id).await
    }

    async fn save(&self, story: &Story) -> Result<(), StoryError> {
        self.update_read_state(story).await
    }
}
