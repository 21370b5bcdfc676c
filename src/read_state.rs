//! Single-story read state transitions.

use std::sync::Arc;

use crate::storage::{Story, StoryError, StoryId, StoryRepository};

#[derive(Clone)]
pub struct ReadStateService {
    repository: Arc<dyn StoryRepository>,
}

impl ReadStateService {
    pub fn new(repository: Arc<dyn StoryRepository>) -> Self {
        Self { repository }
    }

    /// Set one story's read flag and persist it.
    ///
    /// Exactly one `fetch` and at most one `save`. The change stays local to
    /// the fetched copy until `save` commits it. `NotFound` and persistence
    /// failures are returned to the caller as-is; nothing is retried.
    pub async fn set_read_state(&self, id: StoryId, is_read: bool) -> Result<Story, StoryError> {
        let mut story = self.repository.fetch(id).await?;
        let was_read = story.is_read;
        story.is_read = is_read;
        self.repository.save(&story).await?;

        tracing::debug!(story_id = %id, was_read, is_read, "Story read state saved");
        Ok(story)
    }
}
