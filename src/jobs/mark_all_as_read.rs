use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use futures::future::BoxFuture;
use futures::FutureExt;

use super::catch_task_panic;
use crate::storage::{StoryError, StoryId, StoryRepository};

/// Max stories fetched/saved at once by a single job
const MAX_CONCURRENT_SAVES: usize = 4;

/// Batch of story tokens to flip to read.
#[derive(Debug, Clone)]
pub struct MarkAllAsRead {
    story_ids: Vec<String>,
    requested_at: DateTime<Utc>,
}

/// Per-job tally. Logged by the worker, never returned to the submitter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MarkAllOutcome {
    pub marked: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum ItemResult {
    Marked,
    Skipped,
    Failed,
}

impl MarkAllAsRead {
    /// Duplicate tokens collapse onto their first occurrence.
    pub fn new<I, S>(story_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let story_ids = story_ids
            .into_iter()
            .map(Into::<String>::into)
            .filter(|token| seen.insert(token.clone()))
            .collect();

        Self {
            story_ids,
            requested_at: Utc::now(),
        }
    }

    pub fn story_ids(&self) -> &[String] {
        &self.story_ids
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn len(&self) -> usize {
        self.story_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.story_ids.is_empty()
    }

    /// Mark every resolvable story as read.
    ///
    /// Each id is its own unit of work: unknown ids are skipped, and a failed
    /// save or a panic is logged and counted without stopping the rest. Items
    /// run concurrently, so the order they land in is unspecified.
    pub async fn mark_as_read(&self, repository: &dyn StoryRepository) -> MarkAllOutcome {
        // Boxed so the stream stays Send inside a spawned worker.
        let items: Vec<BoxFuture<'_, ItemResult>> = self
            .story_ids
            .iter()
            .map(|token| isolated_mark_one(repository, token).boxed())
            .collect();
        let results: Vec<ItemResult> = stream::iter(items)
            .buffer_unordered(MAX_CONCURRENT_SAVES)
            .collect()
            .await;

        let outcome = results
            .into_iter()
            .fold(MarkAllOutcome::default(), |mut acc, result| {
                match result {
                    ItemResult::Marked => acc.marked += 1,
                    ItemResult::Skipped => acc.skipped += 1,
                    ItemResult::Failed => acc.failed += 1,
                }
                acc
            });

        tracing::info!(
            requested = self.story_ids.len(),
            marked = outcome.marked,
            skipped = outcome.skipped,
            failed = outcome.failed,
            requested_at = %self.requested_at,
            "Mark all as read finished"
        );
        outcome
    }
}

async fn isolated_mark_one(repository: &dyn StoryRepository, token: &str) -> ItemResult {
    match catch_task_panic(mark_one(repository, token)).await {
        Ok(result) => result,
        Err(panic) => {
            tracing::error!(token = %token, error = %panic, "Mark as read panicked for story");
            ItemResult::Failed
        }
    }
}

async fn mark_one(repository: &dyn StoryRepository, token: &str) -> ItemResult {
    let Some(id) = StoryId::parse(token) else {
        tracing::debug!(token = %token, "Skipping unresolvable story id");
        return ItemResult::Skipped;
    };

    let mut story = match repository.fetch(id).await {
        Ok(story) => story,
        Err(StoryError::NotFound(_)) => {
            tracing::debug!(story_id = %id, "Skipping missing story");
            return ItemResult::Skipped;
        }
        Err(e) => {
            tracing::warn!(story_id = %id, error = %e, "Failed to load story for mark as read");
            return ItemResult::Failed;
        }
    };

    story.is_read = true;
    match repository.save(&story).await {
        Ok(()) => ItemResult::Marked,
        // Disappeared between fetch and save
        Err(StoryError::NotFound(_)) => ItemResult::Skipped,
        Err(e) => {
            tracing::warn!(story_id = %id, error = %e, "Failed to mark story as read");
            ItemResult::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStoryRepository, NewStory, Story};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    /// Panics when asked for one specific story, otherwise defers to memory.
    struct PanicOn {
        inner: MemoryStoryRepository,
        poisoned: StoryId,
    }

    #[async_trait]
    impl StoryRepository for PanicOn {
        async fn unread(&self) -> Result<Vec<Story>, StoryError> {
            self.inner.unread().await
        }
        async fn read(&self) -> Result<Vec<Story>, StoryError> {
            self.inner.read().await
        }
        async fn fetch(&self, id: StoryId) -> Result<Story, StoryError> {
            if id == self.poisoned {
                panic!("store exploded");
            }
            self.inner.fetch(id).await
        }
        async fn save(&self, story: &Story) -> Result<(), StoryError> {
            self.inner.save(story).await
        }
    }

    fn seeded(count: usize) -> (MemoryStoryRepository, Vec<StoryId>) {
        let repo = MemoryStoryRepository::new();
        let feed_id = repo.insert_feed("Example");
        let ids = (0..count)
            .map(|i| {
                repo.insert_story(&NewStory {
                    feed_id,
                    headline: format!("Story {}", i),
                    permalink: None,
                    body: String::new(),
                    published: i as i64,
                })
            })
            .collect();
        (repo, ids)
    }

    fn tokens(ids: &[StoryId]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_duplicates_collapse_in_order() {
        let job = MarkAllAsRead::new(["3", "1", "3", "2", "1"]);
        assert_eq!(job.story_ids(), ["3", "1", "2"]);
        assert_eq!(job.len(), 3);
    }

    #[tokio::test]
    async fn test_marks_every_story() {
        let (repo, ids) = seeded(3);
        let outcome = MarkAllAsRead::new(tokens(&ids)).mark_as_read(&repo).await;

        assert_eq!(
            outcome,
            MarkAllOutcome {
                marked: 3,
                skipped: 0,
                failed: 0
            }
        );
        assert!(repo.unread().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skips_unknown_and_malformed_ids() {
        let (repo, ids) = seeded(2);
        let mut request = tokens(&ids);
        request.push("999".to_string());
        request.push("ghost-id".to_string());

        let outcome = MarkAllAsRead::new(request).mark_as_read(&repo).await;
        assert_eq!(outcome.marked, 2);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(repo.read().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_save_does_not_stop_batch() {
        let (repo, ids) = seeded(5);
        repo.fail_saves_for(ids[1]);

        let outcome = MarkAllAsRead::new(tokens(&ids)).mark_as_read(&repo).await;
        assert_eq!(outcome.marked, 4);
        assert_eq!(outcome.failed, 1);
        assert_eq!(repo.save_count(), 5);

        let unread: Vec<StoryId> = repo.unread().await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(unread, vec![ids[1]]);
    }

    #[tokio::test]
    async fn test_rerun_is_harmless() {
        let (repo, ids) = seeded(3);
        let job = MarkAllAsRead::new(tokens(&ids));
        job.mark_as_read(&repo).await;
        let before = repo.read().await.unwrap();

        let outcome = job.mark_as_read(&repo).await;
        assert_eq!(outcome.marked, 3);
        assert_eq!(repo.read().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_empty_job() {
        let (repo, _ids) = seeded(1);
        let job = MarkAllAsRead::new(Vec::<String>::new());
        assert!(job.is_empty());
        assert_eq!(job.mark_as_read(&repo).await, MarkAllOutcome::default());
        assert_eq!(repo.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_panic_on_one_story_does_not_stop_batch() {
        let (inner, ids) = seeded(6);
        let repo = PanicOn {
            inner,
            poisoned: ids[0],
        };

        let outcome = MarkAllAsRead::new(tokens(&ids)).mark_as_read(&repo).await;
        assert_eq!(outcome.marked, 5);
        assert_eq!(outcome.failed, 1);
        assert_eq!(repo.inner.is_read(ids[0]), Some(false));
        for id in &ids[1..] {
            assert_eq!(repo.inner.is_read(*id), Some(true));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_job_runs_inside_spawned_task() {
        let (repo, ids) = seeded(3);
        let repo: Arc<dyn StoryRepository> = Arc::new(repo);
        let job = MarkAllAsRead::new(tokens(&ids));

        let task_repo = repo.clone();
        let outcome = tokio::spawn(async move { job.mark_as_read(task_repo.as_ref()).await })
            .await
            .unwrap();

        assert_eq!(outcome.marked, 3);
        assert!(repo.unread().await.unwrap().is_empty());
    }
}
