//! The four operations the request layer calls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::jobs::{JobQueue, MarkAllAsRead, QueueError};
use crate::pagination::{Page, Paginator};
use crate::read_state::ReadStateService;
use crate::storage::{Story, StoryError, StoryId, StoryRepository};

/// Returned as soon as a bulk job is queued, before any story changes.
#[derive(Debug, Clone, Serialize)]
pub struct Acknowledgement {
    /// Distinct ids handed to the job.
    pub accepted: usize,
    pub requested_at: DateTime<Utc>,
}

pub struct Reader {
    repository: Arc<dyn StoryRepository>,
    paginator: Paginator,
    read_state: ReadStateService,
    jobs: JobQueue,
}

impl Reader {
    /// Must be called inside a tokio runtime; starts the job workers.
    pub fn new(repository: Arc<dyn StoryRepository>, config: &Config) -> Self {
        let jobs = JobQueue::start(repository.clone(), config.workers, config.queue_capacity);
        Self {
            paginator: Paginator::new(config.page_size),
            read_state: ReadStateService::new(repository.clone()),
            repository,
            jobs,
        }
    }

    pub async fn list_unread(&self) -> Result<Vec<Story>, StoryError> {
        self.repository.unread().await
    }

    /// One archive page, 1-based. Out-of-range pages come back empty.
    pub async fn list_read(&self, page: usize) -> Result<Page<Story>, StoryError> {
        let stories = self.repository.read().await?;
        Ok(self.paginator.paginate(stories, page))
    }

    pub async fn set_read_state(&self, id: StoryId, is_read: bool) -> Result<Story, StoryError> {
        self.read_state.set_read_state(id, is_read).await
    }

    /// Queue a bulk mark-as-read and return without waiting for it.
    pub fn enqueue_mark_all_as_read<I, S>(&self, story_ids: I) -> Result<Acknowledgement, QueueError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let job = MarkAllAsRead::new(story_ids);
        let ack = Acknowledgement {
            accepted: job.len(),
            requested_at: job.requested_at(),
        };
        self.jobs.submit(job)?;
        Ok(ack)
    }

    /// Stop taking bulk jobs and wait for queued ones to finish.
    pub async fn shutdown(self) {
        self.jobs.shutdown().await;
    }
}
