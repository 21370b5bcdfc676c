use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::util::{strip_control_chars, truncate_to_width};

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of readmark appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_error(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface as
/// one of these messages.
pub(crate) fn is_lock_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

/// Errors raised by story reads and writes.
///
/// `NotFound` is surfaced to single-item callers and skipped by bulk jobs.
/// `Persistence` covers an unavailable store or a rejected write.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("Story {0} not found")]
    NotFound(StoryId),

    #[error("Failed to persist story state: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl StoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoryError::NotFound(_))
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque story identifier.
///
/// Backed by the row id, but callers only ever see it as a token: request
/// layers hand over strings and `parse` decides whether they can name a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StoryId(pub(crate) i64);

impl StoryId {
    /// Parse a request token. Tokens that can never resolve return `None`.
    pub fn parse(token: &str) -> Option<Self> {
        token.trim().parse::<i64>().ok().filter(|id| *id > 0).map(StoryId)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for StoryId {
    fn from(id: i64) -> Self {
        StoryId(id)
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for Story queries (used by sqlx FromRow)
/// Converts to Story via into_story() with Arc wrapping
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StoryDbRow {
    pub id: i64,
    pub feed_id: i64,
    pub source: String,
    pub headline: String,
    pub permalink: Option<String>,
    pub body: String,
    pub published: i64,
    pub is_read: bool,
}

impl StoryDbRow {
    pub(crate) fn into_story(self) -> Story {
        Story {
            id: StoryId(self.id),
            feed_id: self.feed_id,
            source: Arc::from(strip_control_chars(&self.source)),
            headline: Arc::from(strip_control_chars(&self.headline)),
            permalink: self.permalink,
            body: Arc::from(self.body),
            published: self.published,
            is_read: self.is_read,
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// Display width of `Story::lead()`.
const LEAD_WIDTH: usize = 100;

/// A single ingested content item with a read/unread state.
///
/// `is_read` is the only field this crate changes; everything else is set at
/// ingestion time. Text fields use `Arc<str>` so listings clone cheaply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Story {
    pub id: StoryId,
    /// Owning feed. Relation only; stories never load or mutate their feed.
    pub feed_id: i64,
    pub source: Arc<str>,
    pub headline: Arc<str>,
    pub permalink: Option<String>,
    #[serde(skip_serializing)]
    pub body: Arc<str>,
    /// Unix seconds
    pub published: i64,
    pub is_read: bool,
}

impl Story {
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.published, 0)
    }

    /// Short single-line prefix of the body for list views.
    pub fn lead(&self) -> String {
        let clean = strip_control_chars(&self.body);
        let flat = clean.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate_to_width(&flat, LEAD_WIDTH).into_owned()
    }
}

/// Ingestion-side shape of a story. Inserted stories always start unread.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub feed_id: i64,
    pub headline: String,
    pub permalink: Option<String>,
    pub body: String,
    pub published: i64,
}
