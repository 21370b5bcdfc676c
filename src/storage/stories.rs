use super::schema::Database;
use super::types::{NewStory, Story, StoryDbRow, StoryError, StoryId};

/// Shared projection for every story query. `source` is the owning feed's name.
const STORY_COLUMNS: &str = r#"
    SELECT s.id, s.feed_id, f.name AS source, s.headline, s.permalink, s.body,
           s.published, s.is_read
    FROM stories s
    JOIN feeds f ON s.feed_id = f.id
"#;

impl Database {
    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Insert or rename a feed, returning its id.
    pub async fn insert_feed(&self, name: &str, url: &str) -> Result<i64, StoryError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO feeds (name, url) VALUES (?, ?)
            ON CONFLICT(url) DO UPDATE SET name = excluded.name
            RETURNING id
        "#,
        )
        .bind(name)
        .bind(url)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Insert a freshly ingested story. New stories always start unread.
    pub async fn insert_story(&self, story: &NewStory) -> Result<StoryId, StoryError> {
        let now = chrono::Utc::now().timestamp();
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO stories (feed_id, headline, permalink, body, published, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            RETURNING id
        "#,
        )
        .bind(story.feed_id)
        .bind(&story.headline)
        .bind(&story.permalink)
        .bind(&story.body)
        .bind(story.published)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(StoryId(id))
    }

    // ========================================================================
    // Story Queries
    // ========================================================================

    /// Every story with the given read flag, newest first. Never truncated.
    ///
    /// Ties on `published` fall back to id so page boundaries are stable.
    pub(crate) async fn stories_by_read_state(&self, is_read: bool) -> Result<Vec<Story>, StoryError> {
        let sql = format!(
            "{STORY_COLUMNS} WHERE s.is_read = ? ORDER BY s.published DESC, s.id DESC"
        );
        let rows = sqlx::query_as::<_, StoryDbRow>(&sql)
            .bind(is_read)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(StoryDbRow::into_story).collect())
    }

    pub(crate) async fn story_by_id(&self, id: StoryId) -> Result<Story, StoryError> {
        let sql = format!("{STORY_COLUMNS} WHERE s.id = ?");
        let row = sqlx::query_as::<_, StoryDbRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(StoryDbRow::into_story)
            .ok_or(StoryError::NotFound(id))
    }

    /// Write the story's read flag back. Only `is_read` is ever persisted here.
    pub(crate) async fn update_read_state(&self, story: &Story) -> Result<(), StoryError> {
        let result = sqlx::query("UPDATE stories SET is_read = ? WHERE id = ?")
            .bind(story.is_read)
            .bind(story.id.0)
            .execute(&self.pool)
            .await?;

        // SQLite counts matched rows, so an unchanged flag still reports 1.
        if result.rows_affected() == 0 {
            return Err(StoryError::NotFound(story.id));
        }
        Ok(())
    }

    /// Number of stories with the given read flag.
    pub async fn count_stories(&self, is_read: bool) -> Result<i64, StoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stories WHERE is_read = ?")
            .bind(is_read)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
