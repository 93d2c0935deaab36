use crate::{
    error::{AppError, Result},
    models::comment::*,
    services::Database,
    utils::clock::Clock,
};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;
use tracing::{debug, info};

const COMMENT_COLUMNS: &str = "id, contentobject_id, language_id, created, modified, user_id, \
    session_key, ip, parent_comment_id, name, email, url, title, text, status";

/// Store for the `comment` table and the `content_language` lookup.
#[derive(Clone)]
pub struct CommentService {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl CommentService {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Comments of one content item with the given status.
    pub async fn list_comments(
        &self,
        content_id: i64,
        options: SortOptions,
        status: CommentStatus,
    ) -> Result<Vec<Comment>> {
        let pool = self.db.pool()?;
        debug!(
            "Listing comments for content {} ordered by {} {}",
            content_id,
            options.sort.order_expr(),
            options.order.keyword()
        );

        // 排序列和方向只来自枚举，不拼接用户输入
        let query = format!(
            "SELECT {} FROM comment WHERE contentobject_id = ? AND status = ? ORDER BY {} {}, id {}",
            COMMENT_COLUMNS,
            options.sort.order_expr(),
            options.order.keyword(),
            options.order.keyword()
        );

        let rows = sqlx::query(&query)
            .bind(content_id)
            .bind(status.as_i64())
            .fetch_all(pool)
            .await?;

        rows.iter().map(comment_from_row).collect()
    }

    pub async fn insert_comment(&self, comment: NewComment) -> Result<i64> {
        let pool = self.db.pool()?;
        let now = self.clock.now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO comment (
                language_id, created, modified, user_id, session_key, ip,
                contentobject_id, parent_comment_id, name, email, url, text, status, title
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?, '', ?, ?, '')
            "#,
        )
        .bind(comment.language_id)
        .bind(now)
        .bind(now)
        .bind(comment.user_id)
        .bind(&comment.session_key)
        .bind(&comment.ip)
        .bind(comment.content_id)
        .bind(&comment.name)
        .bind(&comment.email)
        .bind(&comment.text)
        .bind(comment.status.as_i64())
        .execute(pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            "Inserted comment {} on content {} with status {:?}",
            id, comment.content_id, comment.status
        );
        Ok(id)
    }

    /// Moves a WAITING comment to `status` (ACCEPT or REJECTED); returns
    /// whether a row changed.
    ///
    /// The status guard lives in the UPDATE itself, so of two racing calls
    /// only the first one affects the row.
    pub async fn update_status_if_waiting(
        &self,
        comment_id: i64,
        status: CommentStatus,
    ) -> Result<bool> {
        let pool = self.db.pool()?;
        if status == CommentStatus::Waiting {
            return Err(AppError::bad_request(
                "A waiting comment can only move to accept or rejected",
            ));
        }

        let result = sqlx::query("UPDATE comment SET status = ? WHERE id = ? AND status = ?")
            .bind(status.as_i64())
            .bind(comment_id)
            .bind(CommentStatus::Waiting.as_i64())
            .execute(pool)
            .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            info!("Comment {} moved to {:?}", comment_id, status);
        } else {
            debug!("Comment {} was not waiting, status left unchanged", comment_id);
        }
        Ok(updated)
    }

    pub async fn count_accepted(&self, content_id: i64) -> Result<i64> {
        let pool = self.db.pool()?;

        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM comment WHERE contentobject_id = ? AND status = ?",
        )
        .bind(content_id)
        .bind(CommentStatus::Accept.as_i64())
        .fetch_one(pool)
        .await?;

        Ok(row.get::<i64, _>("total"))
    }

    /// Most recent accepted comments across all content, newest first.
    pub async fn list_recent_comments(&self, limit: i64) -> Result<Vec<Comment>> {
        let pool = self.db.pool()?;

        let query = format!(
            "SELECT {} FROM comment WHERE status = ? ORDER BY created DESC, id DESC LIMIT ?",
            COMMENT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(CommentStatus::Accept.as_i64())
            .bind(limit)
            .fetch_all(pool)
            .await?;

        rows.iter().map(comment_from_row).collect()
    }

    pub async fn list_recent_comments_by_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Comment>> {
        let pool = self.db.pool()?;

        let query = format!(
            "SELECT {} FROM comment WHERE status = ? AND user_id = ? \
             ORDER BY created DESC, id DESC LIMIT ?",
            COMMENT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(CommentStatus::Accept.as_i64())
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await?;

        rows.iter().map(comment_from_row).collect()
    }

    /// Language id for a store locale code, or 0 when the locale is unknown.
    pub async fn lookup_language_id(&self, locale: &str) -> Result<i64> {
        let pool = self.db.pool()?;

        let row = sqlx::query("SELECT id FROM content_language WHERE locale = ?")
            .bind(locale)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|row| row.get::<i64, _>("id")).unwrap_or(0))
    }

    /// Adds a locale to the lookup table if missing and returns its id.
    pub async fn register_language(&self, locale: &str) -> Result<i64> {
        let pool = self.db.pool()?;

        sqlx::query("INSERT OR IGNORE INTO content_language (locale) VALUES (?)")
            .bind(locale)
            .execute(pool)
            .await?;

        self.lookup_language_id(locale).await
    }

    /// Whether a WAITING comment matches all three keys.
    pub async fn exists_waiting_comment(
        &self,
        content_id: i64,
        session_key: &str,
        comment_id: i64,
    ) -> Result<bool> {
        let pool = self.db.pool()?;

        let row = sqlx::query(
            r#"
            SELECT id FROM comment
            WHERE contentobject_id = ? AND session_key = ? AND status = ? AND id = ?
            "#,
        )
        .bind(content_id)
        .bind(session_key)
        .bind(CommentStatus::Waiting.as_i64())
        .bind(comment_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.is_some())
    }

    pub async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>> {
        let pool = self.db.pool()?;

        let query = format!("SELECT {} FROM comment WHERE id = ?", COMMENT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(comment_id)
            .fetch_optional(pool)
            .await?;

        row.as_ref().map(comment_from_row).transpose()
    }
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment> {
    let status: i64 = row.get("status");
    let status = CommentStatus::from_i64(status)
        .ok_or_else(|| AppError::Internal(format!("Unknown comment status {}", status)))?;

    Ok(Comment {
        id: row.get("id"),
        content_id: row.get("contentobject_id"),
        language_id: row.get("language_id"),
        created: timestamp(row.get("created"))?,
        modified: timestamp(row.get("modified"))?,
        user_id: row.get("user_id"),
        session_key: row.get("session_key"),
        ip: row.get("ip"),
        parent_comment_id: row.get("parent_comment_id"),
        name: row.get("name"),
        email: row.get("email"),
        url: row.get("url"),
        title: row.get("title"),
        text: row.get("text"),
        status,
    })
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| AppError::Internal(format!("Invalid timestamp {}", secs)))
}
