//! Message repository

use sqlx::SqlitePool;

use super::{now_millis, DbError};
use crate::types::ANONYMOUS;

/// A message as replayed to a joining client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: i64,
    pub content: String,
    /// Author username, or "Anonymous" when the user row is missing
    pub username: String,
    pub timestamp: i64,
}

/// Repository for message operations
pub struct MessageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MessageRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message to a room's log
    ///
    /// The timestamp is clamped so it never falls behind the newest stored
    /// message, even if the wall clock steps backwards. The `MAX(timestamp)`
    /// lookup is served by `idx_messages_timestamp`. Returns `(id, timestamp)`.
    pub async fn insert(
        &self,
        content: &str,
        user_id: i64,
        room_id: i64,
    ) -> Result<(i64, i64), DbError> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            r#"
            INSERT INTO messages (content, user_id, room_id, timestamp)
            VALUES (?, ?, ?, MAX(?, COALESCE((SELECT MAX(timestamp) FROM messages), 0)))
            RETURNING id, timestamp
            "#,
        )
        .bind(content)
        .bind(user_id)
        .bind(room_id)
        .bind(now_millis())
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// The `limit` most recent messages of a room, oldest first
    pub async fn recent(&self, room_id: i64, limit: i64) -> Result<Vec<StoredMessage>, DbError> {
        let rows = sqlx::query_as::<_, (i64, String, Option<String>, i64)>(
            r#"
            SELECT m.id, m.content, u.username, m.timestamp
            FROM messages m
            LEFT JOIN users u ON u.id = m.user_id
            WHERE m.room_id = ?
            ORDER BY m.timestamp DESC, m.id DESC
            LIMIT ?
            "#,
        )
        .bind(room_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .rev()
            .map(|(id, content, username, timestamp)| StoredMessage {
                id,
                content,
                username: username.unwrap_or_else(|| ANONYMOUS.to_string()),
                timestamp,
            })
            .collect())
    }
}
