//! User repository

use sqlx::SqlitePool;

use super::{now_millis, DbError};

/// Persisted user row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: i64,
}

/// Repository for user operations
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve a user by username, creating it if absent
    ///
    /// A single upsert statement, so two first-time senders with the same
    /// name always resolve to the same row.
    pub async fn upsert(&self, username: &str) -> Result<User, DbError> {
        let (id, username, created_at) = sqlx::query_as::<_, (i64, String, i64)>(
            r#"
            INSERT INTO users (username, created_at) VALUES (?, ?)
            ON CONFLICT(username) DO UPDATE SET username = excluded.username
            RETURNING id, username, created_at
            "#,
        )
        .bind(username)
        .bind(now_millis())
        .fetch_one(self.pool)
        .await?;

        Ok(User {
            id,
            username,
            created_at,
        })
    }

    /// Find a user by exact username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, (i64, String, i64)>(
            "SELECT id, username, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, username, created_at)| User {
            id,
            username,
            created_at,
        }))
    }
}
