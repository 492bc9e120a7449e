//! Persistence store
//!
//! Async SQLite access through SQLx for users, rooms, and messages.
//! The `Database` handle is opened once at startup, cloned into whoever
//! needs it, and closed at shutdown.

mod messages;
mod rooms;
mod users;

pub use messages::{MessageRepository, StoredMessage};
pub use rooms::{RoomRecord, RoomRepository};
pub use users::{User, UserRepository};

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::DEFAULT_ROOM;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Database errors
#[derive(Debug, Error)]
pub enum DbError {
    /// Query or connection failure
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Embedded migration failure
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Insert rejected by the case-insensitive unique constraint on room names
    #[error("room already exists: {0}")]
    RoomExists(String),
}

/// Database handle with connection pool
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open the store at `path`, apply migrations and seed the default room
    ///
    /// `":memory:"` opens a private in-memory database.
    pub async fn connect(path: &str) -> Result<Self, DbError> {
        let pool = if path == ":memory:" {
            // Each call gets its own shared-cache name so parallel tests never collide.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let uri = format!(
                "file:roomchat-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&uri)
                .shared_cache(true)
                .create_if_missing(true)
                .foreign_keys(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        warn!(
                            path = %parent.display(),
                            error = %e,
                            "Failed to create database directory"
                        );
                    }
                }
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .foreign_keys(true);

            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?;

            sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
            pool
        };

        info!(path = %path, "Database connected");

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations checked/applied");

        let db = Self { pool };
        db.rooms().ensure(DEFAULT_ROOM).await?;

        Ok(db)
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database closed");
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get user repository
    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }

    /// Get room repository
    pub fn rooms(&self) -> RoomRepository<'_> {
        RoomRepository::new(&self.pool)
    }

    /// Get message repository
    pub fn messages(&self) -> MessageRepository<'_> {
        MessageRepository::new(&self.pool)
    }
}

/// Current server time in milliseconds since the Unix epoch
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_seeds_default_room() {
        let db = Database::connect(":memory:").await.unwrap();

        let names = db.rooms().list_names().await.unwrap();
        assert_eq!(names, vec![DEFAULT_ROOM.to_string()]);
    }

    #[tokio::test]
    async fn test_default_room_survives_restarts() {
        let path = std::env::temp_dir()
            .join(format!("roomchat-test-{}.db", uuid::Uuid::new_v4()));
        let path = path.to_string_lossy().into_owned();

        for _ in 0..3 {
            let db = Database::connect(&path).await.unwrap();
            db.close().await;
        }

        let db = Database::connect(&path).await.unwrap();
        let names = db.rooms().list_names().await.unwrap();
        let generals = names
            .iter()
            .filter(|n| n.eq_ignore_ascii_case(DEFAULT_ROOM))
            .count();
        assert_eq!(generals, 1);
        db.close().await;

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(format!("{path}-wal"));
        let _ = std::fs::remove_file(format!("{path}-shm"));
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::connect(":memory:").await.unwrap();
        let b = Database::connect(":memory:").await.unwrap();

        a.rooms().insert("OnlyInA").await.unwrap();

        assert!(a.rooms().find_by_name("OnlyInA").await.unwrap().is_some());
        assert!(b.rooms().find_by_name("OnlyInA").await.unwrap().is_none());
    }
}
