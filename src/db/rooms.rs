//! Room repository

use sqlx::SqlitePool;

use super::{now_millis, DbError};

/// Persisted room row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

/// Repository for room operations
pub struct RoomRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RoomRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new room inside a transaction
    ///
    /// A name colliding case-insensitively with an existing room fails with
    /// `DbError::RoomExists`; any failure rolls the transaction back.
    pub async fn insert(&self, name: &str) -> Result<RoomRecord, DbError> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO rooms (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(now)
            .execute(&mut *tx)
            .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                tx.rollback().await?;
                return Err(DbError::RoomExists(name.to_string()));
            }
            Err(e) => {
                tx.rollback().await?;
                return Err(e.into());
            }
        };

        tx.commit().await?;

        Ok(RoomRecord {
            id,
            name: name.to_string(),
            created_at: now,
        })
    }

    /// Insert the room unless a case-insensitive match already exists
    pub async fn ensure(&self, name: &str) -> Result<(), DbError> {
        sqlx::query("INSERT OR IGNORE INTO rooms (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(now_millis())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Find a room by exact, case-sensitive name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<RoomRecord>, DbError> {
        let row = sqlx::query_as::<_, (i64, String, i64)>(
            "SELECT id, name, created_at FROM rooms WHERE name = ? COLLATE BINARY",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, name, created_at)| RoomRecord {
            id,
            name,
            created_at,
        }))
    }

    /// Find a room whose name matches ignoring case
    pub async fn find_by_name_nocase(&self, name: &str) -> Result<Option<RoomRecord>, DbError> {
        let row = sqlx::query_as::<_, (i64, String, i64)>(
            "SELECT id, name, created_at FROM rooms WHERE name = ? COLLATE NOCASE",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, name, created_at)| RoomRecord {
            id,
            name,
            created_at,
        }))
    }

    /// All room names in insertion order
    pub async fn list_names(&self) -> Result<Vec<String>, DbError> {
        let names = sqlx::query_scalar::<_, String>("SELECT name FROM rooms ORDER BY id")
            .fetch_all(self.pool)
            .await?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    use super::*;

    #[tokio::test]
    async fn test_insert_and_find_exact() {
        let db = Database::connect(":memory:").await.unwrap();

        let room = db.rooms().insert("Dev").await.unwrap();
        assert_eq!(room.name, "Dev");

        let found = db.rooms().find_by_name("Dev").await.unwrap().unwrap();
        assert_eq!(found.id, room.id);

        // Exact lookup does not fold case
        assert!(db.rooms().find_by_name("dev").await.unwrap().is_none());
        assert!(db.rooms().find_by_name_nocase("dEV").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unique_constraint_ignores_case() {
        let db = Database::connect(":memory:").await.unwrap();

        db.rooms().insert("Ops").await.unwrap();
        let err = db.rooms().insert("OPS").await.unwrap_err();

        assert!(matches!(err, DbError::RoomExists(ref name) if name == "OPS"));

        let names = db.rooms().list_names().await.unwrap();
        assert_eq!(
            names.iter().filter(|n| n.eq_ignore_ascii_case("ops")).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let db = Database::connect(":memory:").await.unwrap();

        db.rooms().ensure("General").await.unwrap();
        db.rooms().ensure("general").await.unwrap();

        assert_eq!(db.rooms().list_names().await.unwrap(), vec!["General"]);
    }

    #[tokio::test]
    async fn test_list_names_insertion_order() {
        let db = Database::connect(":memory:").await.unwrap();

        db.rooms().insert("Zeta").await.unwrap();
        db.rooms().insert("Alpha").await.unwrap();

        assert_eq!(
            db.rooms().list_names().await.unwrap(),
            vec!["General", "Zeta", "Alpha"]
        );
    }
}
