//! Room registry
//!
//! Creation with case-insensitive uniqueness, exact-name lookup, and listing
//! over the persisted rooms.

use tracing::{info, warn};

use crate::db::{Database, DbError, RoomRecord};

/// Result of a create-room request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Room was inserted
    Created(RoomRecord),
    /// A room with the same name ignoring case exists; carries the requested name
    Duplicate(String),
    /// Insert failed and was rolled back; carries the error detail
    Failed(String),
    /// Name was empty after trimming
    Ignored,
}

/// Registry over persisted rooms
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    db: Database,
}

impl RoomRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a room named `name` (trimmed)
    ///
    /// The pre-check catches the common duplicate; the store's unique
    /// constraint catches a concurrent one that slipped past it.
    pub async fn create_room(&self, name: &str) -> CreateOutcome {
        let name = name.trim();
        if name.is_empty() {
            return CreateOutcome::Ignored;
        }

        if let Some(rejected) = self.check_available(name).await {
            return rejected;
        }
        self.insert_checked(name).await
    }

    /// Case-insensitive pre-check; `None` when `name` looks free
    pub(crate) async fn check_available(&self, name: &str) -> Option<CreateOutcome> {
        match self.db.rooms().find_by_name_nocase(name).await {
            Ok(Some(existing)) => {
                info!("Room '{}' rejected, '{}' already exists", name, existing.name);
                Some(CreateOutcome::Duplicate(name.to_string()))
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Room lookup for '{}' failed: {}", name, e);
                Some(CreateOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Insert after a passed pre-check
    ///
    /// Another writer may have taken the name since; the unique constraint
    /// turns that into a `Failed` outcome.
    pub(crate) async fn insert_checked(&self, name: &str) -> CreateOutcome {
        match self.db.rooms().insert(name).await {
            Ok(room) => {
                info!("Room '{}' created (id {})", room.name, room.id);
                CreateOutcome::Created(room)
            }
            Err(e @ DbError::RoomExists(_)) => {
                warn!("Room '{}' lost a concurrent create: {}", name, e);
                CreateOutcome::Failed(e.to_string())
            }
            Err(e) => {
                warn!("Room '{}' insert failed: {}", name, e);
                CreateOutcome::Failed(e.to_string())
            }
        }
    }

    /// Find a room by exact name
    pub async fn find_room(&self, name: &str) -> Result<Option<RoomRecord>, DbError> {
        self.db.rooms().find_by_name(name).await
    }

    /// All room names in insertion order
    pub async fn list_rooms(&self) -> Result<Vec<String>, DbError> {
        self.db.rooms().list_names().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_ROOM;

    async fn registry() -> RoomRegistry {
        RoomRegistry::new(Database::connect(":memory:").await.unwrap())
    }

    #[tokio::test]
    async fn test_create_trims_name() {
        let registry = registry().await;

        let outcome = registry.create_room("  Dev  ").await;
        match outcome {
            CreateOutcome::Created(room) => assert_eq!(room.name, "Dev"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(registry.find_room("Dev").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_blank_name_is_ignored() {
        let registry = registry().await;

        assert_eq!(registry.create_room("   ").await, CreateOutcome::Ignored);
        assert_eq!(registry.create_room("").await, CreateOutcome::Ignored);
        assert_eq!(registry.list_rooms().await.unwrap(), vec![DEFAULT_ROOM]);
    }

    #[tokio::test]
    async fn test_case_variant_is_duplicate() {
        let registry = registry().await;

        assert!(matches!(
            registry.create_room("Ops").await,
            CreateOutcome::Created(_)
        ));
        assert_eq!(
            registry.create_room("ops").await,
            CreateOutcome::Duplicate("ops".to_string())
        );
        assert_eq!(
            registry.create_room("general").await,
            CreateOutcome::Duplicate("general".to_string())
        );

        assert_eq!(
            registry.list_rooms().await.unwrap(),
            vec!["General".to_string(), "Ops".to_string()]
        );
    }

    #[tokio::test]
    async fn test_find_room_is_exact_case() {
        let registry = registry().await;
        registry.create_room("Dev").await;

        assert!(registry.find_room("Dev").await.unwrap().is_some());
        assert!(registry.find_room("dev").await.unwrap().is_none());
        assert!(registry.find_room("Nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_after_stale_check_fails_distinctly() {
        let registry = registry().await;

        assert_eq!(registry.check_available("Race").await, None);
        registry.db.rooms().insert("RACE").await.unwrap();

        assert_eq!(
            registry.insert_checked("Race").await,
            CreateOutcome::Failed("room already exists: Race".to_string())
        );
        let names = registry.list_rooms().await.unwrap();
        assert_eq!(names, vec!["General".to_string(), "RACE".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_keep_one_room() {
        let registry = registry().await;

        let (a, b) = tokio::join!(registry.create_room("Race"), registry.create_room("RACE"));

        let created = [&a, &b]
            .iter()
            .filter(|o| matches!(o, CreateOutcome::Created(_)))
            .count();
        assert_eq!(created, 1);

        let names = registry.list_rooms().await.unwrap();
        assert_eq!(
            names.iter().filter(|n| n.eq_ignore_ascii_case("race")).count(),
            1
        );
    }
}
