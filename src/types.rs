//! Basic type definitions for the chat server
//!
//! - `ClientId`: UUID-based unique connection identifier
//! - well-known names shared by the store and the router

use uuid::Uuid;

/// Room every new connection joins automatically
pub const DEFAULT_ROOM: &str = "General";

/// Author name used when a message carries no username
pub const ANONYMOUS: &str = "Anonymous";

/// Number of messages replayed to a client when it joins a room
pub const HISTORY_LIMIT: usize = 50;

/// Unique client identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe connection identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_unique() {
        let id1 = ClientId::new();
        let id2 = ClientId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_client_id_display_is_uuid() {
        let id = ClientId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}
