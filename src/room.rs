//! Live room membership
//!
//! The set of connections currently attached to a room. This is transport
//! state, separate from the persisted `RoomRecord`: it exists only while
//! someone is in the room.

use std::collections::HashSet;

use crate::types::ClientId;

/// Connections currently joined to one room
#[derive(Debug)]
pub struct Room {
    /// Room name (exact case, as persisted)
    pub name: String,
    /// Joined connections
    members: HashSet<ClientId>,
}

impl Room {
    /// Create an empty membership set for `name`
    pub fn new(name: String) -> Self {
        Self {
            name,
            members: HashSet::new(),
        }
    }

    /// Add a member; returns false if already present
    pub fn add(&mut self, client_id: ClientId) -> bool {
        self.members.insert(client_id)
    }

    /// Remove a member
    ///
    /// Returns true if the set is now empty and can be dropped.
    pub fn remove(&mut self, client_id: ClientId) -> bool {
        self.members.remove(&client_id);
        self.members.is_empty()
    }

    /// Check if a client is in this room
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.members.contains(&client_id)
    }

    /// Iterate over the joined connections
    pub fn members(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.members.iter().copied()
    }

    /// Get the number of joined connections
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_creation() {
        let room = Room::new("General".to_string());

        assert_eq!(room.name, "General");
        assert_eq!(room.member_count(), 0);
    }

    #[test]
    fn test_room_add_and_contains() {
        let a = ClientId::new();
        let b = ClientId::new();
        let mut room = Room::new("Dev".to_string());

        assert!(room.add(a));
        assert!(!room.add(a));
        assert!(room.contains(a));
        assert!(!room.contains(b));
        assert_eq!(room.member_count(), 1);
    }

    #[test]
    fn test_room_remove_reports_empty() {
        let a = ClientId::new();
        let b = ClientId::new();
        let mut room = Room::new("Dev".to_string());
        room.add(a);
        room.add(b);

        assert!(!room.remove(a));
        assert!(room.remove(b));
        // Removing an absent client is harmless
        assert!(room.remove(a));
    }

    #[test]
    fn test_room_members() {
        let a = ClientId::new();
        let b = ClientId::new();
        let mut room = Room::new("Dev".to_string());
        room.add(a);
        room.add(b);

        let mut members: Vec<_> = room.members().collect();
        members.sort_by_key(|id| id.0);
        let mut expected = vec![a, b];
        expected.sort_by_key(|id| id.0);
        assert_eq!(members, expected);
    }
}
