//! Event protocol definitions
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`, with
//! `data` omitted for events that carry nothing. Inbound payload fields are
//! all optional: a missing field is a silent drop decided by the router,
//! not a parse error.

use serde::{Deserialize, Serialize};

/// Client → Server event
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Post a chat message to a room
    Message { message: Option<ChatPayload> },
    /// Register a username for future attribution
    NewUsername { username: Option<String> },
    /// Create a room and join it
    CreateRoom { room_name: Option<String> },
    /// Join an existing room by exact name
    JoinRoom { room_name: Option<String> },
    /// Ask for the current room list
    ListRooms,
}

/// Inbound chat payload as sent by clients
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub message_text: Option<String>,
    pub room: Option<String>,
    pub username: Option<String>,
}

/// A chat line as delivered to clients, live or replayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLine {
    pub message_text: String,
    pub room: String,
    pub username: String,
}

/// Body of an outbound `message` event: a server notice or a chat line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageBody {
    Notice(String),
    Chat(ChatLine),
}

/// Server → Client event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Server notice or chat line
    Message { message: MessageBody },
    /// Full list of room names
    Rooms { rooms: Vec<String> },
    /// The receiving connection is now in `room`
    RoomJoined { room: String },
    /// Discard locally rendered history before a replay
    ClearRoomHistory,
}

impl ServerMessage {
    /// Plain-text server notice
    pub fn notice(text: impl Into<String>) -> Self {
        Self::Message {
            message: MessageBody::Notice(text.into()),
        }
    }

    /// Chat line event
    pub fn chat(line: ChatLine) -> Self {
        Self::Message {
            message: MessageBody::Chat(line),
        }
    }
}
