//! Connection session
//!
//! Per-connection state owned by the `ChatServer`: the outbound channel and
//! the room the connection is currently attached to. Discarded on disconnect.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Connected client session
///
/// Holds zero or one room at any instant; only the join and leave
/// operations below change it.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
    /// Room the client is currently attached to
    room: Option<String>,
}

impl Client {
    /// Create a new client with the given ID and sender channel
    pub fn new(id: ClientId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            sender,
            room: None,
        }
    }

    /// Queue a message for this client without waiting
    ///
    /// Fails with `QueueFull` when the client has stopped draining its queue,
    /// and with `ChannelClosed` once its connection is gone.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Name of the room this client is in, if any
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    /// Check if this client is attached to `room`
    pub fn is_in(&self, room: &str) -> bool {
        self.room.as_deref() == Some(room)
    }

    /// Attach to `room`, returning the room left (if any)
    pub fn join(&mut self, room: String) -> Option<String> {
        self.room.replace(room)
    }

    /// Detach from the current room
    pub fn leave(&mut self) -> Option<String> {
        self.room.take()
    }
}
