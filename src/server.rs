//! ChatServer actor implementation
//!
//! The message router. Owns every connection session and the live room
//! membership index, validates inbound events, writes through to the store,
//! and fans results out. Commands are handled one at a time to completion,
//! so no locks are needed around session state.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::client::Client;
use crate::db::{Database, RoomRecord};
use crate::error::SendError;
use crate::message::{ChatLine, ChatPayload, ServerMessage};
use crate::registry::{CreateOutcome, RoomRegistry};
use crate::room::Room;
use crate::types::{ClientId, ANONYMOUS, DEFAULT_ROOM, HISTORY_LIMIT};

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected
    Connect {
        client_id: ClientId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Client disconnected
    Disconnect { client_id: ClientId },
    /// Post a chat message
    PostMessage {
        client_id: ClientId,
        payload: Option<ChatPayload>,
    },
    /// Register a username
    ChangeUsername {
        client_id: ClientId,
        username: Option<String>,
    },
    /// Create a room and join it
    CreateRoom {
        client_id: ClientId,
        room_name: Option<String>,
    },
    /// Join an existing room
    JoinRoom {
        client_id: ClientId,
        room_name: Option<String>,
    },
    /// Send the room list to this client
    ListRooms { client_id: ClientId },
}

impl ServerCommand {
    /// Session a command acts on; `None` for `Connect`, which creates one
    fn session(&self) -> Option<ClientId> {
        match self {
            ServerCommand::Connect { .. } => None,
            ServerCommand::Disconnect { client_id }
            | ServerCommand::PostMessage { client_id, .. }
            | ServerCommand::ChangeUsername { client_id, .. }
            | ServerCommand::CreateRoom { client_id, .. }
            | ServerCommand::JoinRoom { client_id, .. }
            | ServerCommand::ListRooms { client_id } => Some(*client_id),
        }
    }
}

/// The main ChatServer actor
pub struct ChatServer {
    /// All connected clients: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// Live membership: room name -> joined connections
    rooms: HashMap<String, Room>,
    /// Persisted rooms
    registry: RoomRegistry,
    /// Persistence store
    db: Database,
    /// Messages replayed on join
    history_limit: usize,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer over an opened store
    pub fn new(receiver: mpsc::Receiver<ServerCommand>, db: Database) -> Self {
        Self {
            clients: HashMap::new(),
            rooms: HashMap::new(),
            registry: RoomRegistry::new(db.clone()),
            db,
            history_limit: HISTORY_LIMIT,
            receiver,
        }
    }

    /// Override how many messages are replayed on join
    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    ///
    /// Commands from a client without a live session (already disconnected
    /// or dropped) are discarded.
    async fn handle_command(&mut self, cmd: ServerCommand) {
        if let Some(client_id) = cmd.session() {
            if !self.clients.contains_key(&client_id) {
                debug!("Dropping command from unknown client {}", client_id);
                return;
            }
        }

        match cmd {
            ServerCommand::Connect { client_id, sender } => {
                self.handle_connect(client_id, sender).await;
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
            ServerCommand::PostMessage { client_id, payload } => {
                self.handle_post_message(client_id, payload).await;
            }
            ServerCommand::ChangeUsername { client_id, username } => {
                self.handle_change_username(client_id, username).await;
            }
            ServerCommand::CreateRoom { client_id, room_name } => {
                self.handle_create_room(client_id, room_name).await;
            }
            ServerCommand::JoinRoom { client_id, room_name } => {
                self.handle_join_room(client_id, room_name).await;
            }
            ServerCommand::ListRooms { client_id } => {
                self.handle_list_rooms(client_id).await;
            }
        }
    }

    /// Handle new client connection: ack, room list, then auto-join General
    async fn handle_connect(&mut self, client_id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        info!("Client {} connected", client_id);
        self.clients.insert(client_id, Client::new(client_id, sender));

        self.send_to(client_id, ServerMessage::notice("Connected to server"));
        self.handle_list_rooms(client_id).await;

        match self.registry.find_room(DEFAULT_ROOM).await {
            Ok(Some(general)) => {
                self.enter_room(client_id, &general).await;
                let joined = ServerMessage::notice(format!("Joined room: {}", general.name));
                self.send_to(client_id, joined);
                self.send_to(client_id, ServerMessage::RoomJoined { room: general.name });
            }
            Ok(None) => warn!("Default room '{}' is missing", DEFAULT_ROOM),
            Err(e) => error!("Failed to load default room for {}: {}", client_id, e),
        }

        debug!(
            "Total clients: {}, Active rooms: {}",
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Handle client disconnection: drop the session and its membership
    fn handle_disconnect(&mut self, client_id: ClientId) {
        let room = self.clients.get(&client_id).and_then(|c| c.room().map(str::to_string));
        info!("Client {} disconnected (room: {:?})", client_id, room);

        self.leave_all(client_id);
        self.clients.remove(&client_id);

        debug!(
            "Total clients: {}, Active rooms: {}",
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Handle a chat message: persist, then fan out to the room
    async fn handle_post_message(&mut self, client_id: ClientId, payload: Option<ChatPayload>) {
        let Some(ChatPayload {
            message_text,
            room,
            username,
        }) = payload
        else {
            return;
        };
        let (Some(room_name), Some(text)) = (room, message_text) else {
            debug!("Dropping message from {} without room or text", client_id);
            return;
        };

        let room = match self.registry.find_room(&room_name).await {
            Ok(Some(room)) => room,
            Ok(None) => {
                debug!("Dropping message from {} to unknown room '{}'", client_id, room_name);
                return;
            }
            Err(e) => {
                error!("Room lookup for '{}' failed: {}", room_name, e);
                return;
            }
        };

        let username = username.unwrap_or_else(|| ANONYMOUS.to_string());

        let stored = async {
            let user = self.db.users().upsert(&username).await?;
            self.db.messages().insert(&text, user.id, room.id).await
        }
        .await;

        if let Err(e) = stored {
            error!("Failed to store message from {} in '{}': {}", client_id, room.name, e);
            self.send_to(client_id, ServerMessage::notice("Message failed to send"));
            return;
        }

        debug!("Client {} posted to '{}' as '{}'", client_id, room.name, username);

        let line = ChatLine {
            message_text: text,
            room: room.name.clone(),
            username,
        };
        self.broadcast_room(&room.name, ServerMessage::chat(line));
    }

    /// Handle username registration
    async fn handle_change_username(&mut self, client_id: ClientId, username: Option<String>) {
        let Some(username) = username else {
            return;
        };

        if let Err(e) = self.db.users().upsert(&username).await {
            error!("Failed to register username '{}': {}", username, e);
            return;
        }

        info!("Client {} registered username '{}'", client_id, username);
        let reply = ServerMessage::notice(format!("Username changed to {username}"));
        self.send_to(client_id, reply);
    }

    /// Handle room creation
    async fn handle_create_room(&mut self, client_id: ClientId, room_name: Option<String>) {
        let Some(room_name) = room_name else {
            return;
        };

        let outcome = self.registry.create_room(&room_name).await;
        self.finish_create_room(client_id, outcome).await;
    }

    /// Report a create-room outcome; only a created room reaches other clients
    async fn finish_create_room(&mut self, client_id: ClientId, outcome: CreateOutcome) {
        match outcome {
            CreateOutcome::Created(room) => {
                match self.registry.list_rooms().await {
                    Ok(rooms) => self.broadcast_all(ServerMessage::Rooms { rooms }),
                    Err(e) => error!("Failed to list rooms after creating '{}': {}", room.name, e),
                }

                self.leave_all(client_id);
                self.attach(client_id, &room.name);
                self.send_to(client_id, ServerMessage::ClearRoomHistory);
                let created = format!("Created and joined room: {}", room.name);
                self.send_to(client_id, ServerMessage::notice(created));
                self.send_to(client_id, ServerMessage::RoomJoined { room: room.name });
            }
            CreateOutcome::Duplicate(name) => {
                let reply = ServerMessage::notice(format!("Room '{name}' already exists"));
                self.send_to(client_id, reply);
            }
            CreateOutcome::Failed(detail) => {
                let reply = ServerMessage::notice(format!("Error creating room: {detail}"));
                self.send_to(client_id, reply);
            }
            CreateOutcome::Ignored => {}
        }
    }

    /// Handle joining an existing room by exact name
    async fn handle_join_room(&mut self, client_id: ClientId, room_name: Option<String>) {
        let Some(room_name) = room_name else {
            return;
        };

        let room = match self.registry.find_room(&room_name).await {
            Ok(Some(room)) => room,
            Ok(None) => {
                debug!("Client {} tried to join unknown room '{}'", client_id, room_name);
                return;
            }
            Err(e) => {
                error!("Room lookup for '{}' failed: {}", room_name, e);
                return;
            }
        };

        self.enter_room(client_id, &room).await;
        let joined = ServerMessage::notice(format!("Joined room: {}", room.name));
        self.send_to(client_id, joined);
        self.send_to(client_id, ServerMessage::RoomJoined { room: room.name });
    }

    /// Handle room list request
    async fn handle_list_rooms(&mut self, client_id: ClientId) {
        match self.registry.list_rooms().await {
            Ok(rooms) => self.send_to(client_id, ServerMessage::Rooms { rooms }),
            Err(e) => error!("Failed to list rooms for {}: {}", client_id, e),
        }
    }

    /// Helper: Move a client into `room` and replay its history
    ///
    /// Leaves every other room first, then clears the client's view before
    /// any message is replayed.
    async fn enter_room(&mut self, client_id: ClientId, room: &RoomRecord) {
        if !self.clients.contains_key(&client_id) {
            return;
        }

        self.leave_all(client_id);
        self.attach(client_id, &room.name);
        info!("Client {} joined room '{}'", client_id, room.name);

        self.send_to(client_id, ServerMessage::ClearRoomHistory);

        let limit = i64::try_from(self.history_limit).unwrap_or(i64::MAX);
        let history = match self.db.messages().recent(room.id, limit).await {
            Ok(history) => history,
            Err(e) => {
                error!("Failed to load history for '{}': {}", room.name, e);
                Vec::new()
            }
        };

        for msg in history {
            let line = ChatLine {
                message_text: msg.content,
                room: room.name.clone(),
                username: msg.username,
            };
            self.send_to(client_id, ServerMessage::chat(line));
        }
    }

    /// Helper: Detach a client from every room it is a member of
    fn leave_all(&mut self, client_id: ClientId) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.leave();
        }

        self.rooms.retain(|name, room| {
            if room.contains(client_id) {
                debug!("Client {} left room '{}'", client_id, name);
            }
            !room.remove(client_id)
        });
    }

    /// Helper: Attach a client to `room_name` in both session and index
    fn attach(&mut self, client_id: ClientId, room_name: &str) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };

        client.join(room_name.to_string());
        let room = self
            .rooms
            .entry(room_name.to_string())
            .or_insert_with(|| Room::new(room_name.to_string()));
        room.add(client_id);
        debug!("Room '{}' has {} member(s)", room.name, room.member_count());
    }

    /// Helper: Send to one connection without waiting
    ///
    /// A client whose outbound queue is full is dropped on the spot: it leaves
    /// every room and its session is discarded, so one stalled reader never
    /// holds up the actor.
    fn send_to(&mut self, client_id: ClientId, msg: ServerMessage) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        match client.send(msg) {
            Ok(()) => {}
            Err(SendError::QueueFull) => {
                warn!("Client {} send queue exceeded, dropping session", client_id);
                self.leave_all(client_id);
                self.clients.remove(&client_id);
            }
            Err(SendError::ChannelClosed) => {
                debug!("Client {} channel closed", client_id);
            }
        }
    }

    /// Helper: Send to every connection currently joined to `room_name`
    fn broadcast_room(&mut self, room_name: &str, msg: ServerMessage) {
        let Some(room) = self.rooms.get(room_name) else {
            return;
        };

        let members: Vec<ClientId> = room.members().collect();
        for member in members {
            self.send_to(member, msg.clone());
        }
    }

    /// Helper: Send to every connected client
    fn broadcast_all(&mut self, msg: ServerMessage) {
        let ids: Vec<ClientId> = self.clients.keys().copied().collect();
        for client_id in ids {
            self.send_to(client_id, msg.clone());
        }
    }
}
