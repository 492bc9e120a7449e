//! Multi-room WebSocket Chat Server Library
//!
//! A WebSocket chat server built with tokio-tungstenite, using the Actor
//! pattern for session state and SQLite (via SQLx) for persistence.
//!
//! # Features
//! - Named rooms with case-insensitive unique names
//! - Automatic join of the "General" room on connect
//! - Room-scoped message fan-out
//! - History replay (last 50 messages) on join
//! - Lazily registered usernames, "Anonymous" by default
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning every session and the live
//!   room membership index
//! - Each connection has a `handler` task communicating with the server
//! - `Database` is the single source of truth for users, rooms and messages
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use roomchat::{handle_connection, ChatServer, Database};
//!
//! #[tokio::main]
//! async fn main() {
//!     let db = Database::connect("roomchat.db").await.unwrap();
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(ChatServer::new(cmd_rx, db).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx, 128));
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use config::{Config, ConfigError};
pub use db::{Database, DbError};
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use message::{ChatLine, ChatPayload, ClientMessage, MessageBody, ServerMessage};
pub use registry::{CreateOutcome, RoomRegistry};
pub use room::Room;
pub use server::{ChatServer, ServerCommand};
pub use types::{ClientId, ANONYMOUS, DEFAULT_ROOM, HISTORY_LIMIT};
