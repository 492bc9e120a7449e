//! Error types for the chat server
//!
//! Connection-level and startup errors. Per-event validation failures are
//! not errors here: the router drops those silently.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::DbError;

/// Application-level errors
///
/// Any of these ends the connection (or startup) it occurred in; none
/// affects other connections.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistence store error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Channel send error (internal channel broken)
    #[error("Channel send error")]
    ChannelSend,
}

/// Message send errors
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The outbound queue is full (client is not reading)
    #[error("Send queue full")]
    QueueFull,
}
