//! Multi-room WebSocket Chat Server - Entry Point
//!
//! Loads configuration, opens the store, starts the ChatServer actor and
//! accepts connections until Ctrl-C.

use std::env;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use roomchat::{handle_connection, AppError, ChatServer, Config, Database};

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Use RUST_LOG to control log level, e.g. RUST_LOG=roomchat=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roomchat=info")),
        )
        .init();

    // Optional config file path as the first argument
    let config = match env::args().nth(1) {
        Some(path) => {
            info!("Loading config from {}", path);
            Config::load(&path)?
        }
        None => Config::default(),
    };

    let db = Database::connect(&config.database.path).await?;

    let listener = TcpListener::bind(&config.listen.address).await?;
    info!("WebSocket Chat Server listening on {}", config.listen.address);

    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let server = ChatServer::new(cmd_rx, db.clone()).with_history_limit(config.chat.history_limit);
    tokio::spawn(server.run());

    info!("ChatServer actor started");

    let client_buffer = config.chat.client_buffer;

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let cmd_tx = cmd_tx.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, cmd_tx, client_buffer).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    db.close().await;
    Ok(())
}
