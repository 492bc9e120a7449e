//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake, event
//! parsing, and bidirectional communication with the ChatServer.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::server::ServerCommand;
use crate::types::ClientId;

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, registers the session with the
/// ChatServer (which sends the greeting and auto-joins General), and pumps
/// events both ways until either side closes.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    buffer: usize,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer_addr);

    // Server -> client events
    // mpsc panics on a zero capacity
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(buffer.max(1));

    if cmd_tx
        .send(ServerCommand::Connect {
            client_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register client {} - server closed", client_id);
        return Err(AppError::ChannelSend);
    }

    let cmd_tx_read = cmd_tx.clone();

    // Read task (WebSocket -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        let cmd = client_message_to_command(client_id, client_msg);
                        if cmd_tx_read.send(cmd).await.is_err() {
                            debug!("Server closed, ending read task for {}", client_id);
                            break;
                        }
                    }
                    Err(e) => {
                        // Malformed events are dropped; the connection stays up
                        warn!("Invalid event from {}: {}", client_id, e);
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close frame", client_id);
                    break;
                }
                Ok(_) => {
                    // Binary, ping, pong: nothing to route
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", client_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Write task (ServerMessage -> WebSocket)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                }
            }
        }
        debug!("Write task ended for client");

        let _ = ws_sender.close().await;
    });

    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
        }
    }

    // Stop the other half so no further commands leave for this client
    read_task.abort();
    write_task.abort();

    let _ = cmd_tx.send(ServerCommand::Disconnect { client_id }).await;

    info!("Client {} disconnected", client_id);

    Ok(())
}

/// Convert a ClientMessage to a ServerCommand
fn client_message_to_command(client_id: ClientId, msg: ClientMessage) -> ServerCommand {
    match msg {
        ClientMessage::Message { message } => ServerCommand::PostMessage {
            client_id,
            payload: message,
        },
        ClientMessage::NewUsername { username } => ServerCommand::ChangeUsername {
            client_id,
            username,
        },
        ClientMessage::CreateRoom { room_name } => ServerCommand::CreateRoom {
            client_id,
            room_name,
        },
        ClientMessage::JoinRoom { room_name } => ServerCommand::JoinRoom {
            client_id,
            room_name,
        },
        ClientMessage::ListRooms => ServerCommand::ListRooms { client_id },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Error as WsError;

    use super::*;
    use crate::db::Database;
    use crate::server::ChatServer;

    #[test]
    fn test_client_message_to_command() {
        let id = ClientId::new();
        let json = r#"{"event": "join_room", "data": {"room_name": "Dev"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();

        match client_message_to_command(id, msg) {
            ServerCommand::JoinRoom {
                client_id,
                room_name,
            } => {
                assert_eq!(client_id, id);
                assert_eq!(room_name.as_deref(), Some("Dev"));
            }
            other => panic!("Wrong command: {other:?}"),
        }
    }

    async fn next_json<S>(ws: &mut S) -> serde_json::Value
    where
        S: futures_util::Stream<Item = Result<Message, WsError>> + Unpin,
    {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_websocket_session_end_to_end() {
        let db = Database::connect(":memory:").await.unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        tokio::spawn(ChatServer::new(cmd_rx, db).run());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(stream, cmd_tx.clone(), 64));
            }
        });

        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();

        assert_eq!(
            next_json(&mut ws).await,
            serde_json::json!({"event": "message", "data": {"message": "Connected to server"}})
        );
        assert_eq!(
            next_json(&mut ws).await,
            serde_json::json!({"event": "rooms", "data": {"rooms": ["General"]}})
        );
        assert_eq!(
            next_json(&mut ws).await,
            serde_json::json!({"event": "clear_room_history"})
        );
        assert_eq!(
            next_json(&mut ws).await,
            serde_json::json!({"event": "message", "data": {"message": "Joined room: General"}})
        );
        assert_eq!(
            next_json(&mut ws).await,
            serde_json::json!({"event": "room_joined", "data": {"room": "General"}})
        );

        // Garbage is ignored and the connection stays usable
        ws.send(Message::Text("not json".into())).await.unwrap();

        let post = serde_json::json!({
            "event": "message",
            "data": {"message": {"messageText": "hi", "room": "General", "username": "alice"}}
        });
        ws.send(Message::Text(post.to_string().into())).await.unwrap();

        assert_eq!(
            next_json(&mut ws).await,
            serde_json::json!({
                "event": "message",
                "data": {"message": {"messageText": "hi", "room": "General", "username": "alice"}}
            })
        );

        ws.close(None).await.unwrap();
    }
}
