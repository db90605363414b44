// src/servers/room_socket.rs - websocket feed for shared room boards

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use crate::game::Snapshot;
use crate::services::{new_session_id, RoomAction, RoomManager, DEFAULT_ROOM};
use crate::Result;

type SocketWriter = SplitSink<WebSocketStream<TcpStream>, Message>;

fn default_room() -> String {
    DEFAULT_ROOM.to_string()
}

/// Events a client sends, tagged by `event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinRoom {
        #[serde(default = "default_room")]
        room_id: String,
    },
    GameAction {
        #[serde(default = "default_room")]
        room_id: String,
        action: RoomAction,
        #[serde(default)]
        size: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomJoined { room_id: String, players_count: usize },
    GameState(Snapshot),
    Error { message: String },
}

pub struct RoomSocketServer {
    rooms: RoomManager,
}

impl RoomSocketServer {
    pub fn new(rooms: RoomManager) -> Self {
        Self { rooms }
    }

    pub async fn start(&self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        log::info!("🔌 Room socket listening on ws://{}", addr);
        self.serve(listener).await
    }

    /// Accepts connections until the listener fails.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            let rooms = self.rooms.clone();
            tokio::spawn(async move {
                match accept_async(stream).await {
                    Ok(ws_stream) => handle_connection(rooms, ws_stream, peer).await,
                    Err(e) => log::warn!("WebSocket handshake with {} failed: {:?}", peer, e),
                }
            });
        }
    }
}

// ============================================================================
// CONNECTION LOOP
// ============================================================================

struct Membership {
    room_id: String,
    updates: broadcast::Receiver<Snapshot>,
}

async fn next_update(membership: &mut Option<Membership>) -> Option<Snapshot> {
    let Some(membership) = membership.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match membership.updates.recv().await {
            Ok(snapshot) => return Some(snapshot),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("Room {} feed lagged by {} updates", membership.room_id, skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

async fn send_message(write: &mut SocketWriter, message: &ServerMessage) -> bool {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("Failed to encode room message: {}", e);
            return true;
        }
    };
    match write.send(Message::text(payload)).await {
        Ok(()) => true,
        Err(e) => {
            log::debug!("WebSocket send failed: {:?}", e);
            false
        }
    }
}

async fn handle_connection(rooms: RoomManager, ws_stream: WebSocketStream<TcpStream>, peer: SocketAddr) {
    let player_id = new_session_id();
    let (mut write, mut read) = ws_stream.split();
    let mut membership: Option<Membership> = None;

    log::info!("🔗 Player {} connected from {}", player_id, peer);

    loop {
        tokio::select! {
            incoming = read.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        log::debug!("WebSocket read from {} failed: {:?}", peer, e);
                        break;
                    }
                };

                let replies = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(message) => handle_client_message(&rooms, &player_id, &mut membership, message).await,
                    Err(e) => vec![ServerMessage::Error { message: format!("invalid message: {e}") }],
                };

                let mut open = true;
                for reply in &replies {
                    open = send_message(&mut write, reply).await;
                    if !open {
                        break;
                    }
                }
                if !open {
                    break;
                }
            }
            update = next_update(&mut membership) => {
                match update {
                    Some(snapshot) => {
                        if !send_message(&mut write, &ServerMessage::GameState(snapshot)).await {
                            break;
                        }
                    }
                    None => membership = None,
                }
            }
        }
    }

    if let Some(current) = membership.take() {
        rooms.leave(&current.room_id, &player_id).await;
    }
    log::info!("👋 Player {} disconnected", player_id);
}

async fn handle_client_message(
    rooms: &RoomManager,
    player_id: &str,
    membership: &mut Option<Membership>,
    message: ClientMessage,
) -> Vec<ServerMessage> {
    match message {
        ClientMessage::JoinRoom { room_id } => {
            if let Some(previous) = membership.take() {
                rooms.leave(&previous.room_id, player_id).await;
            }
            match rooms.join(&room_id, player_id).await {
                Ok((joined, updates, snapshot)) => {
                    *membership = Some(Membership {
                        room_id: joined.room_id.clone(),
                        updates,
                    });
                    vec![
                        ServerMessage::RoomJoined {
                            room_id: joined.room_id,
                            players_count: joined.players_count,
                        },
                        ServerMessage::GameState(snapshot),
                    ]
                }
                Err(e) => vec![ServerMessage::Error { message: e.to_string() }],
            }
        }
        ClientMessage::GameAction { room_id, action, size } => {
            let joined = membership
                .as_ref()
                .is_some_and(|current| current.room_id == room_id);
            if !joined {
                return vec![ServerMessage::Error {
                    message: format!("not a member of room {room_id}"),
                }];
            }
            // Accepted changes reach every member, this one included, via the room feed.
            match rooms.apply_action(&room_id, action, size).await {
                Ok(_) => Vec::new(),
                Err(e) => vec![ServerMessage::Error { message: e.to_string() }],
            }
        }
    }
}
