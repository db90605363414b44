// src/services/room_manager.rs - shared boards for multiplayer rooms

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::config::GameSettings;
use crate::game::{Board, Direction, GameError, Snapshot};

pub const DEFAULT_ROOM: &str = "default";

const ROOM_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// DATA TYPES
// ============================================================================

/// What a room member asks the shared board to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomAction {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    NewGame,
}

impl RoomAction {
    pub fn direction(self) -> Option<Direction> {
        match self {
            RoomAction::MoveLeft => Some(Direction::Left),
            RoomAction::MoveRight => Some(Direction::Right),
            RoomAction::MoveUp => Some(Direction::Up),
            RoomAction::MoveDown => Some(Direction::Down),
            RoomAction::NewGame => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomJoined {
    pub room_id: String,
    pub players_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room not found: {0}")]
    UnknownRoom(String),

    #[error(transparent)]
    Game(#[from] GameError),
}

#[derive(Debug)]
struct Room {
    board: Board,
    players: HashSet<String>,
    updates: broadcast::Sender<Snapshot>,
}

impl Room {
    fn publish(&self) -> Snapshot {
        let snapshot = self.board.snapshot();
        // No subscriber left is not an error: the last player may be leaving.
        let _ = self.updates.send(snapshot.clone());
        snapshot
    }
}

#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<RwLock<HashMap<String, Arc<Mutex<Room>>>>>,
    game: GameSettings,
}

// ============================================================================
// ROOM LIFECYCLE
// ============================================================================

impl RoomManager {
    pub fn new(game: GameSettings) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            game,
        }
    }

    /// Adds `player_id` to the room, opening it with a default board on first
    /// join. Returns the membership, a feed of board updates and the current
    /// board.
    pub async fn join(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Result<(RoomJoined, broadcast::Receiver<Snapshot>, Snapshot), RoomError> {
        // The map stays locked until the player is in, so a concurrent
        // `leave` cannot close the room in between.
        let mut rooms = self.rooms.write().await;
        let room = match rooms.get(room_id) {
            Some(room) => room.clone(),
            None => {
                let board = Board::with_target(self.game.default_size, self.game.target_score)?;
                let (updates, _) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
                let room = Arc::new(Mutex::new(Room {
                    board,
                    players: HashSet::new(),
                    updates,
                }));
                rooms.insert(room_id.to_string(), room.clone());
                log::info!("🏠 Room {room_id} opened");
                room
            }
        };

        let mut room = room.lock().await;
        room.players.insert(player_id.to_string());
        drop(rooms);

        let joined = RoomJoined {
            room_id: room_id.to_string(),
            players_count: room.players.len(),
        };
        log::info!(
            "👥 {} joined room {} ({} players)",
            player_id,
            room_id,
            joined.players_count
        );
        Ok((joined, room.updates.subscribe(), room.board.snapshot()))
    }

    /// Applies an action to the room board and broadcasts the new state when
    /// it changed. `new_game` always counts as a change.
    pub async fn apply_action(
        &self,
        room_id: &str,
        action: RoomAction,
        size: Option<i64>,
    ) -> Result<Option<Snapshot>, RoomError> {
        let room = self
            .rooms
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::UnknownRoom(room_id.to_string()))?;
        let mut room = room.lock().await;

        let changed = match action.direction() {
            Some(direction) => room.board.apply_move(direction),
            None => {
                let requested = size.unwrap_or(self.game.default_size as i64);
                let size = self.game.resolve_size(requested, false)?;
                room.board = Board::with_target(size, self.game.target_score)?;
                log::info!("🔄 Room {room_id} restarted with a {size}x{size} board");
                true
            }
        };

        Ok(changed.then(|| room.publish()))
    }

    /// Removes a player; the room closes with its last player.
    /// Returns how many players remain.
    pub async fn leave(&self, room_id: &str, player_id: &str) -> usize {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(room_id).cloned() else {
            return 0;
        };

        let remaining = {
            let mut room = room.lock().await;
            room.players.remove(player_id);
            room.players.len()
        };
        if remaining == 0 {
            rooms.remove(room_id);
            log::info!("🚪 Room {room_id} closed");
        }
        remaining
    }

    pub async fn players_count(&self, room_id: &str) -> Option<usize> {
        let room = self.rooms.read().await.get(room_id).cloned()?;
        let count = room.lock().await.players.len();
        Some(count)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
