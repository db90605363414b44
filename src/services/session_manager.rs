// src/services/session_manager.rs - one board per HTTP session

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::game::{Board, Direction, GameError, Snapshot};

// ============================================================================
// DATA TYPES
// ============================================================================

#[derive(Debug)]
pub struct GameSession {
    pub board: Board,
    pub last_seen: Instant,
}

impl GameSession {
    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

/// Sessions are locked one by one so moves on the same board are serialized
/// while different sessions proceed in parallel.
#[derive(Debug, Default)]
pub struct SessionStoreState {
    pub sessions: HashMap<String, Arc<Mutex<GameSession>>>,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<RwLock<SessionStoreState>>,
    target: u32,
}

pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

// ============================================================================
// SESSION LIFECYCLE
// ============================================================================

impl SessionManager {
    pub fn new(target: u32) -> Self {
        Self {
            store: Arc::new(RwLock::new(SessionStoreState::default())),
            target,
        }
    }

    /// Starts a new game for `session_id`, replacing any previous one.
    pub async fn create_session(&self, session_id: &str, size: usize) -> Result<Snapshot, GameError> {
        let board = Board::with_target(size, self.target)?;
        let snapshot = board.snapshot();

        let session = GameSession {
            board,
            last_seen: Instant::now(),
        };
        self.store
            .write()
            .await
            .sessions
            .insert(session_id.to_string(), Arc::new(Mutex::new(session)));

        log::info!("🎮 New {size}x{size} game for session {session_id}");
        Ok(snapshot)
    }

    /// Returns the session's game, creating a `size` board on first access.
    pub async fn ensure_session(&self, session_id: &str, size: usize) -> Result<Snapshot, GameError> {
        let session = {
            let mut state = self.store.write().await;
            if let Some(session) = state.sessions.get(session_id) {
                session.clone()
            } else {
                let session = GameSession {
                    board: Board::with_target(size, self.target)?,
                    last_seen: Instant::now(),
                };
                let snapshot = session.board.snapshot();
                state
                    .sessions
                    .insert(session_id.to_string(), Arc::new(Mutex::new(session)));
                log::info!("🎮 New {size}x{size} game for session {session_id}");
                return Ok(snapshot);
            }
        };

        let mut session = session.lock().await;
        session.touch();
        Ok(session.board.snapshot())
    }

    async fn get(&self, session_id: &str) -> Option<Arc<Mutex<GameSession>>> {
        self.store.read().await.sessions.get(session_id).cloned()
    }

    pub async fn snapshot(&self, session_id: &str) -> Option<Snapshot> {
        let session = self.get(session_id).await?;
        let mut session = session.lock().await;
        session.touch();
        Some(session.board.snapshot())
    }

    /// Plays one move. `None` when the session has no game.
    pub async fn apply_move(&self, session_id: &str, direction: Direction) -> Option<(bool, Snapshot)> {
        let session = self.get(session_id).await?;
        let mut session = session.lock().await;
        session.touch();

        let moved = session.board.apply_move(direction);
        if moved {
            log::debug!(
                "Session {} moved {} (score {}, moves {})",
                session_id,
                direction,
                session.board.score(),
                session.board.moves()
            );
        }
        Some((moved, session.board.snapshot()))
    }

    pub async fn remove(&self, session_id: &str) -> bool {
        self.store.write().await.sessions.remove(session_id).is_some()
    }

    /// Drops sessions idle for longer than `ttl`. Sessions busy with a move
    /// are kept. Returns how many were dropped.
    pub async fn purge_expired(&self, ttl: Duration) -> usize {
        let mut state = self.store.write().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, session| match session.try_lock() {
            Ok(session) => session.last_seen.elapsed() <= ttl,
            Err(_) => true,
        });
        let purged = before - state.sessions.len();
        if purged > 0 {
            log::info!("🧹 Purged {purged} idle sessions");
        }
        purged
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
