//! Global leaderboard
//!
//! Keeps the best score of each player, at most `capacity` players,
//! ordered by score descending. Backed by SQLite.

pub mod database;
pub mod models;

pub use database::LeaderboardDatabase;
pub use models::*;

#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("leaderboard connection lock poisoned")]
    LockPoisoned,

    #[error("{0} is out of range")]
    OutOfRange(&'static str),
}
