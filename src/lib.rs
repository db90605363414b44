//! # Tile Merge
//!
//! A 2048-style tile merging puzzle with a web front end.
//!
//! ## Features
//!
//! - **Game Engine**: Square boards from 4x4 up to 10x10, slide and merge rules, scoring
//! - **Sessions**: One board per browser session, plus shared boards in multiplayer rooms
//! - **Leaderboard**: Best score per player, persisted in SQLite
//! - **Server Components**: JSON HTTP API and a websocket feed for rooms
//!
//! ## Usage
//!
//! ```rust
//! use tile_merge::game::{Board, GameStatus};
//!
//! let mut board = Board::new(4).unwrap();
//! board.move_left();
//! assert_eq!(board.status(), GameStatus::Active);
//! ```

// ============================================================================
// PUBLIC API MODULES
// ============================================================================

/// JSON configuration with built-in defaults
pub mod config;

/// Core game logic and rules
pub mod game;

/// Persisted best scores
pub mod leaderboard;

/// Logger setup
pub mod logging;

/// Server components (Web UI, room socket)
pub mod servers;

/// Session and room state shared by the servers
pub mod services;

/// Utility functions and helpers
pub mod utils;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

/// Main game engine facade
pub use game::{Board, Direction, GameError, GameStatus, Snapshot};

/// Server configuration and implementations
pub use servers::{RoomSocketServer, WebUiConfig, WebUiServer};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Main error type for the Tile Merge library
#[derive(Debug, thiserror::Error)]
pub enum TileMergeError {
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("Leaderboard error: {0}")]
    Leaderboard(#[from] leaderboard::LeaderboardError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] flexi_logger::FlexiLoggerError),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TileMergeError>;

// ============================================================================
// LIBRARY VERSION INFO
// ============================================================================

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
