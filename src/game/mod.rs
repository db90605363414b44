pub mod board;
pub mod direction;
pub mod line;
pub mod snapshot;

pub use board::{Board, Spawn, DEFAULT_TARGET};
pub use direction::Direction;
pub use snapshot::{GameStatus, Snapshot};

/// Errors raised while building a board or parsing player input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("invalid board size: {0}")]
    InvalidSize(i64),

    #[error("invalid target tile: {0} (must be a power of two >= 2)")]
    InvalidTarget(u32),

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("unknown direction: {0}")]
    UnknownDirection(String),
}
