use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    /// A tile reached the target value. Further moves are still accepted.
    Won,
    /// No empty cell and no direction changes the grid.
    Lost,
}

/// Owned, read-only view of a board, safe to serialize and keep around.
///
/// Field names are the wire contract shared with the browser clients.
/// Empty cells are `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub grid: Vec<Vec<u32>>,
    pub score: u64,
    pub moves: u64,
    pub max_tile: u32,
    pub status: GameStatus,
    pub size: usize,
}

impl Snapshot {
    pub fn tile_sum(&self) -> u64 {
        self.grid.iter().flatten().map(|&v| u64::from(v)).sum()
    }

    pub fn occupied(&self) -> usize {
        self.grid.iter().flatten().filter(|&&v| v != 0).count()
    }
}
