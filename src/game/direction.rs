use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::game::GameError;

/// A direction to slide/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Row-major cell indices of line `k`, ordered from the edge tiles travel
    /// towards. Rows for left/right, columns for up/down.
    pub fn line_indices(self, size: usize, k: usize) -> Vec<usize> {
        match self {
            Direction::Left => (0..size).map(|col| k * size + col).collect(),
            Direction::Right => (0..size).rev().map(|col| k * size + col).collect(),
            Direction::Up => (0..size).map(|row| row * size + k).collect(),
            Direction::Down => (0..size).rev().map(|row| row * size + k).collect(),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(GameError::UnknownDirection(s.to_string())),
        }
    }
}
