//! Leaderboard data models

use serde::{Deserialize, Serialize};

/// One player's best game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: u64,
    pub max_tile: u32,
    pub moves: u64,
    pub size: usize,
    pub player_name: String,
    /// RFC 3339 time the entry was recorded
    pub timestamp: String,
    /// Display date, `YYYY-MM-DD HH:MM`
    pub date: String,
}

/// Result of a game as reported by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreSubmission {
    pub score: u64,
    pub max_tile: u32,
    pub moves: u64,
    pub size: usize,
}

impl Default for ScoreSubmission {
    fn default() -> Self {
        Self {
            score: 0,
            max_tile: 0,
            moves: 0,
            size: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardStats {
    pub total_players: usize,
    pub highest_score: u64,
    pub average_score: u64,
    pub most_common_size: usize,
}

impl Default for LeaderboardStats {
    fn default() -> Self {
        Self {
            total_players: 0,
            highest_score: 0,
            average_score: 0,
            most_common_size: 4,
        }
    }
}

/// Public name shown for an anonymous player id.
pub fn player_display_name(player_id: &str) -> String {
    let short: String = player_id.chars().take(8).collect();
    format!("Player_{short}")
}
