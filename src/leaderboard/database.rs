//! SQLite storage for the leaderboard

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::models::{LeaderboardStats, ScoreEntry, ScoreSubmission};
use super::LeaderboardError;

/// Number of players kept unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 100;

/// Database connection wrapper
#[derive(Clone)]
pub struct LeaderboardDatabase {
    conn: Arc<Mutex<Connection>>,
    capacity: usize,
}

impl LeaderboardDatabase {
    /// Open (or create) the database file and initialize tables
    pub fn open<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self, LeaderboardError> {
        Self::from_connection(Connection::open(path)?, capacity)
    }

    /// Create in-memory database (for testing)
    pub fn in_memory(capacity: usize) -> Result<Self, LeaderboardError> {
        Self::from_connection(Connection::open_in_memory()?, capacity)
    }

    fn from_connection(conn: Connection, capacity: usize) -> Result<Self, LeaderboardError> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            capacity,
        };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> Result<(), LeaderboardError> {
        let conn = self.lock()?;

        // `seq` grows on every write so that equal scores keep insertion order.
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                player_name TEXT PRIMARY KEY,
                score INTEGER NOT NULL,
                max_tile INTEGER NOT NULL,
                moves INTEGER NOT NULL,
                size INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                date TEXT NOT NULL,
                seq INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_scores_rank ON scores(score DESC, seq ASC);
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LeaderboardError> {
        self.conn.lock().map_err(|_| LeaderboardError::LockPoisoned)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records a game for `player_name`.
    ///
    /// A new player is always inserted; an existing one is only replaced by a
    /// strictly higher score. Players beyond the capacity are then dropped.
    /// Returns whether the entry was written.
    pub fn add_or_update_score(
        &self,
        player_name: &str,
        submission: &ScoreSubmission,
    ) -> Result<bool, LeaderboardError> {
        let score = sql_int(submission.score, "score")?;
        let moves = sql_int(submission.moves, "moves")?;
        let size = sql_int(submission.size, "size")?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let best: Option<i64> = tx
            .query_row(
                "SELECT score FROM scores WHERE player_name = ?1",
                params![player_name],
                |row| row.get(0),
            )
            .optional()?;

        let written = match best {
            Some(best) if score <= best => false,
            _ => {
                let now = chrono::Local::now();
                let seq: i64 =
                    tx.query_row("SELECT COALESCE(MAX(seq), 0) + 1 FROM scores", [], |row| {
                        row.get(0)
                    })?;
                tx.execute(
                    "INSERT OR REPLACE INTO scores (player_name, score, max_tile, moves, size, timestamp, date, seq)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        player_name,
                        score,
                        i64::from(submission.max_tile),
                        moves,
                        size,
                        now.to_rfc3339(),
                        now.format("%Y-%m-%d %H:%M").to_string(),
                        seq,
                    ],
                )?;
                true
            }
        };

        let dropped = tx.execute(
            "DELETE FROM scores WHERE player_name NOT IN (
                 SELECT player_name FROM scores ORDER BY score DESC, seq ASC LIMIT ?1
             )",
            params![sql_limit(self.capacity)],
        )?;
        tx.commit()?;

        if dropped > 0 {
            log::debug!("Leaderboard trimmed {} entries", dropped);
        }
        Ok(written)
    }

    /// Best `limit` entries, highest score first
    pub fn top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, LeaderboardError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT score, max_tile, moves, size, player_name, timestamp, date
             FROM scores ORDER BY score DESC, seq ASC LIMIT ?1",
        )?;

        let entries = stmt
            .query_map(params![sql_limit(limit)], |row| {
                Ok(ScoreEntry {
                    score: row.get::<_, i64>(0)? as u64,
                    max_tile: row.get::<_, i64>(1)? as u32,
                    moves: row.get::<_, i64>(2)? as u64,
                    size: row.get::<_, i64>(3)? as usize,
                    player_name: row.get(4)?,
                    timestamp: row.get(5)?,
                    date: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    pub fn entries(&self) -> Result<Vec<ScoreEntry>, LeaderboardError> {
        self.top_scores(self.capacity)
    }

    /// 1-based position `score` would take: the first entry it ties or beats.
    pub fn rank_for_score(&self, score: u64) -> Result<usize, LeaderboardError> {
        let entries = self.entries()?;
        Ok(entries
            .iter()
            .position(|entry| entry.score <= score)
            .map_or(entries.len() + 1, |index| index + 1))
    }

    pub fn stats(&self) -> Result<LeaderboardStats, LeaderboardError> {
        let entries = self.entries()?;
        if entries.is_empty() {
            return Ok(LeaderboardStats::default());
        }

        let total_players = entries.len();
        let highest_score = entries.iter().map(|e| e.score).max().unwrap_or(0);
        let total: u128 = entries.iter().map(|e| u128::from(e.score)).sum();
        let average_score = u64::try_from(total / total_players as u128).unwrap_or(highest_score);

        // Ties go to the size seen first in leaderboard order.
        let mut counts: Vec<(usize, usize)> = Vec::new();
        for entry in &entries {
            match counts.iter_mut().find(|(size, _)| *size == entry.size) {
                Some((_, count)) => *count += 1,
                None => counts.push((entry.size, 1)),
            }
        }
        let mut most_common = counts[0];
        for &candidate in &counts[1..] {
            if candidate.1 > most_common.1 {
                most_common = candidate;
            }
        }

        Ok(LeaderboardStats {
            total_players,
            highest_score,
            average_score,
            most_common_size: most_common.0,
        })
    }

    pub fn len(&self) -> Result<usize, LeaderboardError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM scores", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// SQLite integers are signed; larger client values are refused.
fn sql_int<T: TryInto<i64>>(value: T, field: &'static str) -> Result<i64, LeaderboardError> {
    value
        .try_into()
        .map_err(|_| LeaderboardError::OutOfRange(field))
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
