use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game::direction::Direction;
use crate::game::line::slide_line;
use crate::game::snapshot::{GameStatus, Snapshot};
use crate::game::GameError;

/// Tile value that wins the game unless configured otherwise.
pub const DEFAULT_TARGET: u32 = 2048;

const INITIAL_TILES: usize = 2;
const FOUR_PROBABILITY: f64 = 0.1;

/// Where the latest tile was spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spawn {
    pub row: usize,
    pub col: usize,
    pub value: u32,
}

/// N×N game board. Cells are stored row-major, `0` is an empty cell.
///
/// The random source is a type parameter so tests and replays can seed it.
/// A board is not synchronized: callers sharing one across tasks must
/// serialize moves themselves.
#[derive(Debug, Clone)]
pub struct Board<R = StdRng> {
    size: usize,
    cells: Vec<u32>,
    score: u64,
    moves: u64,
    status: GameStatus,
    target: u32,
    last_spawn: Option<Spawn>,
    rng: R,
}

impl Board<StdRng> {
    /// New board with two spawned tiles, the default target and an OS-seeded RNG.
    pub fn new(size: usize) -> Result<Self, GameError> {
        Self::with_target(size, DEFAULT_TARGET)
    }

    pub fn with_target(size: usize, target: u32) -> Result<Self, GameError> {
        Self::with_rng(size, target, StdRng::from_os_rng())
    }
}

impl<R: Rng> Board<R> {
    pub fn with_rng(size: usize, target: u32, rng: R) -> Result<Self, GameError> {
        if size == 0 {
            return Err(GameError::InvalidSize(0));
        }
        validate_target(target)?;

        let mut board = Board {
            size,
            cells: vec![0; size * size],
            score: 0,
            moves: 0,
            status: GameStatus::Active,
            target,
            last_spawn: None,
            rng,
        };
        for _ in 0..INITIAL_TILES {
            board.last_spawn = board.spawn_tile();
        }
        Ok(board)
    }

    /// Restores a position from rows of cell values. No tiles are spawned and
    /// the status is evaluated right away.
    pub fn from_grid(grid: Vec<Vec<u32>>, target: u32, rng: R) -> Result<Self, GameError> {
        let size = grid.len();
        if size == 0 {
            return Err(GameError::InvalidSize(0));
        }
        if grid.iter().any(|row| row.len() != size) {
            return Err(GameError::InvalidGrid(format!(
                "expected {size} rows of {size} cells"
            )));
        }
        validate_target(target)?;

        let cells: Vec<u32> = grid.into_iter().flatten().collect();
        if let Some(bad) = cells.iter().find(|&&v| v != 0 && !is_tile(v)) {
            return Err(GameError::InvalidGrid(format!(
                "{bad} is not a power of two >= 2"
            )));
        }

        let mut board = Board {
            size,
            cells,
            score: 0,
            moves: 0,
            status: GameStatus::Active,
            target,
            last_spawn: None,
            rng,
        };
        board.status = board.evaluate_status();
        Ok(board)
    }

    pub fn move_left(&mut self) -> bool {
        self.apply_move(Direction::Left)
    }

    pub fn move_right(&mut self) -> bool {
        self.apply_move(Direction::Right)
    }

    pub fn move_up(&mut self) -> bool {
        self.apply_move(Direction::Up)
    }

    pub fn move_down(&mut self) -> bool {
        self.apply_move(Direction::Down)
    }

    /// Slides and merges every line towards `direction`.
    ///
    /// Returns `false` and leaves the board untouched when nothing would
    /// change. Otherwise commits the merge points, counts the move, spawns a
    /// tile and re-evaluates the status.
    pub fn apply_move(&mut self, direction: Direction) -> bool {
        let (cells, gained) = slide_cells(&self.cells, self.size, direction);
        if cells == self.cells {
            return false;
        }

        self.cells = cells;
        self.score += gained;
        self.moves += 1;
        self.last_spawn = self.spawn_tile();
        self.status = self.evaluate_status();
        true
    }

    /// Places a 2 (90%) or a 4 (10%) on a uniformly chosen empty cell.
    /// Does nothing on a full grid.
    fn spawn_tile(&mut self) -> Option<Spawn> {
        let empty: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0)
            .map(|(i, _)| i)
            .collect();
        if empty.is_empty() {
            return None;
        }

        let index = empty[self.rng.random_range(0..empty.len())];
        let value = if self.rng.random_bool(FOUR_PROBABILITY) {
            4
        } else {
            2
        };
        self.cells[index] = value;

        Some(Spawn {
            row: index / self.size,
            col: index % self.size,
            value,
        })
    }
}

impl<R> Board<R> {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn moves(&self) -> u64 {
        self.moves
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn last_spawn(&self) -> Option<Spawn> {
        self.last_spawn
    }

    pub fn max_tile(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<u32> {
        if row >= self.size || col >= self.size {
            return None;
        }
        Some(self.cells[row * self.size + col])
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 0).count()
    }

    /// Whether moving in `direction` would change the grid. Does not mutate.
    pub fn can_move(&self, direction: Direction) -> bool {
        slide_cells(&self.cells, self.size, direction).0 != self.cells
    }

    pub fn legal_directions(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&d| self.can_move(d))
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            grid: self.cells.chunks(self.size).map(<[u32]>::to_vec).collect(),
            score: self.score,
            moves: self.moves,
            max_tile: self.max_tile(),
            status: self.status,
            size: self.size,
        }
    }

    fn evaluate_status(&self) -> GameStatus {
        if self.cells.iter().any(|&v| v >= self.target) {
            GameStatus::Won
        } else if self.empty_count() == 0 && self.legal_directions().is_empty() {
            GameStatus::Lost
        } else {
            GameStatus::Active
        }
    }
}

impl<R> fmt::Display for Board<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.size) {
            for (i, value) in row.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                if *value == 0 {
                    write!(f, "{:>5}", ".")?;
                } else {
                    write!(f, "{value:>5}")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn slide_cells(cells: &[u32], size: usize, direction: Direction) -> (Vec<u32>, u64) {
    let mut next = cells.to_vec();
    let mut gained = 0;

    for k in 0..size {
        let indices = direction.line_indices(size, k);
        let line: Vec<u32> = indices.iter().map(|&i| cells[i]).collect();
        let (slid, points) = slide_line(&line);
        gained += points;
        for (&i, value) in indices.iter().zip(slid) {
            next[i] = value;
        }
    }

    (next, gained)
}

fn is_tile(value: u32) -> bool {
    value >= 2 && value.is_power_of_two()
}

fn validate_target(target: u32) -> Result<(), GameError> {
    if is_tile(target) {
        Ok(())
    } else {
        Err(GameError::InvalidTarget(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn board(grid: Vec<Vec<u32>>) -> Board<StdRng> {
        Board::from_grid(grid, DEFAULT_TARGET, seeded(7)).unwrap()
    }

    // Rows that no horizontal move can change.
    fn locked_rows() -> Vec<Vec<u32>> {
        vec![
            vec![8, 16, 32, 64],
            vec![64, 32, 16, 8],
            vec![8, 16, 32, 64],
        ]
    }

    #[test]
    fn test_new_board_has_two_tiles() {
        let board = Board::with_rng(4, DEFAULT_TARGET, seeded(1)).unwrap();
        let snapshot = board.snapshot();
        assert_eq!(snapshot.size, 4);
        assert_eq!(snapshot.occupied(), 2);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.moves, 0);
        assert_eq!(snapshot.status, GameStatus::Active);
        assert!(snapshot.grid.iter().flatten().all(|&v| v == 0 || v == 2 || v == 4));
    }

    #[test]
    fn test_new_rejects_zero_size() {
        assert!(matches!(Board::new(0), Err(GameError::InvalidSize(0))));
    }

    #[test]
    fn test_new_rejects_bad_target() {
        assert!(matches!(
            Board::with_rng(4, 1000, seeded(1)),
            Err(GameError::InvalidTarget(1000))
        ));
    }

    #[test]
    fn test_single_cell_board() {
        let board = Board::with_rng(1, DEFAULT_TARGET, seeded(3)).unwrap();
        assert_eq!(board.empty_count(), 0);
        assert!(board.legal_directions().is_empty());
    }

    #[test]
    fn test_from_grid_validation() {
        assert!(matches!(
            Board::from_grid(vec![vec![2, 0], vec![0]], DEFAULT_TARGET, seeded(1)),
            Err(GameError::InvalidGrid(_))
        ));
        assert!(matches!(
            Board::from_grid(vec![vec![3, 0], vec![0, 0]], DEFAULT_TARGET, seeded(1)),
            Err(GameError::InvalidGrid(_))
        ));
        assert!(matches!(
            Board::from_grid(vec![], DEFAULT_TARGET, seeded(1)),
            Err(GameError::InvalidSize(0))
        ));
    }

    #[test]
    fn test_move_left_merges_and_spawns() {
        let mut grid = vec![vec![2, 2, 4, 0]];
        grid.extend(locked_rows());
        let mut board = board(grid);

        assert!(board.move_left());
        assert_eq!(board.cell(0, 0), Some(4));
        assert_eq!(board.cell(0, 1), Some(4));
        assert_eq!(board.score(), 4);
        assert_eq!(board.moves(), 1);

        let spawn = board.last_spawn().unwrap();
        assert_eq!(spawn.row, 0);
        assert!(spawn.col >= 2);
        assert_eq!(board.empty_count(), 1);
    }

    #[test]
    fn test_move_right_and_vertical_moves() {
        let mut board = board(vec![
            vec![2, 0, 0, 0],
            vec![2, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 4],
        ]);

        assert!(board.move_down());
        assert_eq!(board.cell(3, 0), Some(4));
        assert_eq!(board.cell(3, 3), Some(4));
        assert_eq!(board.score(), 4);

        let mut board = self::board(vec![
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![4, 4, 0, 8],
        ]);
        assert!(board.move_right());
        assert_eq!(board.cell(3, 2), Some(8));
        assert_eq!(board.cell(3, 3), Some(8));
        assert_eq!(board.score(), 8);

        let mut board = self::board(vec![
            vec![0, 0, 0, 0],
            vec![0, 2, 0, 0],
            vec![0, 2, 0, 0],
            vec![0, 2, 0, 0],
        ]);
        assert!(board.move_up());
        assert_eq!(board.cell(0, 1), Some(4));
        assert_eq!(board.cell(1, 1), Some(2));
        assert_eq!(board.score(), 4);
    }

    #[test]
    fn test_wall_move_is_noop() {
        let mut board = board(vec![
            vec![2, 4, 0, 0],
            vec![8, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);
        let before = board.snapshot();

        assert!(!board.move_left());
        assert!(!board.move_up());
        assert_eq!(board.snapshot(), before);
        assert_eq!(board.last_spawn(), None);
    }

    #[test]
    fn test_can_move_does_not_mutate() {
        let board = board(vec![
            vec![2, 2, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);
        let before = board.snapshot();
        assert!(board.can_move(Direction::Left));
        assert!(board.can_move(Direction::Down));
        assert!(!board.can_move(Direction::Up));
        assert_eq!(board.snapshot(), before);
        assert_eq!(
            board.legal_directions(),
            vec![Direction::Left, Direction::Right, Direction::Down]
        );
    }

    #[test]
    fn test_locked_board_is_lost() {
        let mut board = board(vec![
            vec![2, 4, 2, 4],
            vec![4, 2, 4, 2],
            vec![2, 4, 2, 4],
            vec![4, 2, 4, 2],
        ]);
        assert_eq!(board.status(), GameStatus::Lost);

        let before = board.snapshot();
        for direction in Direction::ALL {
            assert!(!board.apply_move(direction), "{direction}");
        }
        assert_eq!(board.snapshot(), before);
    }

    #[test]
    fn test_full_board_with_pair_is_active() {
        let board = board(vec![
            vec![2, 4, 2, 4],
            vec![4, 2, 4, 2],
            vec![2, 4, 2, 4],
            vec![4, 2, 4, 4],
        ]);
        assert_eq!(board.status(), GameStatus::Active);
        // The 4,4 pair sits on both the last row and the last column.
        assert_eq!(board.legal_directions().len(), 4);
    }

    #[test]
    fn test_last_move_fills_board_and_loses() {
        // Merging 4+4 into 8 leaves one gap; the spawn fills it and nothing matches.
        let mut board = board(vec![
            vec![4, 4, 16, 32],
            vec![16, 32, 64, 128],
            vec![64, 128, 256, 512],
            vec![256, 512, 1024, 8],
        ]);
        assert!(board.move_left());
        assert_eq!(board.empty_count(), 0);
        // [8, 16, 32, x] with x in {2, 4} cannot merge anywhere.
        assert_eq!(board.status(), GameStatus::Lost);
    }

    #[test]
    fn test_reaching_target_wins_but_allows_moves() {
        let mut board = board(vec![
            vec![1024, 1024, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);
        assert!(board.move_left());
        assert_eq!(board.status(), GameStatus::Won);
        assert_eq!(board.max_tile(), 2048);
        assert_eq!(board.score(), 2048);

        assert!(board.move_right());
        assert_eq!(board.moves(), 2);
        assert_ne!(board.cell(0, 0), Some(2048));
        assert!((0..4).any(|col| board.cell(0, col) == Some(2048)));
        assert_eq!(board.status(), GameStatus::Won);
    }

    #[test]
    fn test_largest_tiles_keep_the_board_consistent() {
        let half = 1u32 << 30;
        let top = 1u32 << 31;

        let mut merging = board(vec![
            vec![half, half, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);
        assert!(merging.move_left());
        assert_eq!(merging.cell(0, 0), Some(top));
        assert_eq!(merging.score(), u64::from(top));

        let mut capped = board(vec![
            vec![top, top, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);
        let before = capped.snapshot();
        assert!(!capped.move_left());
        assert_eq!(capped.snapshot(), before);

        assert!(capped.move_right());
        assert_eq!(capped.cell(0, 2), Some(top));
        assert_eq!(capped.cell(0, 3), Some(top));
        assert_eq!(capped.score(), 0);
        let spawn = capped.last_spawn().unwrap();
        assert_eq!(
            capped.snapshot().tile_sum(),
            before.tile_sum() + u64::from(spawn.value)
        );
    }

    #[test]
    fn test_custom_target() {
        let mut board = Board::from_grid(
            vec![vec![32, 32, 0], vec![0, 0, 0], vec![0, 0, 0]],
            64,
            seeded(11),
        )
        .unwrap();
        assert_eq!(board.status(), GameStatus::Active);
        assert!(board.move_left());
        assert_eq!(board.status(), GameStatus::Won);
    }

    #[test]
    fn test_row_of_four_merges_pairwise() {
        let mut grid = vec![vec![2, 2, 2, 2]];
        grid.extend(locked_rows());
        let mut board = board(grid);

        assert!(board.move_left());
        assert_eq!(board.cell(0, 0), Some(4));
        assert_eq!(board.cell(0, 1), Some(4));
        assert_eq!(board.score(), 8);
    }

    #[test]
    fn test_random_play_invariants() {
        for seed in 0..8u64 {
            let size = 4 + (seed as usize % 3);
            let mut driver = seeded(1000 + seed);
            let mut board = Board::with_rng(size, DEFAULT_TARGET, seeded(seed)).unwrap();

            for _ in 0..400 {
                let before = board.snapshot();
                let direction = Direction::ALL[driver.random_range(0..4)];
                let moved = board.apply_move(direction);
                let after = board.snapshot();

                assert!(after.score >= before.score);
                if !moved {
                    assert_eq!(after, before);
                    continue;
                }

                let spawn = board.last_spawn().expect("a successful move always spawns");
                assert!(spawn.value == 2 || spawn.value == 4);
                let merged_only = slide_cells(
                    &before.grid.concat(),
                    size,
                    direction,
                )
                .0;
                assert_eq!(merged_only[spawn.row * size + spawn.col], 0);
                assert_eq!(after.tile_sum(), before.tile_sum() + u64::from(spawn.value));
                assert_eq!(after.moves, before.moves + 1);

                if board.status() == GameStatus::Lost {
                    assert!(board.legal_directions().is_empty());
                    break;
                }
            }
        }
    }

    #[test]
    fn test_display_renders_rows() {
        let board = board(vec![vec![2, 0], vec![0, 4]]);
        let rendered = board.to_string();
        assert_eq!(rendered.lines().count(), 2);
        assert!(rendered.contains('2'));
        assert!(rendered.contains('.'));
    }
}
