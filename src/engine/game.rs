use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Board, Direction, GameConfig, Score, Tile};

/// Result of a single [`Game::do_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// The move was applied and a tile spawned; play continues.
    Ok,
    /// The move would not change the board. Nothing was modified.
    Illegal,
    /// The move was applied and no further move is possible.
    GameOver,
}

impl fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TurnOutcome::Ok => "OK",
            TurnOutcome::Illegal => "ILLEGAL",
            TurnOutcome::GameOver => "GAMEOVER",
        })
    }
}

/// A game in progress: the current board, the running score and the RNG
/// that drives tile spawns.
///
/// The RNG is owned exclusively; with a seeded RNG and the same sequence of
/// directions every turn is reproducible.
#[derive(Debug, Clone)]
pub struct Game<R = StdRng> {
    config: GameConfig,
    board: Board,
    score: Score,
    rng: R,
}

impl<R: Rng> Game<R> {
    /// Empty board plus the configured starting tiles, score 0.
    pub fn new(config: GameConfig, rng: R) -> Self {
        let board = Board::empty(&config);
        let starting = config.starting_tiles().to_vec();
        let mut game = Self::with_state(config, board, 0, rng);
        for tile in starting {
            // GameConfig guarantees the starting tiles fit on the grid.
            let placed = game.spawn_tile(Some(tile));
            debug_assert!(placed, "no room for starting tile {tile}");
        }
        game
    }

    /// Start from an existing board with score 0.
    pub fn with_board(config: GameConfig, board: Board, rng: R) -> Self {
        Self::with_state(config, board, 0, rng)
    }

    /// Resume from an existing board and score.
    pub fn with_state(config: GameConfig, board: Board, score: Score, rng: R) -> Self {
        assert_eq!(
            (board.width(), board.height()),
            (config.width(), config.height()),
            "board dimensions do not match the config"
        );
        Self { config, board, score, rng }
    }

    #[inline]
    pub fn board(&self) -> &Board { &self.board }

    #[inline]
    pub fn score(&self) -> Score { self.score }

    #[inline]
    pub fn config(&self) -> &GameConfig { &self.config }

    /// True once no direction can change the board.
    pub fn is_over(&self) -> bool { !self.board.can_move() }

    /// Smash phase of a turn: slide/merge in `direction` and bank the score.
    ///
    /// Returns false, leaving the game untouched, if the move is illegal.
    pub fn smash(&mut self, direction: Direction) -> bool {
        let (changed, delta, board) = self.board.apply_move(direction);
        if changed {
            self.score += delta;
            self.board = board;
        }
        changed
    }

    /// Smash, spawn a tile, and report whether play can continue.
    pub fn do_turn(&mut self, direction: Direction) -> TurnOutcome {
        self.do_turn_and_retrieve_intermediate(direction).1
    }

    /// Like [`Game::do_turn`] but also returns the board after the smash and
    /// before the spawn (`None` for an illegal move).
    ///
    /// ```
    /// use twentyfortyeight::engine::{Board, Direction, Game, GameConfig, TurnOutcome};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let cfg = GameConfig::default();
    /// let start = Board::empty(&cfg).update((0, 0), 2).update((0, 1), 2);
    /// let mut game = Game::with_board(cfg.clone(), start, StdRng::seed_from_u64(3));
    /// let (intermediate, outcome) = game.do_turn_and_retrieve_intermediate(Direction::Up);
    /// assert_eq!(outcome, TurnOutcome::Ok);
    /// assert_eq!(intermediate, Some(Board::empty(&cfg).update((0, 0), 4)));
    /// assert_eq!(game.score(), 4);
    /// assert_eq!(game.board().count_empty(), 14);
    /// ```
    pub fn do_turn_and_retrieve_intermediate(&mut self, direction: Direction) -> (Option<Board>, TurnOutcome) {
        if !self.smash(direction) {
            return (None, TurnOutcome::Illegal);
        }
        let intermediate = self.board.clone();
        // A legal smash always leaves a gap; checked anyway.
        if !self.spawn_tile(None) {
            return (Some(intermediate), TurnOutcome::GameOver);
        }
        let outcome = if self.board.can_move() { TurnOutcome::Ok } else { TurnOutcome::GameOver };
        (Some(intermediate), outcome)
    }

    /// Place `tile` (or a draw from the spawn table) on a uniformly chosen
    /// empty cell. Returns false when the board is full.
    fn spawn_tile(&mut self, tile: Option<Tile>) -> bool {
        let open: Vec<(usize, usize)> = self.board.empty_cells().collect();
        let Some(&location) = open.choose(&mut self.rng) else {
            return false;
        };
        let tile = tile.unwrap_or_else(|| self.config.sample_spawn_tile(&mut self.rng));
        self.board = self.board.update(location, tile);
        true
    }
}
