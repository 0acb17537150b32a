//! Rules engine: boards, configuration, directions and the turn state machine.
//!
//! Quick start
//! ```
//! use twentyfortyeight::engine::{Direction, Game, GameConfig, TurnOutcome};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut game = Game::new(GameConfig::default(), StdRng::seed_from_u64(42));
//! assert_eq!(game.board().count_empty(), 14);
//! let outcome = game.do_turn(Direction::Left);
//! assert_ne!(outcome, TurnOutcome::GameOver);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod board;
mod config;
mod game;

pub use board::{smash_column_up, Board, BoardError, Score, Tile, MAX_EXPONENT, MAX_TILE};
pub use config::{ConfigError, GameConfig, SpawnWeight};
pub use game::{Game, TurnOutcome};

/// A direction to slide/merge tiles.
///
/// The discriminant is the number of clockwise quarter turns that bring the
/// direction to `Up`; see [`Board::apply_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Up = 0,
    Left = 1,
    Down = 2,
    Right = 3,
}

impl Direction {
    /// All directions in canonical order.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Left, Direction::Down, Direction::Right];

    /// Clockwise quarter turns needed to point this direction up.
    #[inline]
    pub fn rotations(self) -> usize { self as usize }

    #[inline]
    pub fn as_u8(self) -> u8 { self as u8 }

    pub fn from_u8(v: u8) -> Option<Direction> { Self::ALL.get(v as usize).copied() }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Up => "UP",
            Direction::Left => "LEFT",
            Direction::Down => "DOWN",
            Direction::Right => "RIGHT",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown direction '{0}' (expected up, left, down or right)")]
pub struct ParseDirectionError(String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "u" => Ok(Direction::Up),
            "left" | "l" => Ok(Direction::Left),
            "down" | "d" => Ok(Direction::Down),
            "right" | "r" => Ok(Direction::Right),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}
