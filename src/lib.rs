//! twentyfortyeight: a configurable 2048 rules engine plus probabilistic lookahead
//!
//! This crate provides:
//! - An immutable `Board` over any W×H grid, with slide/merge, rotation and vector encoding (`engine`)
//! - A `Game` state machine that owns a seeded RNG for reproducible tile spawns
//! - Exact distributions over future boards after moves and spawns (`lookahead`)
//! - A `Strategy` interface with a seeded parallel evaluator (`strategy`, `evaluator`)
//! - A checksummed binary trace format for recorded games (`trace`)
//!
//! Quick start:
//! ```
//! use twentyfortyeight::engine::{Direction, Game, GameConfig};
//! use twentyfortyeight::lookahead::Lookahead;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let cfg = GameConfig::default();
//! let mut game = Game::new(cfg.clone(), StdRng::seed_from_u64(42));
//! game.do_turn(Direction::Left);
//!
//! let look = Lookahead::from_board(cfg, game.board().clone());
//! let next = look.after_turn(Direction::Up);
//! assert!(next.is_normalized());
//! ```
pub mod engine;
pub mod evaluator;
pub mod lookahead;
pub mod strategy;
pub mod trace;
