//! Strategy interface consumed by game loops, plus two trivial strategies.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::engine::{Board, Direction, Score};

/// Chooses a direction each turn.
///
/// One instance plays one game: it is created before the first turn and
/// dropped after [`Strategy::notify_outcome`].
pub trait Strategy {
    /// Name used when reporting results.
    fn name(&self) -> String;

    /// Direction to play given the current board and score.
    fn get_move(&mut self, board: &Board, score: Score) -> Direction;

    /// Called once when the game is over. Has no effect on the game.
    fn notify_outcome(&mut self, _board: &Board, _score: Score) {}
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> String { (**self).name() }

    fn get_move(&mut self, board: &Board, score: Score) -> Direction { (**self).get_move(board, score) }

    fn notify_outcome(&mut self, board: &Board, score: Score) { (**self).notify_outcome(board, score) }
}

/// Uniform choice among the four directions.
#[derive(Debug, Clone)]
pub struct RandomStrategy<R = StdRng> {
    rng: R,
}

impl<R: Rng> RandomStrategy<R> {
    pub fn new(rng: R) -> Self { Self { rng } }
}

impl<R: Rng> Strategy for RandomStrategy<R> {
    fn name(&self) -> String { "random".to_string() }

    fn get_move(&mut self, _board: &Board, _score: Score) -> Direction {
        *Direction::ALL.choose(&mut self.rng).unwrap_or(&Direction::Up)
    }
}

/// Round-robin over the directions, starting with `Left`.
#[derive(Debug, Clone, Default)]
pub struct SpinnyStrategy {
    counter: usize,
}

impl SpinnyStrategy {
    pub fn new() -> Self { Self::default() }
}

impl Strategy for SpinnyStrategy {
    fn name(&self) -> String { "spinny".to_string() }

    fn get_move(&mut self, _board: &Board, _score: Score) -> Direction {
        self.counter += 1;
        Direction::ALL[self.counter % Direction::ALL.len()]
    }
}
