//! Play games to completion and score strategies over many seeded runs.
//!
//! ```
//! use twentyfortyeight::engine::GameConfig;
//! use twentyfortyeight::evaluator::StrategyEvaluator;
//! use twentyfortyeight::strategy::SpinnyStrategy;
//!
//! let eval = StrategyEvaluator::new(GameConfig::default()).with_runs(4).with_seed(1);
//! let result = eval.evaluate(|_| SpinnyStrategy::new());
//! assert_eq!(result.runs, 4);
//! assert!(result.min_score as f64 <= result.mean_score);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::{Board, Direction, Game, GameConfig, Score, Tile, TurnOutcome};
use crate::strategy::Strategy;

/// How a single game went.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    pub score: Score,
    /// Legal turns played.
    pub turns: u64,
    pub illegal_moves: u64,
    pub highest_tile: Tile,
    pub final_board: Board,
    /// False when the turn cap stopped the game early.
    pub finished: bool,
}

/// Drive `game` with `strategy` until no move is possible.
///
/// `max_turns` caps attempted turns (legal or not) for strategies that
/// may never pick a legal direction. [`Strategy::notify_outcome`] is called
/// once, and only when the game actually finished.
pub fn play_game<R, S>(game: &mut Game<R>, strategy: &mut S, max_turns: Option<u64>) -> GameSummary
where
    R: Rng,
    S: Strategy + ?Sized,
{
    play_game_observed(game, strategy, max_turns, |_, _, _| {})
}

/// [`play_game`] with a hook run after every attempted turn.
pub(crate) fn play_game_observed<R, S, F>(
    game: &mut Game<R>,
    strategy: &mut S,
    max_turns: Option<u64>,
    mut observe: F,
) -> GameSummary
where
    R: Rng,
    S: Strategy + ?Sized,
    F: FnMut(Direction, Option<&Board>, TurnOutcome),
{
    let mut turns = 0u64;
    let mut illegal_moves = 0u64;
    let mut finished = true;
    while !game.is_over() {
        if max_turns.is_some_and(|cap| turns + illegal_moves >= cap) {
            finished = false;
            break;
        }
        let direction = strategy.get_move(game.board(), game.score());
        let (intermediate, outcome) = game.do_turn_and_retrieve_intermediate(direction);
        observe(direction, intermediate.as_ref(), outcome);
        match outcome {
            TurnOutcome::Illegal => illegal_moves += 1,
            TurnOutcome::Ok => turns += 1,
            TurnOutcome::GameOver => {
                turns += 1;
                break;
            }
        }
    }
    if finished {
        strategy.notify_outcome(game.board(), game.score());
    }
    GameSummary {
        score: game.score(),
        turns,
        illegal_moves,
        highest_tile: game.board().highest_tile(),
        final_board: game.board().clone(),
        finished,
    }
}

/// Aggregate over many runs of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub strategy: String,
    pub runs: usize,
    pub mean_score: f64,
    pub min_score: Score,
    pub max_score: Score,
    pub mean_turns: f64,
    pub best_tile: Tile,
    /// Runs cut short by the turn cap.
    pub unfinished: usize,
}

impl Evaluation {
    pub fn from_summaries(strategy: String, summaries: &[GameSummary]) -> Self {
        let runs = summaries.len();
        let denom = runs.max(1) as f64;
        Self {
            strategy,
            runs,
            mean_score: summaries.iter().map(|s| s.score as f64).sum::<f64>() / denom,
            min_score: summaries.iter().map(|s| s.score).min().unwrap_or(0),
            max_score: summaries.iter().map(|s| s.score).max().unwrap_or(0),
            mean_turns: summaries.iter().map(|s| s.turns as f64).sum::<f64>() / denom,
            best_tile: summaries.iter().map(|s| s.highest_tile).max().unwrap_or(0),
            unfinished: summaries.iter().filter(|s| !s.finished).count(),
        }
    }
}

/// Plays `runs` independent games per evaluation.
///
/// Run `i` uses `StdRng::seed_from_u64(seed + i)`, so results do not depend on
/// how rayon schedules the runs.
#[derive(Debug, Clone)]
pub struct StrategyEvaluator {
    config: GameConfig,
    runs: usize,
    seed: u64,
    max_turns: Option<u64>,
}

impl StrategyEvaluator {
    pub const DEFAULT_RUNS: usize = 100;

    pub fn new(config: GameConfig) -> Self {
        Self { config, runs: Self::DEFAULT_RUNS, seed: 0, max_turns: None }
    }

    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_turns(mut self, max_turns: Option<u64>) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn runs(&self) -> usize { self.runs }

    /// Seeded game for run `index`.
    pub fn game_for_run(&self, index: usize) -> Game<StdRng> {
        Game::new(self.config.clone(), StdRng::seed_from_u64(self.seed.wrapping_add(index as u64)))
    }

    pub fn play_run<S: Strategy + ?Sized>(&self, index: usize, strategy: &mut S) -> GameSummary {
        let mut game = self.game_for_run(index);
        play_game(&mut game, strategy, self.max_turns)
    }

    /// Evaluate the strategies built by `make_strategy(run_index)`.
    pub fn evaluate<S, F>(&self, make_strategy: F) -> Evaluation
    where
        S: Strategy,
        F: Fn(usize) -> S + Sync,
    {
        self.evaluate_with_progress(make_strategy, |_| {})
    }

    /// Like [`StrategyEvaluator::evaluate`], calling `on_run` as each game ends.
    pub fn evaluate_with_progress<S, F, P>(&self, make_strategy: F, on_run: P) -> Evaluation
    where
        S: Strategy,
        F: Fn(usize) -> S + Sync,
        P: Fn(&GameSummary) + Sync,
    {
        let name = make_strategy(0).name();
        let summaries: Vec<GameSummary> = (0..self.runs)
            .into_par_iter()
            .map(|i| {
                let mut strategy = make_strategy(i);
                let summary = self.play_run(i, &mut strategy);
                on_run(&summary);
                summary
            })
            .collect();
        Evaluation::from_summaries(name, &summaries)
    }
}
