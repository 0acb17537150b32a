use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;

use twentyfortyeight::engine::{Direction, Game, GameConfig};
use twentyfortyeight::evaluator::{play_game, StrategyEvaluator};
use twentyfortyeight::lookahead::{Distribution, Lookahead};
use twentyfortyeight::strategy::{RandomStrategy, SpinnyStrategy, Strategy};
use twentyfortyeight::trace::GameTrace;

#[derive(Parser, Debug)]
#[command(name = "twentyfortyeight", version, about = "Play, evaluate and look ahead in 2048-style games")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug, Clone)]
struct GameArgs {
    /// Grid width
    #[arg(long, default_value_t = 4)]
    width: usize,
    /// Grid height
    #[arg(long, default_value_t = 4)]
    height: usize,
    /// Seed for tile spawns (and the random strategy)
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl GameArgs {
    fn config(&self) -> anyhow::Result<GameConfig> {
        let defaults = GameConfig::default();
        GameConfig::new(
            self.width,
            self.height,
            defaults.starting_tiles().to_vec(),
            defaults.spawn_weights().to_vec(),
        )
        .with_context(|| format!("invalid {}x{} grid", self.width, self.height))
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StrategyKind {
    Random,
    Spinny,
}

impl StrategyKind {
    fn build(self, seed: u64) -> Box<dyn Strategy> {
        match self {
            StrategyKind::Random => Box::new(RandomStrategy::new(StdRng::seed_from_u64(seed))),
            StrategyKind::Spinny => Box::new(SpinnyStrategy::new()),
        }
    }
}

// Keeps the strategy's stream apart from the spawn stream of the same run.
fn strategy_seed(seed: u64, run: usize) -> u64 { (seed ^ 0x5EED_5EED_5EED_5EED).wrapping_add(run as u64) }

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a single game and print the result
    Play {
        #[command(flatten)]
        game: GameArgs,
        #[arg(long, value_enum, default_value_t = StrategyKind::Random)]
        strategy: StrategyKind,
        /// Stop after this many attempted turns
        #[arg(long)]
        max_turns: Option<u64>,
        /// Print the final board
        #[arg(long)]
        show: bool,
    },
    /// Play many seeded games in parallel and summarise the scores
    Evaluate {
        #[command(flatten)]
        game: GameArgs,
        #[arg(long, value_enum, default_value_t = StrategyKind::Random)]
        strategy: StrategyKind,
        #[arg(long, default_value_t = StrategyEvaluator::DEFAULT_RUNS)]
        runs: usize,
        #[arg(long)]
        max_turns: Option<u64>,
        /// Print the summary as JSON on stdout
        #[arg(long)]
        json: bool,
        /// No progress bar
        #[arg(long)]
        quiet: bool,
    },
    /// Play one game and write its binary trace
    Record {
        #[command(flatten)]
        game: GameArgs,
        #[arg(long, value_enum, default_value_t = StrategyKind::Random)]
        strategy: StrategyKind,
        #[arg(long)]
        max_turns: Option<u64>,
        /// Output trace file
        #[arg(short = 'o', long = "out", value_name = "FILE")]
        out: PathBuf,
    },
    /// Expand the board distribution of a new game through repeated turns
    Lookahead {
        #[command(flatten)]
        game: GameArgs,
        /// Direction played every ply
        #[arg(long, default_value = "left")]
        direction: Direction,
        #[arg(long, default_value_t = 2)]
        depth: usize,
        /// Drop boards below this mass after each ply
        #[arg(long)]
        min_mass: Option<f64>,
        /// Keep only the heaviest K boards after each ply
        #[arg(long)]
        beam: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Play { game: args, strategy, max_turns, show } => {
            let mut game = Game::new(args.config()?, StdRng::seed_from_u64(args.seed));
            let mut strategy = strategy.build(strategy_seed(args.seed, 0));
            let start = Instant::now();
            let summary = play_game(&mut game, &mut strategy, max_turns);
            if show {
                println!("{}", summary.final_board);
            }
            println!(
                "strategy: {} | score: {} | turns: {} | illegal: {} | highest tile: {}{}",
                strategy.name(),
                summary.score,
                summary.turns,
                summary.illegal_moves,
                summary.highest_tile,
                if summary.finished { "" } else { " (turn cap reached)" }
            );
            eprintln!("Played in {:.2?}", start.elapsed());
        }
        Command::Evaluate { game: args, strategy, runs, max_turns, json, quiet } => {
            let evaluator = StrategyEvaluator::new(args.config()?)
                .with_runs(runs)
                .with_seed(args.seed)
                .with_max_turns(max_turns);
            let pb = if quiet { ProgressBar::hidden() } else { ProgressBar::new(runs as u64) };
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} games ({eta})")?
                    .progress_chars("=>-"),
            );
            let seed = args.seed;
            let result = evaluator.evaluate_with_progress(|i| strategy.build(strategy_seed(seed, i)), |_| pb.inc(1));
            pb.finish_and_clear();
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "strategy: {} | runs: {} | mean score: {:.1} | min: {} | max: {} | mean turns: {:.1} | best tile: {}",
                    result.strategy,
                    result.runs,
                    result.mean_score,
                    result.min_score,
                    result.max_score,
                    result.mean_turns,
                    result.best_tile
                );
            }
            if result.unfinished > 0 {
                eprintln!("{} of {} games hit the turn cap", result.unfinished, result.runs);
            }
        }
        Command::Record { game: args, strategy, max_turns, out } => {
            let mut game = Game::new(args.config()?, StdRng::seed_from_u64(args.seed));
            let mut strategy = strategy.build(strategy_seed(args.seed, 0));
            let trace = GameTrace::record_game(&mut game, &mut strategy, max_turns);
            trace.write_to_path(&out).with_context(|| format!("writing trace to {}", out.display()))?;
            eprintln!("Wrote trace: steps={}, score={}, file={}", trace.len(), trace.score, out.display());
        }
        Command::Lookahead { game: args, direction, depth, min_mass, beam } => {
            let config = args.config()?;
            if min_mass.is_some_and(|m| !(0.0..1.0).contains(&m)) {
                bail!("--min-mass must be in [0, 1)");
            }
            let game = Game::new(config.clone(), StdRng::seed_from_u64(args.seed));
            println!("{}", game.board());
            let mut look = Lookahead::from_board(config.clone(), game.board().clone());
            for ply in 1..=depth {
                let legal = look.legal_mass(direction);
                let expected = look.expected_score(direction);
                let mut next: Distribution = look.after_turn(direction);
                if let Some(m) = min_mass {
                    next = next.pruned(m);
                }
                if let Some(k) = beam {
                    next = next.truncated(k);
                }
                println!(
                    "ply {ply}: {direction} | boards: {} | total mass: {:.6} | legal mass: {:.6} | expected score: {:.2}",
                    next.len(),
                    next.total_mass(),
                    legal,
                    expected
                );
                look = Lookahead::new(config.clone(), next);
            }
        }
    }
    Ok(())
}
