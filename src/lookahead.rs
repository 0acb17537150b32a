//! Probability-weighted expansion of boards through moves and tile spawns.
//!
//! A [`Distribution`] maps boards to probability mass. A [`Lookahead`] owns
//! one and produces new distributions:
//! - [`Lookahead::after_move`]: deterministic slide/merge of every board.
//! - [`Lookahead::after_placement`]: every way a tile can spawn on every board.
//! - [`Lookahead::after_turn`]: the two combined the way [`Game`](crate::engine::Game) plays a turn.
//!
//! Mass landing on the same board from different parents is summed.
//!
//! Illegal moves stall: in `after_move` a board the move cannot change stays
//! in the distribution as itself with its mass untouched, so mass is always
//! conserved and nothing is renormalized. [`Lookahead::legal_mass`] reports
//! how much of the distribution the move actually affects.
//!
//! Expansion grows as `(empty cells) × (spawn tiles)` per board per ply.
//! Depth and width limits are the caller's job; see [`Distribution::pruned`]
//! and [`Distribution::truncated`].
//!
//! ```
//! use twentyfortyeight::engine::{Board, Direction, GameConfig};
//! use twentyfortyeight::lookahead::Lookahead;
//!
//! let cfg = GameConfig::default();
//! let start = Board::empty(&cfg).update((3, 0), 2);
//! let look = Lookahead::from_board(cfg.clone(), start);
//! let moved = look.after_move(Direction::Left);
//! assert_eq!(moved.mass(&Board::empty(&cfg).update((0, 0), 2)), 1.0);
//! let spawned = Lookahead::new(cfg, moved).after_placement();
//! assert_eq!(spawned.len(), 15 * 2);
//! assert!(spawned.is_normalized());
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::engine::{Board, Direction, GameConfig};

/// Tolerance for "sums to one".
pub const MASS_TOLERANCE: f64 = 1e-9;

/// Probability mass over boards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    masses: HashMap<Board, f64>,
}

impl Distribution {
    /// All mass on a single board.
    pub fn certain(board: Board) -> Self {
        let mut masses = HashMap::with_capacity(1);
        masses.insert(board, 1.0);
        Self { masses }
    }

    /// Build from `(board, mass)` pairs, summing repeated boards.
    pub fn from_masses<I: IntoIterator<Item = (Board, f64)>>(pairs: I) -> Self {
        pairs.into_iter().fold(Self::default(), |mut dist, (board, mass)| {
            dist.add(board, mass);
            dist
        })
    }

    fn add(&mut self, board: Board, mass: f64) {
        assert!(mass.is_finite() && mass >= 0.0, "invalid probability mass {mass}");
        *self.masses.entry(board).or_insert(0.0) += mass;
    }

    /// Mass on `board` (0 if outside the support).
    pub fn mass(&self, board: &Board) -> f64 { self.masses.get(board).copied().unwrap_or(0.0) }

    pub fn total_mass(&self) -> f64 { self.masses.values().sum() }

    /// Number of boards in the support.
    pub fn len(&self) -> usize { self.masses.len() }

    pub fn is_empty(&self) -> bool { self.masses.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&Board, f64)> + '_ { self.masses.iter().map(|(b, &m)| (b, m)) }

    pub fn support(&self) -> impl Iterator<Item = &Board> + '_ { self.masses.keys() }

    pub fn is_normalized(&self) -> bool { (self.total_mass() - 1.0).abs() <= MASS_TOLERANCE }

    /// Rescale so the masses sum to one.
    ///
    /// Panics if the distribution carries no mass.
    pub fn normalized(&self) -> Distribution {
        let total = self.total_mass();
        assert!(total > 0.0 && total.is_finite(), "cannot normalize a distribution with total mass {total}");
        Self {
            masses: self.masses.iter().map(|(b, &m)| (b.clone(), m / total)).collect(),
        }
    }

    /// Drop boards lighter than `min_mass`. The rest keep their mass.
    pub fn pruned(&self, min_mass: f64) -> Distribution {
        Self {
            masses: self
                .masses
                .iter()
                .filter(|(_, &m)| m >= min_mass)
                .map(|(b, &m)| (b.clone(), m))
                .collect(),
        }
    }

    /// Keep the `k` heaviest boards (ties broken by board order). Not renormalized.
    pub fn truncated(&self, k: usize) -> Distribution {
        Self {
            masses: self
                .sorted()
                .into_iter()
                .take(k)
                .map(|(b, m)| (b.clone(), m))
                .collect(),
        }
    }

    /// Support listed heaviest first, ties in board order.
    pub fn sorted(&self) -> Vec<(&Board, f64)> {
        let mut entries: Vec<(&Board, f64)> = self.iter().collect();
        entries.sort_by(|(ba, ma), (bb, mb)| mb.partial_cmp(ma).unwrap_or(Ordering::Equal).then_with(|| ba.cmp(bb)));
        entries
    }
}

impl FromIterator<(Board, f64)> for Distribution {
    fn from_iter<I: IntoIterator<Item = (Board, f64)>>(iter: I) -> Self { Self::from_masses(iter) }
}

/// Expands a [`Distribution`] one move or spawn at a time.
///
/// Expansions never modify `self`; each returns a fresh distribution.
#[derive(Debug, Clone)]
pub struct Lookahead {
    config: GameConfig,
    distribution: Distribution,
}

impl Lookahead {
    pub fn new(config: GameConfig, distribution: Distribution) -> Self { Self { config, distribution } }

    /// Start from a single known board.
    pub fn from_board(config: GameConfig, board: Board) -> Self { Self::new(config, Distribution::certain(board)) }

    #[inline]
    pub fn config(&self) -> &GameConfig { &self.config }

    #[inline]
    pub fn distribution(&self) -> &Distribution { &self.distribution }

    pub fn into_distribution(self) -> Distribution { self.distribution }

    /// Move every board in `direction`. Each board's mass follows its image;
    /// boards the move cannot change keep their mass in place.
    pub fn after_move(&self, direction: Direction) -> Distribution {
        self.distribution
            .iter()
            .map(|(board, mass)| (board.apply_move(direction).2, mass))
            .collect()
    }

    /// Mass on boards for which `direction` is a legal move.
    pub fn legal_mass(&self, direction: Direction) -> f64 {
        self.distribution
            .iter()
            .filter(|(board, _)| board.apply_move(direction).0)
            .map(|(_, mass)| mass)
            .sum()
    }

    /// Mass-weighted merge score earned by moving in `direction`.
    pub fn expected_score(&self, direction: Direction) -> f64 {
        self.distribution
            .iter()
            .map(|(board, mass)| board.apply_move(direction).1 as f64 * mass)
            .sum()
    }

    /// Spawn a tile on every board in every possible way.
    ///
    /// A child gets `mass × weight / empty_cells` from each (parent, cell,
    /// tile) producing it. Full boards pass through unchanged.
    pub fn after_placement(&self) -> Distribution {
        let mut out = Distribution::default();
        for (board, mass) in self.distribution.iter() {
            self.place_into(&mut out, board, mass);
        }
        out
    }

    /// A full turn: boards the move changes are smashed and then spawned on;
    /// boards it cannot change stay put with no spawn, as in
    /// [`Game::do_turn`](crate::engine::Game::do_turn).
    pub fn after_turn(&self, direction: Direction) -> Distribution {
        let mut out = Distribution::default();
        for (board, mass) in self.distribution.iter() {
            let (changed, _, moved) = board.apply_move(direction);
            if changed {
                self.place_into(&mut out, &moved, mass);
            } else {
                out.add(board.clone(), mass);
            }
        }
        out
    }

    fn place_into(&self, out: &mut Distribution, board: &Board, mass: f64) {
        let open: Vec<(usize, usize)> = board.empty_cells().collect();
        if open.is_empty() {
            out.add(board.clone(), mass);
            return;
        }
        let per_cell = mass / open.len() as f64;
        for &cell in &open {
            for sw in self.config.spawn_weights() {
                out.add(board.update(cell, sw.tile), per_cell * sw.weight);
            }
        }
    }
}
