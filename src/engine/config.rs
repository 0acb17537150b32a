//! Immutable game configuration: grid size, starting tiles and the spawn table.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::board::{is_valid_tile, Tile};

/// Weights must sum to one within this tolerance.
const WEIGHT_TOLERANCE: f64 = 1e-9;

/// One entry of the spawn table: `tile` appears with probability `weight`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnWeight {
    pub tile: Tile,
    pub weight: f64,
}

impl SpawnWeight {
    pub const fn new(tile: Tile, weight: f64) -> Self { Self { tile, weight } }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: usize, height: usize },
    #[error("tile {0} is not a power of two in [2, 2^30]")]
    InvalidTile(Tile),
    #[error("spawn table is empty")]
    EmptySpawnTable,
    #[error("spawn weight {0} must be finite and positive")]
    InvalidWeight(f64),
    #[error("spawn weights sum to {0}, expected 1")]
    WeightsNotNormalized(f64),
    #[error("{tiles} starting tiles do not fit on {cells} cells")]
    TooManyStartingTiles { tiles: usize, cells: usize },
}

/// Grid dimensions and tile tables shared by [`Board`](super::Board),
/// [`Game`](super::Game) and [`Lookahead`](crate::lookahead::Lookahead).
///
/// A `GameConfig` is validated on construction (including deserialization),
/// so every instance in circulation describes a playable game.
///
/// ```
/// use twentyfortyeight::engine::GameConfig;
/// let cfg = GameConfig::default();
/// assert_eq!((cfg.width(), cfg.height()), (4, 4));
/// assert_eq!(cfg.starting_tiles(), &[2, 2]);
/// assert!(GameConfig::square(0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConfig", into = "RawConfig")]
pub struct GameConfig {
    width: usize,
    height: usize,
    starting_tiles: Vec<Tile>,
    spawn_weights: Vec<SpawnWeight>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 4,
            height: 4,
            starting_tiles: vec![2, 2],
            spawn_weights: default_spawn_weights(),
        }
    }
}

fn default_spawn_weights() -> Vec<SpawnWeight> {
    vec![SpawnWeight::new(2, 0.75), SpawnWeight::new(4, 0.25)]
}

impl GameConfig {
    pub fn new(
        width: usize,
        height: usize,
        starting_tiles: Vec<Tile>,
        spawn_weights: Vec<SpawnWeight>,
    ) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyGrid { width, height });
        }
        if let Some(&bad) = starting_tiles.iter().find(|&&t| !is_valid_tile(t)) {
            return Err(ConfigError::InvalidTile(bad));
        }
        if starting_tiles.len() > width * height {
            return Err(ConfigError::TooManyStartingTiles { tiles: starting_tiles.len(), cells: width * height });
        }
        if spawn_weights.is_empty() {
            return Err(ConfigError::EmptySpawnTable);
        }
        for sw in &spawn_weights {
            if !is_valid_tile(sw.tile) {
                return Err(ConfigError::InvalidTile(sw.tile));
            }
            if !sw.weight.is_finite() || sw.weight <= 0.0 {
                return Err(ConfigError::InvalidWeight(sw.weight));
            }
        }
        let total: f64 = spawn_weights.iter().map(|sw| sw.weight).sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightsNotNormalized(total));
        }
        Ok(Self { width, height, starting_tiles, spawn_weights })
    }

    /// Reference tile tables on an `n`x`n` grid.
    pub fn square(n: usize) -> Result<Self, ConfigError> {
        Self::new(n, n, vec![2, 2], default_spawn_weights())
    }

    #[inline]
    pub fn width(&self) -> usize { self.width }

    #[inline]
    pub fn height(&self) -> usize { self.height }

    #[inline]
    pub fn cells(&self) -> usize { self.width * self.height }

    /// Length of [`Board::as_vector`](super::Board::as_vector) for this grid.
    #[inline]
    pub fn vector_width(&self) -> usize { self.cells() }

    pub fn starting_tiles(&self) -> &[Tile] { &self.starting_tiles }

    pub fn spawn_weights(&self) -> &[SpawnWeight] { &self.spawn_weights }

    /// Draw a spawn tile value from the weighted table.
    pub fn sample_spawn_tile<R: Rng + ?Sized>(&self, rng: &mut R) -> Tile {
        let mut r: f64 = rng.gen();
        for sw in &self.spawn_weights {
            if r < sw.weight {
                return sw.tile;
            }
            r -= sw.weight;
        }
        // Floating slack lands on the last entry.
        self.spawn_weights[self.spawn_weights.len() - 1].tile
    }
}

#[derive(Serialize, Deserialize)]
struct RawConfig {
    width: usize,
    height: usize,
    starting_tiles: Vec<Tile>,
    spawn_weights: Vec<SpawnWeight>,
}

impl TryFrom<RawConfig> for GameConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        GameConfig::new(raw.width, raw.height, raw.starting_tiles, raw.spawn_weights)
    }
}

impl From<GameConfig> for RawConfig {
    fn from(cfg: GameConfig) -> Self {
        RawConfig {
            width: cfg.width,
            height: cfg.height,
            starting_tiles: cfg.starting_tiles,
            spawn_weights: cfg.spawn_weights,
        }
    }
}
