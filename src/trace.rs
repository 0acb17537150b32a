//! Recorded games and their compact binary trace format.
//!
//! A trace keeps, for every legal turn, the direction played and the board
//! right after the smash (before the spawn), vector-encoded. Those
//! intermediate boards paired with the number of turns remaining make
//! training examples for value estimators.
//!
//! Layout (little-endian), followed by a CRC32C of everything before it:
//!
//! ```text
//! "TFE1" | version u8 | endian u8 | width u16 | height u16 | steps u32
//! | score u64 | highest_tile u32 | start_unix_s u64 | name_len u16 | name
//! | steps x (direction u8, width*height exponent bytes)
//! | final board (width*height exponent bytes) | crc32c u32
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::{Board, BoardError, Direction, Game, Score, Tile};
use crate::evaluator::play_game_observed;
use crate::strategy::Strategy;

const MAGIC: &[u8; 4] = b"TFE1";
const VERSION: u8 = 1;
const ENDIAN_LE: u8 = 0;
// magic + version + endian + width + height + steps + score + highest + start + name_len
const HEADER_LEN: usize = 4 + 1 + 1 + 2 + 2 + 4 + 8 + 4 + 8 + 2;
const CHECKSUM_LEN: usize = 4;

#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid magic or version")]
    MagicOrVersion,
    #[error("unsupported endianness")]
    Endianness,
    #[error("file too short or malformed")]
    Malformed,
    #[error("checksum mismatch")]
    Checksum,
    #[error("{0} does not fit the trace header")]
    TooLarge(&'static str),
    #[error("bad board in trace: {0}")]
    Board(#[from] BoardError),
}

/// One legal turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub direction: Direction,
    /// Post-smash, pre-spawn board as [`Board::as_vector`].
    pub intermediate: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTrace {
    pub width: usize,
    pub height: usize,
    pub strategy: Option<String>,
    pub score: Score,
    pub highest_tile: Tile,
    pub start_unix_s: u64,
    pub steps: Vec<TraceStep>,
    pub final_board: Vec<u8>,
}

impl GameTrace {
    /// Play `game` to the end with `strategy`, keeping every legal turn.
    pub fn record_game<R, S>(game: &mut Game<R>, strategy: &mut S, max_turns: Option<u64>) -> GameTrace
    where
        R: Rng,
        S: Strategy + ?Sized,
    {
        let start_unix_s = now_unix_seconds();
        let mut steps = Vec::new();
        let summary = play_game_observed(game, strategy, max_turns, |direction, intermediate, _| {
            if let Some(board) = intermediate {
                steps.push(TraceStep { direction, intermediate: board.as_vector() });
            }
        });
        GameTrace {
            width: game.config().width(),
            height: game.config().height(),
            strategy: Some(strategy.name()),
            score: summary.score,
            highest_tile: summary.highest_tile,
            start_unix_s,
            steps,
            final_board: summary.final_board.as_vector(),
        }
    }

    pub fn len(&self) -> usize { self.steps.len() }

    pub fn is_empty(&self) -> bool { self.steps.is_empty() }

    /// `(intermediate, turns_remaining)` pairs; the last turn has 1 remaining.
    pub fn labelled_examples(&self) -> impl Iterator<Item = (&[u8], u32)> + '_ {
        let n = self.steps.len();
        self.steps
            .iter()
            .enumerate()
            .map(move |(i, step)| (step.intermediate.as_slice(), (n - i) as u32))
    }

    pub fn intermediate_boards(&self) -> Result<Vec<Board>, BoardError> {
        self.steps
            .iter()
            .map(|s| Board::from_vector_sized(self.width, self.height, &s.intermediate))
            .collect()
    }

    pub fn final_board(&self) -> Result<Board, BoardError> {
        Board::from_vector_sized(self.width, self.height, &self.final_board)
    }

    pub fn encode(&self) -> Result<Vec<u8>, TraceError> {
        let width: u16 = self.width.try_into().map_err(|_| TraceError::TooLarge("width"))?;
        let height: u16 = self.height.try_into().map_err(|_| TraceError::TooLarge("height"))?;
        let steps: u32 = self.steps.len().try_into().map_err(|_| TraceError::TooLarge("step count"))?;
        let name = self.strategy.as_deref().unwrap_or("").as_bytes();
        let name_len: u16 = name.len().try_into().map_err(|_| TraceError::TooLarge("strategy name"))?;

        let cells = self.width * self.height;
        if self.final_board.len() != cells || self.steps.iter().any(|s| s.intermediate.len() != cells) {
            return Err(TraceError::Malformed);
        }
        let payload_len = name.len() + self.steps.len() * (1 + cells) + cells;
        let mut buf = Vec::with_capacity(HEADER_LEN + payload_len + CHECKSUM_LEN);

        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.push(ENDIAN_LE);
        buf.extend_from_slice(&width.to_le_bytes());
        buf.extend_from_slice(&height.to_le_bytes());
        buf.extend_from_slice(&steps.to_le_bytes());
        buf.extend_from_slice(&self.score.to_le_bytes());
        buf.extend_from_slice(&self.highest_tile.to_le_bytes());
        buf.extend_from_slice(&self.start_unix_s.to_le_bytes());
        buf.extend_from_slice(&name_len.to_le_bytes());
        buf.extend_from_slice(name);

        for step in &self.steps {
            buf.push(step.direction.as_u8());
            buf.extend_from_slice(&step.intermediate);
        }
        buf.extend_from_slice(&self.final_board);

        let checksum = crc32c::crc32c(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        Ok(buf)
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TraceError> {
        let data = self.encode()?;
        let mut f = fs::File::create(path)?;
        f.write_all(&data)?;
        Ok(())
    }

    /// Decode a trace. The checksum is verified before any field is read,
    /// and every stored board is validated.
    pub fn parse_bytes(bytes: &[u8]) -> Result<GameTrace, TraceError> {
        if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(TraceError::Malformed);
        }
        let (content, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        let mut trailer = Cursor::new(trailer);
        if trailer.u32()? != crc32c::crc32c(content) {
            return Err(TraceError::Checksum);
        }

        let mut r = Cursor::new(content);
        if r.take(4)? != MAGIC || r.u8()? != VERSION {
            return Err(TraceError::MagicOrVersion);
        }
        if r.u8()? != ENDIAN_LE {
            return Err(TraceError::Endianness);
        }
        let width = r.u16()? as usize;
        let height = r.u16()? as usize;
        let steps = r.u32()? as usize;
        let score = r.u64()?;
        let highest_tile = r.u32()?;
        let start_unix_s = r.u64()?;
        let name_len = r.u16()? as usize;
        let strategy = match name_len {
            0 => None,
            n => Some(std::str::from_utf8(r.take(n)?).map_err(|_| TraceError::Malformed)?.to_string()),
        };

        let cells = width * height;
        let body_len = steps.checked_mul(1 + cells).and_then(|b| b.checked_add(cells)).ok_or(TraceError::Malformed)?;
        if r.remaining() != body_len {
            return Err(TraceError::Malformed);
        }

        let mut parsed = Vec::with_capacity(steps);
        for _ in 0..steps {
            let direction = Direction::from_u8(r.u8()?).ok_or(TraceError::Malformed)?;
            let intermediate = r.take(cells)?.to_vec();
            Board::from_vector_sized(width, height, &intermediate)?;
            parsed.push(TraceStep { direction, intermediate });
        }
        let final_board = r.take(cells)?.to_vec();
        Board::from_vector_sized(width, height, &final_board)?;

        Ok(GameTrace { width, height, strategy, score, highest_tile, start_unix_s, steps: parsed, final_board })
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<GameTrace, TraceError> {
        let data = fs::read(path)?;
        Self::parse_bytes(&data)
    }
}

/// Bounds-checked little-endian reader.
struct Cursor<'a> {
    bytes: &'a [u8],
    off: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self { Self { bytes, off: 0 } }

    fn remaining(&self) -> usize { self.bytes.len() - self.off }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TraceError> {
        let end = self.off.checked_add(n).ok_or(TraceError::Malformed)?;
        let out = self.bytes.get(self.off..end).ok_or(TraceError::Malformed)?;
        self.off = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], TraceError> {
        self.take(N)?.try_into().map_err(|_| TraceError::Malformed)
    }

    fn u8(&mut self) -> Result<u8, TraceError> { Ok(self.array::<1>()?[0]) }

    fn u16(&mut self) -> Result<u16, TraceError> { Ok(u16::from_le_bytes(self.array()?)) }

    fn u32(&mut self) -> Result<u32, TraceError> { Ok(u32::from_le_bytes(self.array()?)) }

    fn u64(&mut self) -> Result<u64, TraceError> { Ok(u64::from_le_bytes(self.array()?)) }
}

pub fn now_unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
