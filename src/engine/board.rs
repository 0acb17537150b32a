use std::fmt;

use super::{Direction, GameConfig};

/// Tile value: 0 for an empty cell, otherwise a power of two >= 2.
pub type Tile = u32;
/// Accumulated merge score.
pub type Score = u64;

/// Largest log2 exponent a valid [`Tile`] may have.
pub const MAX_EXPONENT: u8 = (Tile::BITS - 2) as u8;
/// Largest valid tile. Two of these never merge, so merges cannot overflow.
pub const MAX_TILE: Tile = 1 << MAX_EXPONENT;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("vector has {actual} entries, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("exponent {0} does not encode a tile")]
    ExponentOutOfRange(u8),
    #[error("board needs at least one row and one column")]
    Empty,
    #[error("columns have differing lengths")]
    Ragged,
    #[error("tile {0} is neither empty nor a power of two in [2, 2^30]")]
    InvalidTile(Tile),
}

#[inline]
pub(crate) fn is_valid_tile(tile: Tile) -> bool { tile >= 2 && tile <= MAX_TILE && tile.is_power_of_two() }

#[inline]
fn merges_with(a: Tile, b: Tile) -> bool { a == b && a < MAX_TILE }

/// Immutable W×H grid of tiles.
///
/// Cells are stored column-major (`x * height + y`), with `x` increasing
/// rightward and `y` increasing downward. Every operation returns a new
/// board; equality, hashing and ordering cover the dimensions and every cell,
/// so boards can key the maps in [`crate::lookahead`].
///
/// ```
/// use twentyfortyeight::engine::{Board, Direction, GameConfig};
/// let cfg = GameConfig::default();
/// let b = Board::empty(&cfg).update((0, 0), 2).update((0, 3), 2);
/// let (changed, score, up) = b.apply_move(Direction::Up);
/// assert!(changed);
/// assert_eq!(score, 4);
/// assert_eq!(up.get(0, 0), 4);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Box<[Tile]>,
}

impl Board {
    /// All-empty board sized by `config`.
    pub fn empty(config: &GameConfig) -> Self {
        Self::blank(config.width(), config.height())
    }

    fn blank(width: usize, height: usize) -> Self {
        Self::from_cells(width, height, vec![0; width * height])
    }

    fn from_cells(width: usize, height: usize, cells: Vec<Tile>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Board { width, height, cells: cells.into_boxed_slice() }
    }

    /// Build a board from its columns (`columns[x][y]`).
    pub fn from_columns<C: AsRef<[Tile]>>(columns: &[C]) -> Result<Self, BoardError> {
        let width = columns.len();
        let height = columns.first().map_or(0, |c| c.as_ref().len());
        if width == 0 || height == 0 {
            return Err(BoardError::Empty);
        }
        let mut cells = Vec::with_capacity(width * height);
        for col in columns {
            let col = col.as_ref();
            if col.len() != height {
                return Err(BoardError::Ragged);
            }
            if let Some(&bad) = col.iter().find(|&&t| t != 0 && !is_valid_tile(t)) {
                return Err(BoardError::InvalidTile(bad));
            }
            cells.extend_from_slice(col);
        }
        Ok(Self::from_cells(width, height, cells))
    }

    /// Build a board from its rows (`rows[y][x]`), i.e. the way it is drawn.
    pub fn from_rows<R: AsRef<[Tile]>>(rows: &[R]) -> Result<Self, BoardError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        if rows.iter().any(|r| r.as_ref().len() != width) {
            return Err(BoardError::Ragged);
        }
        let columns: Vec<Vec<Tile>> = (0..width)
            .map(|x| (0..height).map(|y| rows[y].as_ref()[x]).collect())
            .collect();
        Self::from_columns(&columns)
    }

    #[inline]
    pub fn width(&self) -> usize { self.width }

    #[inline]
    pub fn height(&self) -> usize { self.height }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "cell ({x}, {y}) is outside the {}x{} board",
            self.width,
            self.height
        );
        x * self.height + y
    }

    /// Tile at column `x`, row `y`. Panics when out of range.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Tile { self.cells[self.index(x, y)] }

    /// New board equal to this one except at `location`.
    ///
    /// No emptiness check is made; callers decide which cells to fill.
    pub fn update(&self, location: (usize, usize), tile: Tile) -> Board {
        let (x, y) = location;
        let idx = self.index(x, y);
        let mut cells = self.cells.to_vec();
        cells[idx] = tile;
        Self::from_cells(self.width, self.height, cells)
    }

    /// The `x`th column, top to bottom.
    pub fn column(&self, x: usize) -> &[Tile] {
        assert!(x < self.width, "column {x} is outside the {}-wide board", self.width);
        &self.cells[x * self.height..(x + 1) * self.height]
    }

    /// The `y`th row, left to right.
    pub fn row(&self, y: usize) -> impl Iterator<Item = Tile> + '_ {
        assert!(y < self.height, "row {y} is outside the {}-high board", self.height);
        (0..self.width).map(move |x| self.cells[x * self.height + y])
    }

    pub fn columns(&self) -> impl Iterator<Item = &[Tile]> + '_ { self.cells.chunks_exact(self.height) }

    /// Rotate 90° clockwise in screen coordinates. Width and height swap.
    pub fn rotate_cw(&self) -> Board {
        let (w, h) = (self.width, self.height);
        let mut cells = Vec::with_capacity(self.cells.len());
        for nx in 0..h {
            for ny in 0..w {
                cells.push(self.get(ny, h - 1 - nx));
            }
        }
        Self::from_cells(h, w, cells)
    }

    /// Rotate 90° counter-clockwise in screen coordinates. Width and height swap.
    pub fn rotate_ccw(&self) -> Board {
        let (w, h) = (self.width, self.height);
        let mut cells = Vec::with_capacity(self.cells.len());
        for nx in 0..h {
            for ny in 0..w {
                cells.push(self.get(w - 1 - ny, nx));
            }
        }
        Self::from_cells(h, w, cells)
    }

    /// Smash every column upward. Returns `(changed, score, board)`, where
    /// `changed` is true if any column changed and `score` sums all merges.
    pub fn smash_up(&self) -> (bool, Score, Board) {
        let mut changed = false;
        let mut score = 0;
        let mut cells = Vec::with_capacity(self.cells.len());
        for col in self.columns() {
            let (col_changed, col_score, new_col) = smash_column_up(col);
            changed |= col_changed;
            score += col_score;
            cells.extend(new_col);
        }
        (changed, score, Self::from_cells(self.width, self.height, cells))
    }

    /// Slide and merge in `direction`, without spawning a tile.
    ///
    /// The board is turned clockwise `direction.rotations()` times so the
    /// move points up, smashed up, then turned back.
    pub fn apply_move(&self, direction: Direction) -> (bool, Score, Board) {
        let turns = direction.rotations();
        let rotated = (0..turns).fold(self.clone(), |b, _| b.rotate_cw());
        let (changed, score, smashed) = rotated.smash_up();
        let restored = (0..turns).fold(smashed, |b, _| b.rotate_ccw());
        (changed, score, restored)
    }

    /// True iff some direction's move would change the board.
    ///
    /// Answered from adjacency alone, without smashing.
    pub fn can_move(&self) -> bool {
        if self.cells.iter().any(|&t| t == 0) {
            // Any tile next to a gap can slide into it.
            return self.cells.iter().any(|&t| t != 0);
        }
        let vertical = self.columns().any(|c| c.windows(2).any(|p| merges_with(p[0], p[1])));
        vertical
            || (0..self.height).any(|y| (1..self.width).any(|x| merges_with(self.get(x - 1, y), self.get(x, y))))
    }

    /// Coordinates of empty cells in column-major order.
    pub fn empty_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let h = self.height;
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &t)| t == 0)
            .map(move |(i, _)| (i / h, i % h))
    }

    pub fn count_empty(&self) -> usize { self.cells.iter().filter(|&&t| t == 0).count() }

    /// Highest tile on the board (0 when empty).
    pub fn highest_tile(&self) -> Tile { self.cells.iter().copied().max().unwrap_or(0) }

    pub fn tile_sum(&self) -> Score { self.cells.iter().map(|&t| Score::from(t)).sum() }

    /// Column-major log2 encoding: 0 for empty, `k` for tile `2^k`.
    pub fn as_vector(&self) -> Vec<u8> {
        self.cells
            .iter()
            .map(|&t| if t == 0 { 0 } else { t.trailing_zeros() as u8 })
            .collect()
    }

    /// Exact inverse of [`Board::as_vector`] for a board sized by `config`.
    ///
    /// ```
    /// use twentyfortyeight::engine::{Board, GameConfig};
    /// let cfg = GameConfig::default();
    /// let b = Board::empty(&cfg).update((1, 2), 8);
    /// let v = b.as_vector();
    /// assert_eq!(v[1 * 4 + 2], 3);
    /// assert_eq!(Board::from_vector(&cfg, &v).unwrap(), b);
    /// ```
    pub fn from_vector(config: &GameConfig, vector: &[u8]) -> Result<Board, BoardError> {
        Self::from_vector_sized(config.width(), config.height(), vector)
    }

    /// [`Board::from_vector`] with explicit dimensions.
    pub fn from_vector_sized(width: usize, height: usize, vector: &[u8]) -> Result<Board, BoardError> {
        if width == 0 || height == 0 {
            return Err(BoardError::Empty);
        }
        let expected = width * height;
        if vector.len() != expected {
            return Err(BoardError::LengthMismatch { expected, actual: vector.len() });
        }
        let cells = vector
            .iter()
            .map(|&k| match k {
                0 => Ok(0),
                1..=MAX_EXPONENT => Ok(1 << k),
                _ => Err(BoardError::ExponentOutOfRange(k)),
            })
            .collect::<Result<Vec<Tile>, _>>()?;
        Ok(Self::from_cells(width, height, cells))
    }
}

/// Smash one column toward index 0.
///
/// Non-zero tiles are packed upward; walking from the top, each adjacent
/// equal pair merges once into its double (no chained merges), and the
/// doubled value is added to the score. Tiles of [`MAX_TILE`] or more never
/// merge. Returns `(changed, score, column)`.
///
/// ```
/// use twentyfortyeight::engine::smash_column_up;
/// assert_eq!(smash_column_up(&[2, 2, 0, 0]), (true, 4, vec![4, 0, 0, 0]));
/// assert_eq!(smash_column_up(&[2, 0, 0, 0]), (false, 0, vec![2, 0, 0, 0]));
/// ```
pub fn smash_column_up(column: &[Tile]) -> (bool, Score, Vec<Tile>) {
    let mut out = Vec::with_capacity(column.len());
    let mut score = 0;
    let mut tiles = column.iter().copied().filter(|&t| t != 0).peekable();
    while let Some(tile) = tiles.next() {
        if tiles.next_if(|&next| merges_with(tile, next)).is_some() {
            let merged = tile << 1;
            score += Score::from(merged);
            out.push(merged);
        } else {
            out.push(tile);
        }
    }
    out.resize(column.len(), 0);
    (out.as_slice() != column, score, out)
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({}x{}, rows=[", self.width, self.height)?;
        for y in 0..self.height {
            if y > 0 {
                write!(f, ", ")?;
            }
            let row: Vec<Tile> = self.row(y).collect();
            write!(f, "{row:?}")?;
        }
        write!(f, "])")
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell_width = self.highest_tile().max(2).to_string().len();
        let rule = "-".repeat((cell_width + 1) * self.width + 1);
        writeln!(f, "{rule}")?;
        for y in 0..self.height {
            write!(f, "|")?;
            for tile in self.row(y) {
                if tile == 0 {
                    write!(f, "{:>cell_width$}|", "")?;
                } else {
                    write!(f, "{tile:>cell_width$}|")?;
                }
            }
            writeln!(f)?;
        }
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SpawnWeight;

    fn cfg() -> GameConfig { GameConfig::default() }

    // Seen in real play.
    fn realistic() -> Board {
        Board::from_columns(&[[2, 128, 8, 8], [8, 8, 16, 0], [4, 32, 4, 0], [2, 4, 0, 0]]).unwrap()
    }

    #[test]
    fn empty_board() {
        let b = Board::empty(&cfg());
        assert_eq!((b.width(), b.height()), (4, 4));
        assert_eq!(b.count_empty(), 16);
        assert_eq!(b.highest_tile(), 0);
        assert!(!b.can_move());
    }

    #[test]
    fn get_column_row() {
        let b = realistic();
        assert_eq!(b.get(1, 0), 8);
        assert_eq!(b.get(0, 2), 8);
        assert_eq!(b.get(3, 3), 0);
        assert_eq!(b.column(0), &[2, 128, 8, 8]);
        assert_eq!(b.row(0).collect::<Vec<_>>(), vec![2, 8, 4, 2]);
        assert_eq!(b.columns().count(), 4);
    }

    #[test]
    #[should_panic]
    fn get_out_of_range_panics() {
        realistic().get(4, 0);
    }

    #[test]
    fn update_returns_new_board() {
        let b = realistic();
        let c = b.update((1, 2), 64);
        assert_ne!(b, c);
        assert_eq!(c.get(1, 2), 64);
        assert_eq!(b.get(1, 2), 16);
    }

    #[test]
    fn from_rows_matches_from_columns() {
        let rows = Board::from_rows(&[[2, 8, 4, 2], [128, 8, 32, 4], [8, 16, 4, 0], [8, 0, 0, 0]]).unwrap();
        assert_eq!(rows, realistic());
    }

    #[test]
    fn constructor_errors() {
        let none: [[Tile; 0]; 0] = [];
        assert_eq!(Board::from_columns(&none), Err(BoardError::Empty));
        assert_eq!(Board::from_columns(&[vec![2, 0], vec![2]]), Err(BoardError::Ragged));
        assert_eq!(Board::from_columns(&[[2, 3]]), Err(BoardError::InvalidTile(3)));
        assert_eq!(Board::from_columns(&[[1, 0]]), Err(BoardError::InvalidTile(1)));
    }

    #[test]
    fn rotations() {
        let b = realistic();
        assert_eq!(b.get(0, 1), b.rotate_cw().get(2, 0));
        assert_eq!(b.get(0, 1), b.rotate_ccw().get(1, 3));
        assert_eq!(b.rotate_cw().rotate_cw(), b.rotate_ccw().rotate_ccw());
        assert_eq!(b.rotate_cw().rotate_cw().rotate_cw(), b.rotate_ccw());
        assert_eq!(b.rotate_cw().rotate_ccw(), b);
    }

    #[test]
    fn rectangular_rotation_swaps_dimensions() {
        let b = Board::from_rows(&[[2, 4, 8], [16, 0, 32]]).unwrap();
        let r = b.rotate_cw();
        assert_eq!((r.width(), r.height()), (2, 3));
        // Bottom-left corner ends up top-left.
        assert_eq!(r.get(0, 0), 16);
        assert_eq!(r.get(1, 0), 2);
        assert_eq!(r.rotate_ccw(), b);
    }

    #[test]
    fn smash_columns() {
        assert_eq!(smash_column_up(&[0, 0, 0, 0]), (false, 0, vec![0, 0, 0, 0]));
        assert_eq!(smash_column_up(&[2, 0, 0, 0]), (false, 0, vec![2, 0, 0, 0]));
        assert_eq!(smash_column_up(&[2, 4, 0, 0]), (false, 0, vec![2, 4, 0, 0]));
        assert_eq!(smash_column_up(&[2, 2, 0, 0]), (true, 4, vec![4, 0, 0, 0]));
        assert_eq!(smash_column_up(&[0, 2, 0, 0]), (true, 0, vec![2, 0, 0, 0]));
        assert_eq!(smash_column_up(&[2, 0, 0, 2]), (true, 4, vec![4, 0, 0, 0]));
    }

    #[test]
    fn smash_never_chains() {
        assert_eq!(smash_column_up(&[2, 2, 2, 0]), (true, 4, vec![4, 2, 0, 0]));
        assert_eq!(smash_column_up(&[2, 2, 2, 2]), (true, 8, vec![4, 4, 0, 0]));
        assert_eq!(smash_column_up(&[4, 2, 2, 0]), (true, 4, vec![4, 4, 0, 0]));
        assert_eq!(smash_column_up(&[8, 8, 4, 4]), (true, 24, vec![16, 8, 0, 0]));
    }

    #[test]
    fn smash_up_and_can_move() {
        let empty = Board::empty(&cfg());
        let (changed, score, smashed) = empty.smash_up();
        assert!(!changed);
        assert_eq!(score, 0);
        assert_eq!(smashed, empty);

        // A floating tile slides.
        let b = empty.update((1, 2), 2);
        assert!(b.can_move());
        let (changed, score, smashed) = b.smash_up();
        assert!(changed);
        assert_eq!(score, 0);
        assert_eq!(smashed, empty.update((1, 0), 2));

        // Aligned tiles merge.
        let b = b.update((1, 0), 2);
        let (changed, score, smashed) = b.smash_up();
        assert!(changed);
        assert_eq!(score, 4);
        assert_eq!(smashed, empty.update((1, 0), 4));

        // Locked board.
        let locked = Board::from_columns(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
        assert!(!locked.can_move());
        let (changed, score, smashed) = locked.smash_up();
        assert!(!changed);
        assert_eq!(score, 0);
        assert_eq!(smashed, locked);
    }

    #[test]
    fn full_board_with_horizontal_pair_can_move() {
        let b = Board::from_rows(&[[2, 2, 4, 8], [4, 8, 2, 4], [2, 4, 8, 2], [4, 2, 4, 8]]).unwrap();
        assert!(b.can_move());
        assert!(!b.apply_move(Direction::Up).0);
        assert!(b.apply_move(Direction::Left).0);
    }

    #[test]
    fn corner_tile_moves() {
        let b = Board::empty(&cfg()).update((0, 0), 2);
        assert!(!b.apply_move(Direction::Up).0);
        assert!(!b.apply_move(Direction::Left).0);
        let (changed, _, right) = b.apply_move(Direction::Right);
        assert!(changed);
        assert_eq!(right, Board::empty(&cfg()).update((3, 0), 2));
        let (changed, _, down) = b.apply_move(Direction::Down);
        assert!(changed);
        assert_eq!(down, Board::empty(&cfg()).update((0, 3), 2));
    }

    #[test]
    fn apply_move_all_directions() {
        let b = Board::from_rows(&[[2, 2, 4, 0], [0, 0, 4, 0], [2, 0, 0, 0], [2, 0, 0, 8]]).unwrap();
        let (_, score, left) = b.apply_move(Direction::Left);
        assert_eq!(score, 4);
        assert_eq!(left, Board::from_rows(&[[4, 4, 0, 0], [4, 0, 0, 0], [2, 0, 0, 0], [2, 8, 0, 0]]).unwrap());
        let (_, score, right) = b.apply_move(Direction::Right);
        assert_eq!(score, 4);
        assert_eq!(right, Board::from_rows(&[[0, 0, 4, 4], [0, 0, 0, 4], [0, 0, 0, 2], [0, 0, 2, 8]]).unwrap());
        let (_, score, up) = b.apply_move(Direction::Up);
        assert_eq!(score, 12);
        assert_eq!(up, Board::from_rows(&[[4, 2, 8, 8], [2, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]).unwrap());
        let (_, score, down) = b.apply_move(Direction::Down);
        assert_eq!(score, 12);
        assert_eq!(down, Board::from_rows(&[[0, 0, 0, 0], [0, 0, 0, 0], [2, 0, 0, 0], [4, 2, 8, 8]]).unwrap());
    }

    #[test]
    fn rectangular_moves() {
        let cfg = GameConfig::new(3, 2, vec![], vec![SpawnWeight::new(2, 1.0)]).unwrap();
        let b = Board::empty(&cfg).update((0, 0), 2).update((2, 0), 2);
        let (changed, score, right) = b.apply_move(Direction::Right);
        assert!(changed);
        assert_eq!(score, 4);
        assert_eq!((right.width(), right.height()), (3, 2));
        assert_eq!(right, Board::empty(&cfg).update((2, 0), 4));
    }

    #[test]
    fn encoding_round_trip() {
        let b = realistic();
        let v = b.as_vector();
        assert_eq!(v.len(), cfg().vector_width());
        assert_eq!(&v[..4], &[1, 7, 3, 3]);
        assert_eq!(Board::from_vector(&cfg(), &v).unwrap(), b);
    }

    #[test]
    fn decoding_errors() {
        assert_eq!(
            Board::from_vector(&cfg(), &[0; 15]),
            Err(BoardError::LengthMismatch { expected: 16, actual: 15 })
        );
        let mut v = vec![0u8; 16];
        v[3] = 40;
        assert_eq!(Board::from_vector(&cfg(), &v), Err(BoardError::ExponentOutOfRange(40)));
    }

    #[test]
    fn queries() {
        let b = realistic();
        assert_eq!(b.count_empty(), 4);
        assert_eq!(b.empty_cells().collect::<Vec<_>>(), vec![(1, 3), (2, 3), (3, 2), (3, 3)]);
        assert_eq!(b.highest_tile(), 128);
        assert_eq!(b.tile_sum(), 2 + 128 + 8 + 8 + 8 + 8 + 16 + 4 + 32 + 4 + 2 + 4);
    }

    #[test]
    fn largest_tiles_decode_but_never_merge() {
        let v = [MAX_EXPONENT, MAX_EXPONENT];
        let top = Board::from_vector_sized(1, 2, &v).unwrap();
        assert_eq!(top.column(0), &[MAX_TILE, MAX_TILE]);
        assert_eq!(
            Board::from_vector_sized(1, 2, &[MAX_EXPONENT + 1, 0]),
            Err(BoardError::ExponentOutOfRange(MAX_EXPONENT + 1))
        );
        assert_eq!(Board::from_columns(&[[MAX_TILE << 1, 0]]), Err(BoardError::InvalidTile(MAX_TILE << 1)));

        assert_eq!(smash_column_up(&[MAX_TILE, MAX_TILE]), (false, 0, vec![MAX_TILE, MAX_TILE]));
        assert!(!top.can_move());
        for dir in Direction::ALL {
            assert_eq!(top.apply_move(dir), (false, 0, top.clone()));
        }

        let half = MAX_TILE >> 1;
        assert_eq!(smash_column_up(&[half, half, 0]), (true, Score::from(MAX_TILE), vec![MAX_TILE, 0, 0]));
        assert_eq!(smash_column_up(&[0, MAX_TILE, MAX_TILE, 2]), (true, 0, vec![MAX_TILE, MAX_TILE, 2, 0]));
    }

    #[test]
    fn display_draws_rows() {
        let b = Board::from_rows(&[[2, 0], [0, 16]]).unwrap();
        assert_eq!(b.to_string(), "-------\n| 2|  |\n|  |16|\n-------");
    }
}
