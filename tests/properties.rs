//! Property-based tests for board mechanics and lookahead mass.

use proptest::prelude::*;

use twentyfortyeight::engine::{smash_column_up, Board, Direction, GameConfig, Tile};
use twentyfortyeight::lookahead::{Distribution, Lookahead};

/// Strategy: a board of 1..=5 by 1..=5 cells with tiles up to 128.
fn board_strategy() -> impl Strategy<Value = Board> {
    (1usize..=5, 1usize..=5).prop_flat_map(|(w, h)| {
        prop::collection::vec(0u8..=7, w * h)
            .prop_map(move |v| Board::from_vector_sized(w, h, &v).expect("exponents in range"))
    })
}

/// Strategy: a column of 1..=8 cells, each empty or a tile up to 64.
fn column_strategy() -> impl Strategy<Value = Vec<Tile>> {
    prop::collection::vec((0u32..=6).prop_map(|k| if k == 0 { 0 } else { 1 << k }), 1..=8)
}

/// Pack the non-zero tiles, then merge equal neighbours pairwise from the top.
fn reference_smash(col: &[Tile]) -> (u64, Vec<Tile>) {
    let packed: Vec<Tile> = col.iter().copied().filter(|&t| t != 0).collect();
    let mut out = Vec::with_capacity(col.len());
    let mut score = 0u64;
    let mut i = 0;
    while i < packed.len() {
        if i + 1 < packed.len() && packed[i] == packed[i + 1] {
            out.push(packed[i] * 2);
            score += u64::from(packed[i]) * 2;
            i += 2;
        } else {
            out.push(packed[i]);
            i += 1;
        }
    }
    out.resize(col.len(), 0);
    (score, out)
}

/// Strategy: a direction.
fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop::sample::select(Direction::ALL.to_vec())
}

proptest! {
    // 1. Rotations are invertible and cyclic
    #[test]
    fn rotations_round_trip(b in board_strategy()) {
        prop_assert_eq!(b.rotate_cw().rotate_cw().rotate_cw().rotate_cw(), b.clone());
        prop_assert_eq!(b.rotate_cw().rotate_ccw(), b.clone());
        prop_assert_eq!(b.rotate_ccw().rotate_cw(), b);
    }

    // 2. Smashing never adds tiles and the score is exactly the value of each merged tile
    #[test]
    fn smash_conserves_mass(col in column_strategy()) {
        let (changed, score, out) = smash_column_up(&col);
        let count = |c: &[Tile]| c.iter().filter(|&&t| t != 0).count();
        let sum = |c: &[Tile]| c.iter().map(|&t| u64::from(t)).sum::<u64>();
        prop_assert_eq!(out.len(), col.len());
        prop_assert!(count(&out) <= count(&col));
        prop_assert_eq!(sum(&out), sum(&col));
        prop_assert_eq!(changed, out != col);

        let (expected_score, expected) = reference_smash(&col);
        prop_assert_eq!(score, expected_score);
        prop_assert_eq!(&out, &expected);
        // one tile disappears per merge, each worth at least 4
        prop_assert!(score >= 4 * (count(&col) - count(&out)) as u64);
        if !changed {
            prop_assert_eq!(score, 0);
        }
    }

    // 3. A smashed column is packed toward index 0
    #[test]
    fn smash_packs_tiles(col in column_strategy()) {
        let (_, _, out) = smash_column_up(&col);
        let first_gap = out.iter().position(|&t| t == 0).unwrap_or(out.len());
        prop_assert!(out[first_gap..].iter().all(|&t| t == 0));
    }

    // 4. Moves preserve tile mass and the turn score equals the merged values
    #[test]
    fn moves_conserve_tile_sum(b in board_strategy(), dir in direction_strategy()) {
        let (changed, score, moved) = b.apply_move(dir);
        prop_assert_eq!(moved.tile_sum(), b.tile_sum());
        prop_assert_eq!((moved.width(), moved.height()), (b.width(), b.height()));
        prop_assert_eq!(changed, moved != b);
        prop_assert!(moved.count_empty() >= b.count_empty());
        if !changed {
            prop_assert_eq!(score, 0);
        }
    }

    // 5. can_move is exactly "some direction changes the board"
    #[test]
    fn can_move_matches_legal_moves(b in board_strategy()) {
        let any_legal = Direction::ALL.iter().any(|&d| b.apply_move(d).0);
        prop_assert_eq!(b.can_move(), any_legal);
    }

    // 6. Vector encoding round-trips
    #[test]
    fn vector_round_trip(b in board_strategy()) {
        let v = b.as_vector();
        prop_assert_eq!(v.len(), b.width() * b.height());
        prop_assert_eq!(Board::from_vector_sized(b.width(), b.height(), &v).unwrap(), b);
    }

    // 7. Placement keeps a normalized distribution normalized
    #[test]
    fn placement_conserves_mass(boards in prop::collection::vec(board_strategy_4x4(), 1..6)) {
        let dist: Distribution = boards.into_iter().map(|b| (b, 1.0)).collect();
        let look = Lookahead::new(GameConfig::default(), dist.normalized());
        let placed = look.after_placement();
        prop_assert!(placed.is_normalized(), "total mass {}", placed.total_mass());
        for (board, _) in placed.iter() {
            prop_assert_eq!((board.width(), board.height()), (4, 4));
        }
    }

    // 8. Moves and full turns keep mass in place under the stall policy
    #[test]
    fn turns_conserve_mass(b in board_strategy_4x4(), dir in direction_strategy()) {
        let look = Lookahead::from_board(GameConfig::default(), b);
        prop_assert!(look.after_move(dir).is_normalized());
        prop_assert!(look.after_turn(dir).is_normalized());
        prop_assert!(look.legal_mass(dir) <= 1.0);
    }
}

/// Strategy: a 4x4 board with tiles up to 128.
fn board_strategy_4x4() -> impl Strategy<Value = Board> {
    prop::collection::vec(0u8..=7, 16)
        .prop_map(|v| Board::from_vector(&GameConfig::default(), &v).expect("exponents in range"))
}
