//! Property-based tests: random legal games must preserve every board
//! invariant, and FEN round-trips must be lossless.

use proptest::prelude::*;

use crate::board::{Board, Color, Piece};

/// Play `moves` random legal moves from the start position, driven by the
/// proptest-provided index sequence.
fn play_random_game(choices: &[usize]) -> (Board, usize) {
    let mut board = Board::new();
    let mut made = 0;
    for &choice in choices {
        let moves = board.generate_legal();
        if moves.is_empty() {
            break;
        }
        board.make_move(moves[choice % moves.len()]);
        made += 1;
    }
    (board, made)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_zobrist_incremental_matches_recompute(
        choices in prop::collection::vec(0usize..256, 0..40)
    ) {
        let (board, _) = play_random_game(&choices);
        prop_assert_eq!(board.hash(), board.calculate_hash());
    }

    #[test]
    fn prop_fen_round_trip(choices in prop::collection::vec(0usize..256, 0..40)) {
        let (board, _) = play_random_game(&choices);
        let fen = board.to_fen();
        let reparsed = Board::try_from_fen(&fen).expect("own FEN output must parse");
        prop_assert_eq!(reparsed.to_fen(), fen);
        prop_assert_eq!(reparsed.hash(), board.hash());
    }

    #[test]
    fn prop_unmake_restores_everything(
        choices in prop::collection::vec(0usize..256, 1..40)
    ) {
        let (mut board, made) = play_random_game(&choices);
        let final_fen = board.to_fen();

        for _ in 0..made {
            board.unmake_move();
        }
        prop_assert_eq!(board.to_fen(), Board::new().to_fen());
        prop_assert_eq!(board.hash(), Board::new().hash());

        // Replaying the same choices lands on the same position
        let (replayed, _) = play_random_game(&choices);
        prop_assert_eq!(replayed.to_fen(), final_fen);
    }

    #[test]
    fn prop_board_invariants(choices in prop::collection::vec(0usize..256, 0..40)) {
        let (board, _) = play_random_game(&choices);

        let white = board.occupied_by(Color::White);
        let black = board.occupied_by(Color::Black);
        prop_assert_eq!(white.0 & black.0, 0);
        prop_assert_eq!(white.0 | black.0, board.all_occupied.0);

        // Piece bitboards are pairwise disjoint and union to occupancy
        let mut union = 0u64;
        for color in [Color::White, Color::Black] {
            for p_idx in 0..6 {
                let piece = Piece::from_index(p_idx).unwrap();
                let bb = board.pieces_of(color, piece).0;
                prop_assert_eq!(union & bb, 0);
                union |= bb;
            }
        }
        prop_assert_eq!(union, board.all_occupied.0);

        // The mailbox mirror agrees with the bitboards square by square
        for idx in 0..64usize {
            let from_grid = board.piece_at(crate::board::Square::from_index(idx));
            let from_bits = [Color::White, Color::Black].into_iter().find_map(|color| {
                (0..6).find_map(|p_idx| {
                    let piece = Piece::from_index(p_idx).unwrap();
                    board
                        .pieces_of(color, piece)
                        .contains(crate::board::Square::from_index(idx))
                        .then_some((color, piece))
                })
            });
            prop_assert_eq!(from_grid, from_bits);
        }

        prop_assert_eq!(board.pieces_of(Color::White, Piece::King).count(), 1);
        prop_assert_eq!(board.pieces_of(Color::Black, Piece::King).count(), 1);
    }

    #[test]
    fn prop_legal_moves_keep_king_safe(
        choices in prop::collection::vec(0usize..256, 0..30)
    ) {
        let (mut board, _) = play_random_game(&choices);
        let mover = board.side_to_move();
        let legal: Vec<_> = board.generate_legal().iter().copied().collect();
        for m in legal {
            board.make_move(m);
            prop_assert!(!board.is_in_check(mover));
            board.unmake_move();
        }
    }
}
