//! Special positions: stalemate, checkmate, pins, castling legality,
//! en passant lifetime.

use crate::board::{Board, Color, Square};

#[test]
fn test_stalemate_has_no_legal_moves() {
    let mut board = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
    assert!(!board.is_in_check(Color::Black));
    assert!(board.generate_legal().is_empty());
}

#[test]
fn test_back_rank_checkmate() {
    let mut board = Board::from_fen("6k1/5ppp/8/8/8/8/8/3Q2K1 w - - 0 1");
    let mv = board.parse_move("d1d8").expect("queen to the back rank");
    board.make_move(mv);
    assert!(board.is_in_check(Color::Black));
    assert!(board.generate_legal().is_empty());
}

#[test]
fn test_pinned_piece_cannot_move() {
    // The e-file knight is pinned against the king by a rook
    let mut board = Board::from_fen("4r2k/8/8/8/8/4N3/8/4K3 w - - 0 1");
    let moves = board.generate_legal();
    for m in &moves {
        assert_ne!(
            m.from(),
            Square::new(2, 4),
            "pinned knight moved: {m}"
        );
    }
}

#[test]
fn test_check_evasion_only() {
    // King in check from a rook: every legal move must resolve the check
    let mut board = Board::from_fen("4k3/8/8/8/8/8/4r3/4K2R w K - 0 1");
    assert!(board.is_in_check(Color::White));
    let moves: Vec<_> = board.generate_legal().iter().copied().collect();
    assert!(!moves.is_empty());
    for m in moves {
        board.make_move(m);
        assert!(!board.is_in_check(Color::White), "still in check after {m}");
        board.unmake_move();
    }
}

#[test]
fn test_castling_blocked_by_attack_on_transit_square() {
    // Black rook on f8 covers f1: kingside castling is illegal, queenside
    // is unaffected
    let mut board = Board::from_fen("5rk1/8/8/8/8/8/8/R3K2R w KQ - 0 1");
    let moves = board.generate_legal();
    assert!(!moves.iter().any(|m| m.is_castling() && m.to() == Square::new(0, 6)));
    assert!(moves.iter().any(|m| m.is_castling() && m.to() == Square::new(0, 2)));
}

#[test]
fn test_castling_blocked_while_in_check() {
    let mut board = Board::from_fen("4r1k1/8/8/8/8/8/8/R3K2R w KQ - 0 1");
    assert!(board.is_in_check(Color::White));
    let moves = board.generate_legal();
    assert!(!moves.iter().any(|m| m.is_castling()));
}

#[test]
fn test_castling_needs_empty_squares() {
    // Bishop parked on f1 blocks kingside castling
    let mut board = Board::from_fen("4k3/8/8/8/8/8/8/R3KB1R w KQ - 0 1");
    let moves = board.generate_legal();
    assert!(!moves.iter().any(|m| m.is_castling() && m.to() == Square::new(0, 6)));
}

#[test]
fn test_en_passant_window_closes() {
    let mut board = Board::new();
    for mv_str in ["e2e4", "a7a6", "e4e5", "d7d5"] {
        let mv = board.parse_move(mv_str).unwrap();
        board.make_move(mv);
    }
    // Black's double push just happened: the ep square is open
    assert_eq!(board.en_passant_target(), Some(Square::new(5, 3)));
    assert!(board.parse_move("e5d6").is_ok());

    // One quiet move later the window is gone
    let mv = board.parse_move("g1f3").unwrap();
    board.make_move(mv);
    assert_eq!(board.en_passant_target(), None);
}

#[test]
fn test_en_passant_pin_is_rejected() {
    // Taking en passant would expose the white king along the fifth rank
    let mut board = Board::from_fen("8/8/8/KPp4r/8/8/8/4k3 w - c6 0 1");
    let moves = board.generate_legal();
    assert!(
        !moves.iter().any(|m| m.is_en_passant()),
        "en passant must be rejected when it uncovers check"
    );
}

#[test]
fn test_legal_subset_of_pseudo_legal() {
    for fen in [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    ] {
        let mut board = Board::from_fen(fen);
        let pseudo = board.generate_pseudo_legal();
        let legal = board.generate_legal();
        for m in &legal {
            assert!(pseudo.contains(*m), "legal move {m} missing from pseudo set in {fen}");
        }
        assert!(legal.len() <= pseudo.len());
    }
}

#[test]
fn test_is_attacked_pawn_directions() {
    let board = Board::from_fen("4k3/8/8/3p4/8/2P5/8/4K3 w - - 0 1");
    // White pawn on c3 attacks b4 and d4
    assert!(board.is_square_attacked(Square::new(3, 1), Color::White));
    assert!(board.is_square_attacked(Square::new(3, 3), Color::White));
    assert!(!board.is_square_attacked(Square::new(3, 2), Color::White));
    // Black pawn on d5 attacks c4 and e4
    assert!(board.is_square_attacked(Square::new(3, 2), Color::Black));
    assert!(board.is_square_attacked(Square::new(3, 4), Color::Black));
    assert!(!board.is_square_attacked(Square::new(5, 3), Color::White));
}
