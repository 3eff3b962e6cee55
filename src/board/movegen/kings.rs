use super::super::attack_tables::KING_ATTACKS;
use super::super::{Bitboard, Board, Color, Move, MoveList, Piece, Square};

impl Board {
    pub(crate) fn generate_king_moves(&self, from: Square, moves: &mut MoveList) {
        let color = self.side_to_move();
        let targets = Bitboard(KING_ATTACKS[from.index()]) & !self.occupied_by(color);
        let enemy = self.occupied_by(color.opponent());

        for to_idx in targets.iter() {
            let to = Square::from_index(to_idx);
            if enemy.contains(to) {
                moves.push(Move::capture(from, to));
            } else {
                moves.push(Move::quiet(from, to));
            }
        }

        self.generate_castling_moves(from, color, moves);
    }

    pub(crate) fn generate_king_captures(&self, from: Square, moves: &mut MoveList) {
        let color = self.side_to_move();
        let targets = Bitboard(KING_ATTACKS[from.index()]) & self.occupied_by(color.opponent());
        for to_idx in targets.iter() {
            moves.push(Move::capture(from, Square::from_index(to_idx)));
        }
    }

    /// Castling candidates: rights intact, rook home, squares between
    /// empty. Attack checks on the king's path happen in legal filtering.
    fn generate_castling_moves(&self, from: Square, color: Color, moves: &mut MoveList) {
        let home_rank = if color == Color::White { 0 } else { 7 };
        if from != Square::new(home_rank, 4) {
            return;
        }

        if self.has_castling_right(color, 'K')
            && self.is_empty_square(Square::new(home_rank, 5))
            && self.is_empty_square(Square::new(home_rank, 6))
            && self
                .pieces_of(color, Piece::Rook)
                .contains(Square::new(home_rank, 7))
        {
            moves.push(Move::castle(from, Square::new(home_rank, 6)));
        }

        if self.has_castling_right(color, 'Q')
            && self.is_empty_square(Square::new(home_rank, 3))
            && self.is_empty_square(Square::new(home_rank, 2))
            && self.is_empty_square(Square::new(home_rank, 1))
            && self
                .pieces_of(color, Piece::Rook)
                .contains(Square::new(home_rank, 0))
        {
            moves.push(Move::castle(from, Square::new(home_rank, 2)));
        }
    }
}
