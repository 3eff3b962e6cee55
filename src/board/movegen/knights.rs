use super::super::attack_tables::KNIGHT_ATTACKS;
use super::super::{Bitboard, Board, Move, MoveList, Square};

impl Board {
    pub(crate) fn generate_knight_moves(&self, from: Square, moves: &mut MoveList) {
        let color = self.side_to_move();
        let targets = Bitboard(KNIGHT_ATTACKS[from.index()]) & !self.occupied_by(color);
        let enemy = self.occupied_by(color.opponent());

        for to_idx in targets.iter() {
            let to = Square::from_index(to_idx);
            if enemy.contains(to) {
                moves.push(Move::capture(from, to));
            } else {
                moves.push(Move::quiet(from, to));
            }
        }
    }

    pub(crate) fn generate_knight_captures(&self, from: Square, moves: &mut MoveList) {
        let color = self.side_to_move();
        let targets = Bitboard(KNIGHT_ATTACKS[from.index()]) & self.occupied_by(color.opponent());
        for to_idx in targets.iter() {
            moves.push(Move::capture(from, Square::from_index(to_idx)));
        }
    }
}
