use super::super::attack_tables::{bishop_attacks, queen_attacks, rook_attacks};
use super::super::{Bitboard, Board, Move, MoveList, Square};

#[derive(Clone, Copy)]
pub(crate) enum SliderType {
    Bishop,
    Rook,
    Queen,
}

impl Board {
    fn slider_targets(&self, from: Square, slider: SliderType) -> Bitboard {
        let occ = self.all_occupied.0;
        let attacks = match slider {
            SliderType::Bishop => bishop_attacks(from.index(), occ),
            SliderType::Rook => rook_attacks(from.index(), occ),
            SliderType::Queen => queen_attacks(from.index(), occ),
        };
        Bitboard(attacks)
    }

    pub(crate) fn generate_slider_moves(
        &self,
        from: Square,
        slider: SliderType,
        moves: &mut MoveList,
    ) {
        let color = self.side_to_move();
        let targets = self.slider_targets(from, slider) & !self.occupied_by(color);
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

    pub(crate) fn generate_slider_captures(
        &self,
        from: Square,
        slider: SliderType,
        moves: &mut MoveList,
    ) {
        let color = self.side_to_move();
        let targets = self.slider_targets(from, slider) & self.occupied_by(color.opponent());
        for to_idx in targets.iter() {
            moves.push(Move::capture(from, Square::from_index(to_idx)));
        }
    }
}
