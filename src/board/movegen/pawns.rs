use super::super::attack_tables::PAWN_ATTACKS;
use super::super::{Board, Color, Move, MoveList, Square, PROMOTION_PIECES};

impl Board {
    pub(crate) fn generate_pawn_moves(&self, from: Square, moves: &mut MoveList) {
        let color = self.side_to_move();
        let dir: isize = if color == Color::White { 1 } else { -1 };
        let start_rank = if color == Color::White { 1 } else { 6 };
        let promotion_rank = if color == Color::White { 7 } else { 0 };

        let r = from.rank() as isize;
        let forward_r = r + dir;

        if (0..8).contains(&forward_r) {
            let forward_sq = Square::new(forward_r as usize, from.file());
            if self.is_empty_square(forward_sq) {
                if forward_sq.rank() == promotion_rank {
                    for promo in PROMOTION_PIECES {
                        moves.push(Move::promotion(from, forward_sq, promo));
                    }
                } else {
                    moves.push(Move::quiet(from, forward_sq));
                    if from.rank() == start_rank {
                        let double_sq = Square::new((r + 2 * dir) as usize, from.file());
                        if self.is_empty_square(double_sq) {
                            moves.push(Move::double_pawn_push(from, double_sq));
                        }
                    }
                }
            }
        }

        self.generate_pawn_captures(from, color, promotion_rank, moves);
    }

    /// Captures and promotions only: quiescence feed.
    pub(crate) fn generate_pawn_tactical_moves(&self, from: Square, moves: &mut MoveList) {
        let color = self.side_to_move();
        let dir: isize = if color == Color::White { 1 } else { -1 };
        let promotion_rank = if color == Color::White { 7 } else { 0 };

        let forward_r = from.rank() as isize + dir;
        if (0..8).contains(&forward_r) {
            let forward_sq = Square::new(forward_r as usize, from.file());
            if forward_sq.rank() == promotion_rank && self.is_empty_square(forward_sq) {
                for promo in PROMOTION_PIECES {
                    moves.push(Move::promotion(from, forward_sq, promo));
                }
            }
        }

        self.generate_pawn_captures(from, color, promotion_rank, moves);
    }

    fn generate_pawn_captures(
        &self,
        from: Square,
        color: Color,
        promotion_rank: usize,
        moves: &mut MoveList,
    ) {
        let enemy = self.occupied_by(color.opponent());
        let attacks = PAWN_ATTACKS[color.index()][from.index()];

        for to_idx in (super::super::Bitboard(attacks) & enemy).iter() {
            let to = Square::from_index(to_idx);
            if to.rank() == promotion_rank {
                for promo in PROMOTION_PIECES {
                    moves.push(Move::promotion_capture(from, to, promo));
                }
            } else {
                moves.push(Move::capture(from, to));
            }
        }

        if let Some(ep_sq) = self.en_passant_target {
            if attacks & (1u64 << ep_sq.index()) != 0 {
                moves.push(Move::en_passant(from, ep_sq));
            }
        }
    }
}
