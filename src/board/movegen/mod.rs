//! Move generation.
//!
//! Pseudo-legal moves are produced per piece type from the attack tables;
//! legal moves are the pseudo-legal set filtered by make/unmake plus a
//! king-safety check. Castling transit squares are checked before the make.

mod kings;
mod knights;
mod pawns;
mod sliders;

use self::sliders::SliderType;
use super::{Board, Move, MoveList, Piece, Square};

impl Board {
    /// All moves the side to move could make, ignoring whether the mover's
    /// king is left in check.
    #[must_use]
    pub fn generate_pseudo_legal(&self) -> MoveList {
        let mut moves = MoveList::new();
        let c_idx = self.side_to_move().index();

        for from_idx in self.pieces[c_idx][Piece::Pawn.index()].iter() {
            self.generate_pawn_moves(Square::from_index(from_idx), &mut moves);
        }
        for from_idx in self.pieces[c_idx][Piece::Knight.index()].iter() {
            self.generate_knight_moves(Square::from_index(from_idx), &mut moves);
        }
        for from_idx in self.pieces[c_idx][Piece::Bishop.index()].iter() {
            self.generate_slider_moves(Square::from_index(from_idx), SliderType::Bishop, &mut moves);
        }
        for from_idx in self.pieces[c_idx][Piece::Rook.index()].iter() {
            self.generate_slider_moves(Square::from_index(from_idx), SliderType::Rook, &mut moves);
        }
        for from_idx in self.pieces[c_idx][Piece::Queen.index()].iter() {
            self.generate_slider_moves(Square::from_index(from_idx), SliderType::Queen, &mut moves);
        }
        for from_idx in self.pieces[c_idx][Piece::King.index()].iter() {
            self.generate_king_moves(Square::from_index(from_idx), &mut moves);
        }

        moves
    }

    /// Legal moves for the side to move. Empty exactly when the position is
    /// checkmate or stalemate.
    #[must_use]
    pub fn generate_legal(&mut self) -> MoveList {
        let color = self.side_to_move();
        let opponent = color.opponent();
        let pseudo = self.generate_pseudo_legal();
        let mut legal = MoveList::new();

        for m in &pseudo {
            if m.is_castling() {
                // The king may not castle out of, through, or into check
                let mid = Square::new(m.from().rank(), usize::midpoint(m.from().file(), m.to().file()));
                if self.is_square_attacked(m.from(), opponent)
                    || self.is_square_attacked(mid, opponent)
                    || self.is_square_attacked(m.to(), opponent)
                {
                    continue;
                }
            }

            self.make_move(*m);
            if !self.is_in_check(color) {
                legal.push(*m);
            }
            self.unmake_move();
        }

        legal
    }

    /// Legal captures and promotions, for quiescence search.
    #[must_use]
    pub(crate) fn generate_tactical_moves(&mut self) -> MoveList {
        let color = self.side_to_move();
        let c_idx = color.index();
        let mut pseudo = MoveList::new();

        for from_idx in self.pieces[c_idx][Piece::Pawn.index()].iter() {
            self.generate_pawn_tactical_moves(Square::from_index(from_idx), &mut pseudo);
        }
        for from_idx in self.pieces[c_idx][Piece::Knight.index()].iter() {
            self.generate_knight_captures(Square::from_index(from_idx), &mut pseudo);
        }
        for from_idx in self.pieces[c_idx][Piece::Bishop.index()].iter() {
            self.generate_slider_captures(Square::from_index(from_idx), SliderType::Bishop, &mut pseudo);
        }
        for from_idx in self.pieces[c_idx][Piece::Rook.index()].iter() {
            self.generate_slider_captures(Square::from_index(from_idx), SliderType::Rook, &mut pseudo);
        }
        for from_idx in self.pieces[c_idx][Piece::Queen.index()].iter() {
            self.generate_slider_captures(Square::from_index(from_idx), SliderType::Queen, &mut pseudo);
        }
        for from_idx in self.pieces[c_idx][Piece::King.index()].iter() {
            self.generate_king_captures(Square::from_index(from_idx), &mut pseudo);
        }

        let mut legal = MoveList::new();
        for m in &pseudo {
            self.make_move(*m);
            if !self.is_in_check(color) {
                legal.push(*m);
            }
            self.unmake_move();
        }

        legal
    }

    /// Is `m` legal in the current position? Used to sanity-check moves
    /// pulled from the transposition table.
    #[must_use]
    pub(crate) fn is_legal_move(&mut self, m: Move) -> bool {
        self.generate_legal().contains(m)
    }

    /// Leaf-node count of the move-generation tree. The correctness oracle
    /// for the whole board module.
    #[must_use]
    pub fn perft(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }

        let moves = self.generate_legal();
        if depth == 1 {
            return moves.len() as u64;
        }

        let mut nodes = 0;
        for m in &moves {
            self.make_move(*m);
            nodes += self.perft(depth - 1);
            self.unmake_move();
        }

        nodes
    }
}
