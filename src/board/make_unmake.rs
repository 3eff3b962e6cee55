//! Move application and reversal.
//!
//! Two layers keep this simple. `place_piece`/`lift_piece` touch only the
//! board cells (bitboards plus the mailbox grid); `put_piece`/`take_piece`
//! /`slide_piece` wrap them and also account for the Zobrist hash and the
//! incremental evaluation totals. `make_move` drives the accounting layer
//! and pushes a `HistoryEntry`; `unmake_move` restores the snapshot
//! scalars wholesale and rewinds the cells through the raw layer, so both
//! directions stay O(1).

use crate::zobrist::{piece_key, ZOBRIST};

use super::pst::{MATERIAL_EG, MATERIAL_MG, PHASE_WEIGHTS, PST_EG, PST_MG};
use super::state::HistoryEntry;
use super::{
    Bitboard, Board, Color, Move, Piece, Square, CASTLE_BLACK_K, CASTLE_BLACK_Q, CASTLE_WHITE_K,
    CASTLE_WHITE_Q, EMPTY_MOVE,
};

/// Castling rights that survive a piece touching `sq`. Moving or capturing
/// on a king or rook home square burns the matching rights; every other
/// square keeps all of them.
#[inline]
const fn rights_surviving(sq: Square) -> u8 {
    match sq.index() {
        0 => !CASTLE_WHITE_Q,                     // a1
        4 => !(CASTLE_WHITE_K | CASTLE_WHITE_Q),  // e1
        7 => !CASTLE_WHITE_K,                     // h1
        56 => !CASTLE_BLACK_Q,                    // a8
        60 => !(CASTLE_BLACK_K | CASTLE_BLACK_Q), // e8
        63 => !CASTLE_BLACK_K,                    // h8
        _ => 0xFF,
    }
}

/// XOR of the Zobrist keys for a rights bitmask.
pub(crate) fn castling_hash(rights: u8) -> u64 {
    let mut h = 0;
    if rights & CASTLE_WHITE_K != 0 {
        h ^= ZOBRIST.castling_keys[0][0];
    }
    if rights & CASTLE_WHITE_Q != 0 {
        h ^= ZOBRIST.castling_keys[0][1];
    }
    if rights & CASTLE_BLACK_K != 0 {
        h ^= ZOBRIST.castling_keys[1][0];
    }
    if rights & CASTLE_BLACK_Q != 0 {
        h ^= ZOBRIST.castling_keys[1][1];
    }
    h
}

/// The square a pawn captured en passant actually stood on: the capturing
/// pawn's own rank, the destination's file.
#[inline]
pub(crate) fn en_passant_victim_square(m: Move) -> Square {
    Square::new(m.from().rank(), m.to().file())
}

/// Rook start and landing squares for a castle, recovered from the king's
/// path: the king always steps toward the castling rook.
#[inline]
fn castle_rook_path(m: Move) -> (Square, Square) {
    let back_rank = m.from().rank();
    if m.to().file() > m.from().file() {
        (Square::new(back_rank, 7), Square::new(back_rank, 5))
    } else {
        (Square::new(back_rank, 0), Square::new(back_rank, 3))
    }
}

impl Board {
    // =========================================================================
    // Cell layer: bitboards + mailbox, nothing else
    // =========================================================================

    pub(crate) fn place_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        let bit = Bitboard::from_square(sq);
        self.pieces[color.index()][piece.index()] |= bit;
        self.occupied[color.index()] |= bit;
        self.all_occupied |= bit;
        self.grid[sq.index()] = Some((color, piece));
    }

    pub(crate) fn lift_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        let bit = Bitboard::from_square(sq);
        self.pieces[color.index()][piece.index()] &= !bit;
        self.occupied[color.index()] &= !bit;
        self.all_occupied &= !bit;
        self.grid[sq.index()] = None;
    }

    // =========================================================================
    // Accounting layer: cells + hash + evaluation totals
    // =========================================================================

    #[inline]
    fn eval_totals_delta(&mut self, color: Color, piece: Piece, sq: Square, sign: i32) {
        let side = color.index();
        let kind = piece.index();
        let cell = super::pst::pst_square(sq.index(), color == Color::White);
        self.eval_mg[side] += sign * (MATERIAL_MG[kind] + PST_MG[kind][cell]);
        self.eval_eg[side] += sign * (MATERIAL_EG[kind] + PST_EG[kind][cell]);
        self.game_phase[side] += sign * PHASE_WEIGHTS[kind];
    }

    fn put_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        self.place_piece(color, piece, sq);
        self.hash ^= piece_key(piece, color, sq);
        self.eval_totals_delta(color, piece, sq, 1);
    }

    fn take_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        self.lift_piece(color, piece, sq);
        self.hash ^= piece_key(piece, color, sq);
        self.eval_totals_delta(color, piece, sq, -1);
    }

    fn slide_piece(&mut self, color: Color, piece: Piece, from: Square, to: Square) {
        self.take_piece(color, piece, from);
        self.put_piece(color, piece, to);
    }

    /// Rebuild the evaluation totals from the mailbox. Used after position
    /// setup; incremental updates must always agree with this.
    pub(crate) fn reset_eval_totals(&mut self) {
        self.eval_mg = [0, 0];
        self.eval_eg = [0, 0];
        self.game_phase = [0, 0];
        for idx in 0..64 {
            if let Some((color, piece)) = self.grid[idx] {
                self.eval_totals_delta(color, piece, Square::from_index(idx), 1);
            }
        }
    }

    /// Recompute the Zobrist hash from scratch off the mailbox.
    #[must_use]
    pub fn calculate_hash(&self) -> u64 {
        let mut hash = castling_hash(self.castling_rights);

        for idx in 0..64 {
            if let Some((color, piece)) = self.grid[idx] {
                hash ^= piece_key(piece, color, Square::from_index(idx));
            }
        }

        if !self.white_to_move {
            hash ^= ZOBRIST.black_to_move_key;
        }
        if let Some(ep) = self.en_passant_target {
            hash ^= ZOBRIST.en_passant_keys[ep.file()];
        }

        hash
    }

    pub(crate) fn has_castling_right(&self, color: Color, side: char) -> bool {
        self.castling_rights & super::castle_bit(color, side) != 0
    }

    // =========================================================================
    // Make / unmake
    // =========================================================================

    /// Apply `m` and push the undo record. `m` must come from this
    /// position's move generation; anything else is a programmer error.
    pub fn make_move(&mut self, m: Move) {
        let mut entry = HistoryEntry::snapshot(self, m, false);

        let mover = self.side_to_move();
        let (_, piece) = self.piece_at(m.from()).expect("make_move 'from' empty");

        self.hash ^= ZOBRIST.black_to_move_key;
        if let Some(stale_ep) = self.en_passant_target.take() {
            self.hash ^= ZOBRIST.en_passant_keys[stale_ep.file()];
        }

        // Clear whatever this move captures, then relocate the mover
        entry.captured = if m.is_en_passant() {
            let victim_sq = en_passant_victim_square(m);
            self.take_piece(mover.opponent(), Piece::Pawn, victim_sq);
            Some((mover.opponent(), Piece::Pawn))
        } else if let Some((victim_color, victim)) = self.piece_at(m.to()) {
            self.take_piece(victim_color, victim, m.to());
            Some((victim_color, victim))
        } else {
            None
        };

        match m.promotion_piece() {
            Some(promoted) => {
                self.take_piece(mover, Piece::Pawn, m.from());
                self.put_piece(mover, promoted, m.to());
            }
            None => self.slide_piece(mover, piece, m.from(), m.to()),
        }

        if m.is_castling() {
            let (rook_home, rook_posted) = castle_rook_path(m);
            self.slide_piece(mover, Piece::Rook, rook_home, rook_posted);
        }

        if m.is_double_pawn_push() {
            // The skipped square sits halfway along the file
            let ep = Square::from_index((m.from().index() + m.to().index()) / 2);
            self.en_passant_target = Some(ep);
            self.hash ^= ZOBRIST.en_passant_keys[ep.file()];
        }

        let kept = self.castling_rights & rights_surviving(m.from()) & rights_surviving(m.to());
        if kept != self.castling_rights {
            self.hash ^= castling_hash(self.castling_rights) ^ castling_hash(kept);
            self.castling_rights = kept;
        }

        self.halfmove_clock = if piece == Piece::Pawn || m.is_capture() {
            0
        } else {
            self.halfmove_clock.saturating_add(1)
        };
        if mover == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }

        self.white_to_move = !self.white_to_move;
        self.position_log.push(self.hash);
        self.history.push(entry);
    }

    /// Reverse the most recent `make_move`, restoring every field.
    pub fn unmake_move(&mut self) {
        let entry = self
            .history
            .pop()
            .expect("unmake_move without matching make_move");
        debug_assert!(!entry.was_null, "unmake_move on a null move");
        self.position_log.pop();

        // Scalars come back wholesale from the snapshot
        self.white_to_move = !self.white_to_move;
        self.castling_rights = entry.castling;
        self.en_passant_target = entry.en_passant;
        self.hash = entry.hash;
        self.halfmove_clock = entry.halfmove_clock;
        self.fullmove_number = entry.fullmove_number;
        self.eval_mg = entry.eval_mg;
        self.eval_eg = entry.eval_eg;
        self.game_phase = entry.phase;

        // Cells rewind through the raw layer; the accounting is already
        // restored above
        let m = entry.mv;
        let mover = self.side_to_move();

        let (_, landed) = self.piece_at(m.to()).expect("unmake_move 'to' empty");
        self.lift_piece(mover, landed, m.to());
        let original = if m.is_promotion() { Piece::Pawn } else { landed };
        self.place_piece(mover, original, m.from());

        if m.is_castling() {
            let (rook_home, rook_posted) = castle_rook_path(m);
            self.lift_piece(mover, Piece::Rook, rook_posted);
            self.place_piece(mover, Piece::Rook, rook_home);
        } else if let Some((victim_color, victim)) = entry.captured {
            let victim_sq = if m.is_en_passant() {
                en_passant_victim_square(m)
            } else {
                m.to()
            };
            self.place_piece(victim_color, victim, victim_sq);
        }
    }

    /// Toggle the side to move without moving a piece. Used by null-move
    /// pruning; the en passant target is cleared.
    pub fn make_null_move(&mut self) {
        let entry = HistoryEntry::snapshot(self, EMPTY_MOVE, true);

        self.hash ^= ZOBRIST.black_to_move_key;
        if let Some(stale_ep) = self.en_passant_target.take() {
            self.hash ^= ZOBRIST.en_passant_keys[stale_ep.file()];
        }
        self.white_to_move = !self.white_to_move;

        self.position_log.push(self.hash);
        self.history.push(entry);
    }

    /// Reverse the most recent `make_null_move`.
    pub fn unmake_null_move(&mut self) {
        let entry = self
            .history
            .pop()
            .expect("unmake_null_move without matching make_null_move");
        debug_assert!(entry.was_null, "unmake_null_move on a regular move");
        self.position_log.pop();

        self.white_to_move = !self.white_to_move;
        self.en_passant_target = entry.en_passant;
        self.hash = entry.hash;
    }
}
