//! Chess board representation and game logic.
//!
//! Uses bitboards for move generation and incremental evaluation totals.
//! Supports full chess rules including castling, en passant, and promotions.
//!
//! # Example
//! ```
//! use sirocco::board::Board;
//!
//! let mut board = Board::new();
//! let moves = board.generate_legal();
//! assert_eq!(moves.len(), 20);
//! ```

pub(crate) mod attack_tables;
mod error;
mod fen;
mod make_unmake;
mod movegen;
pub(crate) mod pst;
mod see;
mod state;
mod types;

#[cfg(test)]
mod tests;

// Public API - types users need
pub use error::{FenError, MoveParseError, SquareError};
pub use state::Board;
pub use types::{Bitboard, Color, Move, MoveList, Piece, Square};

pub(crate) use types::{
    castle_bit, CASTLE_BLACK_K, CASTLE_BLACK_Q, CASTLE_WHITE_K, CASTLE_WHITE_Q, EMPTY_MOVE,
    PROMOTION_PIECES,
};

#[allow(unused_imports)]
pub(crate) use types::ALL_CASTLING_RIGHTS;

/// Depth ceiling for the search stack; plies are indexed below this.
pub(crate) const MAX_PLY: usize = 128;
