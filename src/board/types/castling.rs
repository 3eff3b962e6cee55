//! Castling-rights bit constants.

use super::piece::Color;

pub(crate) const CASTLE_WHITE_K: u8 = 1;
pub(crate) const CASTLE_WHITE_Q: u8 = 2;
pub(crate) const CASTLE_BLACK_K: u8 = 4;
pub(crate) const CASTLE_BLACK_Q: u8 = 8;

pub(crate) const ALL_CASTLING_RIGHTS: u8 =
    CASTLE_WHITE_K | CASTLE_WHITE_Q | CASTLE_BLACK_K | CASTLE_BLACK_Q;

/// Bit for one side's castling right. `side` is 'K' or 'Q'.
#[inline]
pub(crate) const fn castle_bit(color: Color, side: char) -> u8 {
    match (color, side) {
        (Color::White, 'K') => CASTLE_WHITE_K,
        (Color::White, _) => CASTLE_WHITE_Q,
        (Color::Black, 'K') => CASTLE_BLACK_K,
        (Color::Black, _) => CASTLE_BLACK_Q,
    }
}
