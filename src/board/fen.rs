//! FEN parsing and serialization, plus UCI move parsing.

use std::fmt::Write;
use std::str::FromStr;

use super::error::{FenError, MoveParseError};
use super::{castle_bit, Board, Color, Move, Piece, Square, CASTLE_BLACK_K, CASTLE_BLACK_Q,
    CASTLE_WHITE_K, CASTLE_WHITE_Q};

impl Board {
    /// Parse a board position from the six standard FEN fields.
    ///
    /// The clock fields may be omitted (defaulting to 0 and 1), but when
    /// present they must parse; a zero fullmove counter is rejected.
    pub fn try_from_fen(fen: &str) -> Result<Self, FenError> {
        let mut fields = fen.split_whitespace();
        let field_count = fen.split_whitespace().count();
        if field_count < 4 {
            return Err(FenError::TooFewParts { found: field_count });
        }

        let mut board = Board::blank();

        // Placement: walk the string with a rank/file cursor, handling the
        // '/' separators ourselves so short and long ranks are both caught
        let placement = fields.next().unwrap_or_default();
        let mut rank: i32 = 7;
        let mut file: i32 = 0;
        for c in placement.chars() {
            match c {
                '/' => {
                    if file != 8 {
                        return Err(FenError::InvalidFileCount {
                            rank: (7 - rank) as usize,
                            files: file as usize,
                        });
                    }
                    rank -= 1;
                    file = 0;
                    if rank < 0 {
                        return Err(FenError::InvalidRankCount {
                            found: placement.matches('/').count() + 1,
                        });
                    }
                }
                '1'..='8' => file += c as i32 - '0' as i32,
                _ => {
                    let piece = Piece::from_char(c).ok_or(FenError::InvalidPiece { char: c })?;
                    let color = if c.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    if file >= 8 {
                        return Err(FenError::InvalidFileCount {
                            rank: (7 - rank) as usize,
                            files: file as usize + 1,
                        });
                    }
                    board.place_piece(color, piece, Square::new(rank as usize, file as usize));
                    file += 1;
                }
            }
        }
        if rank != 0 {
            return Err(FenError::InvalidRankCount {
                found: (7 - rank) as usize + 1,
            });
        }
        if file != 8 {
            return Err(FenError::InvalidFileCount {
                rank: 7,
                files: file as usize,
            });
        }

        board.white_to_move = match fields.next() {
            Some("w") => true,
            Some("b") => false,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.unwrap_or_default().to_string(),
                })
            }
        };

        // Castling: each letter names a color (by case) and a wing
        for c in fields.next().unwrap_or("-").chars() {
            if c == '-' {
                continue;
            }
            let color = if c.is_ascii_uppercase() {
                Color::White
            } else {
                Color::Black
            };
            let wing = c.to_ascii_uppercase();
            if wing != 'K' && wing != 'Q' {
                return Err(FenError::InvalidCastling { char: c });
            }
            board.castling_rights |= castle_bit(color, wing);
        }

        board.en_passant_target = match fields.next().unwrap_or("-") {
            "-" => None,
            text => Some(text.parse::<Square>().map_err(|_| {
                FenError::InvalidEnPassant {
                    found: text.to_string(),
                }
            })?),
        };

        if let Some(text) = fields.next() {
            board.halfmove_clock = text.parse().map_err(|_| FenError::InvalidHalfmoveClock {
                found: text.to_string(),
            })?;
        }
        if let Some(text) = fields.next() {
            board.fullmove_number = match text.parse() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(FenError::InvalidFullmoveNumber {
                        found: text.to_string(),
                    })
                }
            };
        }

        board.hash = board.calculate_hash();
        board.position_log.push(board.hash);
        board.reset_eval_totals();
        Ok(board)
    }

    /// Parse a board position from FEN notation.
    ///
    /// # Panics
    /// Panics if the FEN string is invalid. Use `try_from_fen` for fallible
    /// parsing.
    #[must_use]
    pub fn from_fen(fen: &str) -> Self {
        Self::try_from_fen(fen).expect("Invalid FEN string")
    }

    /// Convert the board position to FEN notation. Round-trips
    /// `try_from_fen` for every legal position.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);

        for rank in (0..8).rev() {
            let mut run = 0;
            for file in 0..8 {
                match self.grid[rank * 8 + file] {
                    Some((color, piece)) => {
                        if run > 0 {
                            let _ = write!(fen, "{run}");
                            run = 0;
                        }
                        fen.push(piece.to_fen_char(color));
                    }
                    None => run += 1,
                }
            }
            if run > 0 {
                let _ = write!(fen, "{run}");
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.white_to_move { 'w' } else { 'b' });

        fen.push(' ');
        let rights = self.castling_rights;
        if rights == 0 {
            fen.push('-');
        } else {
            for (bit, letter) in [
                (CASTLE_WHITE_K, 'K'),
                (CASTLE_WHITE_Q, 'Q'),
                (CASTLE_BLACK_K, 'k'),
                (CASTLE_BLACK_Q, 'q'),
            ] {
                if rights & bit != 0 {
                    fen.push(letter);
                }
            }
        }

        match self.en_passant_target {
            Some(sq) => {
                let _ = write!(fen, " {sq}");
            }
            None => fen.push_str(" -"),
        }

        let _ = write!(fen, " {} {}", self.halfmove_clock, self.fullmove_number);
        fen
    }

    /// Parse a move in UCI long algebraic notation (e.g. "e2e4", "e7e8q").
    ///
    /// Returns the matching legal move if found, or an error describing why
    /// parsing failed.
    pub fn parse_move(&mut self, text: &str) -> Result<Move, MoveParseError> {
        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(MoveParseError::InvalidLength { len: text.len() });
        }

        let from: Square = text[0..2].parse().map_err(|_| MoveParseError::InvalidSquare {
            notation: text.to_string(),
        })?;
        let to: Square = text[2..4].parse().map_err(|_| MoveParseError::InvalidSquare {
            notation: text.to_string(),
        })?;

        let promotion = match text.as_bytes().get(4) {
            None => None,
            Some(&letter) => match Piece::from_char(letter as char) {
                Some(piece) if !matches!(piece, Piece::Pawn | Piece::King) => Some(piece),
                _ => {
                    return Err(MoveParseError::InvalidPromotion {
                        char: letter as char,
                    })
                }
            },
        };

        self.generate_legal()
            .into_iter()
            .find(|m| m.from() == from && m.to() == to && m.promotion_piece() == promotion)
            .ok_or(MoveParseError::IllegalMove {
                notation: text.to_string(),
            })
    }
}

impl FromStr for Board {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::try_from_fen(s)
    }
}
