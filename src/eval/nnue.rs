//! NNUE-style evaluation backend.
//!
//! The network file carries a quantized single-hidden-layer network over
//! per-(color, piece-type, square) features. The accumulator (the hidden
//! pre-activation sums) is maintained incrementally through a push/pop
//! stack mirroring make/unmake, so evaluation touches only the few
//! features a move changes.
//!
//! File layout, little-endian: magic `SRNN`, u32 version, u32 architecture
//! tag, u32 feature count, u32 hidden dim, i32 output scale, then four
//! length-prefixed i16 sections: feature weights (row-major
//! `[feature][hidden]`), feature biases, output weights, output bias.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use crate::board::{Board, Color, Move, Piece, Square};

const MAGIC: [u8; 4] = *b"SRNN";
const VERSION: u32 = 1;
/// Architecture tag 1: 768 one-hot piece-square features.
const ARCH_PIECE_SQUARE: u32 = 1;
const PIECE_SQUARE_FEATURES: u32 = 768;
const MAX_HIDDEN: u32 = 2048;

/// Hidden activation clamp (quantization ceiling of the feature layer).
const QA: i32 = 255;
/// Output weight quantization.
const QB: i32 = 64;

/// Keep network scores clear of the mate range.
const EVAL_CLAMP: i32 = 27000;

/// Network file loading failure. The caller keeps its previous backend.
#[derive(Debug)]
pub enum NetError {
    Io(std::io::Error),
    BadMagic([u8; 4]),
    BadVersion(u32),
    BadArchitecture(u32),
    BadHeader(String),
    SectionSize {
        section: &'static str,
        expected: u32,
        found: u32,
    },
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Io(e) => write!(f, "network file i/o error: {e}"),
            NetError::BadMagic(found) => {
                write!(f, "bad network magic {found:?}, expected \"SRNN\"")
            }
            NetError::BadVersion(v) => write!(f, "unsupported network version {v}"),
            NetError::BadArchitecture(a) => write!(f, "unsupported architecture tag {a}"),
            NetError::BadHeader(msg) => write!(f, "bad network header: {msg}"),
            NetError::SectionSize {
                section,
                expected,
                found,
            } => write!(
                f,
                "section '{section}' has {found} elements, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for NetError {}

impl From<std::io::Error> for NetError {
    fn from(e: std::io::Error) -> Self {
        NetError::Io(e)
    }
}

/// Immutable network weights, shared read-only between search threads.
#[derive(Debug)]
pub struct NnueNetwork {
    pub(crate) feature_count: u32,
    pub(crate) hidden_dim: usize,
    pub(crate) output_scale: i32,
    /// Row-major `[feature][hidden]`.
    feature_weights: Vec<i16>,
    feature_bias: Vec<i16>,
    output_weights: Vec<i16>,
    output_bias: i16,
}

fn read_u32(reader: &mut impl Read) -> Result<u32, NetError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32(reader: &mut impl Read) -> Result<i32, NetError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_i16_section(
    reader: &mut impl Read,
    section: &'static str,
    expected: u32,
) -> Result<Vec<i16>, NetError> {
    let count = read_u32(reader)?;
    if count != expected {
        return Err(NetError::SectionSize {
            section,
            expected,
            found: count,
        });
    }
    let mut values = vec![0i16; count as usize];
    let mut buf = [0u8; 2];
    for v in &mut values {
        reader.read_exact(&mut buf)?;
        *v = i16::from_le_bytes(buf);
    }
    Ok(values)
}

impl NnueNetwork {
    /// Load and validate a network file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NetError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(NetError::BadMagic(magic));
        }

        let version = read_u32(&mut reader)?;
        if version != VERSION {
            return Err(NetError::BadVersion(version));
        }

        let arch = read_u32(&mut reader)?;
        if arch != ARCH_PIECE_SQUARE {
            return Err(NetError::BadArchitecture(arch));
        }

        let feature_count = read_u32(&mut reader)?;
        if feature_count != PIECE_SQUARE_FEATURES {
            return Err(NetError::BadHeader(format!(
                "architecture {ARCH_PIECE_SQUARE} requires {PIECE_SQUARE_FEATURES} features, header says {feature_count}"
            )));
        }

        let hidden_dim = read_u32(&mut reader)?;
        if hidden_dim == 0 || hidden_dim > MAX_HIDDEN {
            return Err(NetError::BadHeader(format!(
                "hidden dimension {hidden_dim} out of range 1..={MAX_HIDDEN}"
            )));
        }

        let output_scale = read_i32(&mut reader)?;
        if output_scale <= 0 {
            return Err(NetError::BadHeader(format!(
                "output scale {output_scale} must be positive"
            )));
        }

        let feature_weights = read_i16_section(
            &mut reader,
            "feature weights",
            feature_count * hidden_dim,
        )?;
        let feature_bias = read_i16_section(&mut reader, "feature biases", hidden_dim)?;
        let output_weights = read_i16_section(&mut reader, "output weights", hidden_dim)?;
        let output_bias = read_i16_section(&mut reader, "output bias", 1)?[0];

        Ok(NnueNetwork {
            feature_count,
            hidden_dim: hidden_dim as usize,
            output_scale,
            feature_weights,
            feature_bias,
            output_weights,
            output_bias,
        })
    }

    #[inline]
    fn weights_for(&self, feature: usize) -> &[i16] {
        debug_assert!(feature < self.feature_count as usize);
        let start = feature * self.hidden_dim;
        &self.feature_weights[start..start + self.hidden_dim]
    }

    /// Forward pass over a finished accumulator, White's perspective.
    fn forward(&self, acc: &[i32]) -> i32 {
        let mut raw: i64 = 0;
        for (a, w) in acc.iter().zip(self.output_weights.iter()) {
            let activated = (*a).clamp(0, QA) as i64;
            raw += activated * i64::from(*w);
        }
        raw += i64::from(self.output_bias) * i64::from(QA);

        let cp = raw * i64::from(self.output_scale) / i64::from(QA * QB);
        (cp as i32).clamp(-EVAL_CLAMP, EVAL_CLAMP)
    }
}

#[inline]
fn feature_index(color: Color, piece: Piece, sq: Square) -> usize {
    color.index() * 384 + piece.index() * 64 + sq.index()
}

/// Incremental NNUE state: a stack of accumulators, one per made move.
#[derive(Clone)]
pub struct NnueEval {
    network: Arc<NnueNetwork>,
    stack: Vec<Vec<i32>>,
}

impl NnueEval {
    #[must_use]
    pub fn new(network: Arc<NnueNetwork>) -> Self {
        NnueEval {
            network,
            stack: Vec::new(),
        }
    }

    fn refresh(&self, board: &Board) -> Vec<i32> {
        let mut acc: Vec<i32> = self.network.feature_bias.iter().map(|&b| i32::from(b)).collect();
        for color in [Color::White, Color::Black] {
            for p_idx in 0..6 {
                let piece = Piece::from_index(p_idx).expect("piece index in range");
                for sq in board.pieces_of(color, piece).iter() {
                    let feature = feature_index(color, piece, Square::from_index(sq));
                    for (a, w) in acc.iter_mut().zip(self.network.weights_for(feature)) {
                        *a += i32::from(*w);
                    }
                }
            }
        }
        acc
    }

    fn add_feature(acc: &mut [i32], weights: &[i16]) {
        for (a, w) in acc.iter_mut().zip(weights) {
            *a += i32::from(*w);
        }
    }

    fn sub_feature(acc: &mut [i32], weights: &[i16]) {
        for (a, w) in acc.iter_mut().zip(weights) {
            *a -= i32::from(*w);
        }
    }

    pub fn initialize(&mut self, board: &Board) {
        self.stack.clear();
        let acc = self.refresh(board);
        self.stack.push(acc);
    }

    /// Apply the feature deltas of `mv`; `board` is the position before it.
    pub fn push(&mut self, board: &Board, mv: Move) {
        let mut acc = match self.stack.last() {
            Some(top) => top.clone(),
            None => self.refresh(board),
        };

        let color = board.side_to_move();
        let Some((_, moving_piece)) = board.piece_at(mv.from()) else {
            self.stack.push(acc);
            return;
        };

        let net = Arc::clone(&self.network);

        Self::sub_feature(&mut acc, net.weights_for(feature_index(color, moving_piece, mv.from())));

        if mv.is_en_passant() {
            // The captured pawn stands on the capturer's rank, in the
            // destination's file
            let bypassed = Square::new(mv.from().rank(), mv.to().file());
            Self::sub_feature(
                &mut acc,
                net.weights_for(feature_index(color.opponent(), Piece::Pawn, bypassed)),
            );
        } else if let Some((cap_color, cap_piece)) = board.piece_at(mv.to()) {
            Self::sub_feature(
                &mut acc,
                net.weights_for(feature_index(cap_color, cap_piece, mv.to())),
            );
        }

        let placed = mv.promotion_piece().unwrap_or(moving_piece);
        Self::add_feature(&mut acc, net.weights_for(feature_index(color, placed, mv.to())));

        if mv.is_castling() {
            let (rook_from_f, rook_to_f) = if mv.to().file() == 6 { (7, 5) } else { (0, 3) };
            let rank = mv.to().rank();
            Self::sub_feature(
                &mut acc,
                net.weights_for(feature_index(color, Piece::Rook, Square::new(rank, rook_from_f))),
            );
            Self::add_feature(
                &mut acc,
                net.weights_for(feature_index(color, Piece::Rook, Square::new(rank, rook_to_f))),
            );
        }

        self.stack.push(acc);
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Centipawn score from the side-to-move's perspective.
    #[must_use]
    pub fn evaluate(&self, board: &Board) -> i32 {
        let white_score = match self.stack.last() {
            Some(acc) => self.network.forward(acc),
            None => self.network.forward(&self.refresh(board)),
        };

        if board.white_to_move() {
            white_score
        } else {
            -white_score
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_test_network(
        name: &str,
        hidden: u32,
        output_bias: i16,
        tweak: impl Fn(&mut Vec<i16>),
    ) -> PathBuf {
        let path = std::env::temp_dir().join(format!("sirocco_net_{name}_{}.srnn", std::process::id()));
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&ARCH_PIECE_SQUARE.to_le_bytes());
        bytes.extend_from_slice(&PIECE_SQUARE_FEATURES.to_le_bytes());
        bytes.extend_from_slice(&hidden.to_le_bytes());
        bytes.extend_from_slice(&(QB).to_le_bytes());

        let mut feature_weights = vec![0i16; (PIECE_SQUARE_FEATURES * hidden) as usize];
        tweak(&mut feature_weights);

        let biases = vec![0i16; hidden as usize];
        let output_weights = vec![1i16; hidden as usize];
        let bias_section = [output_bias];
        let sections: [(&[i16], u32); 4] = [
            (&feature_weights, PIECE_SQUARE_FEATURES * hidden),
            (&biases, hidden),
            (&output_weights, hidden),
            (&bias_section, 1),
        ];
        for (values, count) in sections {
            bytes.extend_from_slice(&count.to_le_bytes());
            for v in values {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }

        let mut file = std::fs::File::create(&path).expect("create test network");
        file.write_all(&bytes).expect("write test network");
        path
    }

    #[test]
    fn test_load_and_constant_output() {
        let path = write_test_network("const", 4, 100, |_| {});
        let network = NnueNetwork::load(&path).expect("load");
        assert_eq!(network.hidden_dim, 4);

        let eval = NnueEval::new(Arc::new(network));
        let board = Board::new();
        // All feature weights zero: output is the bias alone
        assert_eq!(eval.evaluate(&board), 100);

        let black: Board = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1"
            .parse()
            .unwrap();
        assert_eq!(eval.evaluate(&black), -100);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_bad_magic_rejected() {
        let path = std::env::temp_dir().join(format!("sirocco_net_badmagic_{}.srnn", std::process::id()));
        std::fs::write(&path, b"NOPE0000000000000000").unwrap();
        match NnueNetwork::load(&path) {
            Err(NetError::BadMagic(_)) => {}
            other => panic!("expected BadMagic, got {other:?}"),
        }
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_truncated_file_rejected() {
        let path = std::env::temp_dir().join(format!("sirocco_net_trunc_{}.srnn", std::process::id()));
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&ARCH_PIECE_SQUARE.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(NnueNetwork::load(&path), Err(NetError::Io(_))));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_push_pop_matches_refresh() {
        // Give every feature a distinct-ish weight so errors show up
        let path = write_test_network("incr", 2, 0, |weights| {
            for (i, w) in weights.iter_mut().enumerate() {
                *w = (i % 97) as i16 - 48;
            }
        });
        let network = Arc::new(NnueNetwork::load(&path).expect("load"));
        let mut eval = NnueEval::new(Arc::clone(&network));

        let mut board = Board::new();
        eval.initialize(&board);
        let baseline = eval.evaluate(&board);

        let moves: Vec<_> = board.generate_legal().iter().copied().collect();
        for mv in moves {
            eval.push(&board, mv);
            board.make_move(mv);

            // Incremental accumulator must agree with a from-scratch build
            let fresh = NnueEval::new(Arc::clone(&network));
            assert_eq!(eval.evaluate(&board), fresh.evaluate(&board), "after {mv}");

            board.unmake_move();
            eval.pop();
            assert_eq!(eval.evaluate(&board), baseline, "after undoing {mv}");
        }

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_castling_and_en_passant_deltas() {
        let path = write_test_network("special", 2, 0, |weights| {
            for (i, w) in weights.iter_mut().enumerate() {
                *w = (i % 53) as i16 - 26;
            }
        });
        let network = Arc::new(NnueNetwork::load(&path).expect("load"));

        for fen in [
            "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        ] {
            let mut board: Board = fen.parse().unwrap();
            let mut eval = NnueEval::new(Arc::clone(&network));
            eval.initialize(&board);

            let moves: Vec<_> = board.generate_legal().iter().copied().collect();
            for mv in moves {
                eval.push(&board, mv);
                board.make_move(mv);
                let fresh = NnueEval::new(Arc::clone(&network));
                assert_eq!(eval.evaluate(&board), fresh.evaluate(&board), "{fen} {mv}");
                board.unmake_move();
                eval.pop();
            }
        }

        std::fs::remove_file(path).ok();
    }
}
