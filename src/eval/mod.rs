//! Evaluation backends.
//!
//! The engine evaluates positions through a tagged backend: a handcrafted
//! classical evaluator or an NNUE-style network loaded from a file. Both
//! expose the same capability set (`initialize`, `push`, `pop`,
//! `evaluate`); the search mirrors its make/unmake calls into push/pop so
//! backends can keep incremental state.

mod classical;
mod nnue;

pub use classical::ClassicalEval;
pub use nnue::{NetError, NnueEval, NnueNetwork};

use crate::board::{Board, Move};

/// Evaluation backend, selected once per search session.
#[derive(Clone)]
pub enum Evaluator {
    Classical(ClassicalEval),
    Nnue(NnueEval),
}

impl Evaluator {
    /// The handcrafted material + piece-square evaluator.
    #[must_use]
    pub fn classical() -> Self {
        Evaluator::Classical(ClassicalEval::new())
    }

    /// Load an NNUE network from `path` and build a backend around it.
    /// On failure the caller keeps its previously active backend.
    pub fn nnue_from_file(path: &std::path::Path) -> Result<Self, NetError> {
        let network = NnueNetwork::load(path)?;
        Ok(Evaluator::Nnue(NnueEval::new(std::sync::Arc::new(network))))
    }

    /// Reset incremental state for a new root position.
    pub fn initialize(&mut self, board: &Board) {
        match self {
            Evaluator::Classical(e) => e.initialize(board),
            Evaluator::Nnue(e) => e.initialize(board),
        }
    }

    /// Mirror of `Board::make_move`; `board` is the position before `mv`.
    pub fn push(&mut self, board: &Board, mv: Move) {
        match self {
            Evaluator::Classical(e) => e.push(board, mv),
            Evaluator::Nnue(e) => e.push(board, mv),
        }
    }

    /// Mirror of `Board::unmake_move`.
    pub fn pop(&mut self) {
        match self {
            Evaluator::Classical(e) => e.pop(),
            Evaluator::Nnue(e) => e.pop(),
        }
    }

    /// Centipawn score from the side-to-move's perspective.
    #[must_use]
    pub fn evaluate(&self, board: &Board) -> i32 {
        match self {
            Evaluator::Classical(e) => e.evaluate(board),
            Evaluator::Nnue(e) => e.evaluate(board),
        }
    }

    /// Short name for UCI info strings.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Evaluator::Classical(_) => "classical",
            Evaluator::Nnue(_) => "nnue",
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::classical()
    }
}
