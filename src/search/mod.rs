//! Search module: iterative-deepening alpha-beta with aspiration windows.
//!
//! Features:
//! - Quiescence search with SEE and delta pruning
//! - Transposition table cutoffs and move ordering
//! - Null move, reverse futility, razoring, ProbCut
//! - Internal iterative deepening, singular and check extensions
//! - Futility pruning, late move pruning, late move reductions
//! - Killers, counter moves, and butterfly history per thread
//! - Root-move parallelism over a task queue with an iteration barrier

mod alphabeta;
mod constants;
mod params;
mod pruning;
mod quiescence;
mod root;
mod tables;

pub use constants::{MATE_SCORE, MATE_THRESHOLD, SCORE_INFINITE};
pub use params::SearchParams;
pub use root::{search, SearchOutcome, SearchSettings};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::board::{Board, Move, EMPTY_MOVE, MAX_PLY};
use crate::eval::Evaluator;
use crate::syzygy::Tablebases;
use crate::tt::TranspositionTable;

use tables::ThreadTables;

/// One completed iteration, published to the UCI layer.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub depth: u32,
    pub seldepth: u32,
    pub multipv: u32,
    pub score_cp: i32,
    pub mate_in: Option<i32>,
    pub nodes: u64,
    pub nps: u64,
    pub hashfull: u32,
    pub tbhits: u64,
    pub time_ms: u64,
    pub pv: Vec<Move>,
}

/// Callback type for iteration info.
pub type InfoCallback = Arc<dyn Fn(&SearchReport) + Send + Sync>;

/// Mate scores are stored in the TT relative to the storing node and
/// re-based to the root on probe.
#[inline]
pub(crate) fn score_to_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply as i32
    } else if score <= -MATE_THRESHOLD {
        score - ply as i32
    } else {
        score
    }
}

#[inline]
pub(crate) fn score_from_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply as i32
    } else if score <= -MATE_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}

/// How often the hot loop polls the clock and shared counters.
const CHECK_INTERVAL_NODES: u64 = 1024;

/// Per-thread search state for one (sub)tree.
pub(crate) struct SearchContext<'a> {
    pub(crate) board: &'a mut Board,
    pub(crate) evaluator: &'a mut Evaluator,
    pub(crate) tt: &'a TranspositionTable,
    pub(crate) tb: &'a Tablebases,
    pub(crate) tables: &'a mut ThreadTables,
    pub(crate) params: &'a SearchParams,
    pub(crate) stop: &'a AtomicBool,
    pub(crate) shared_nodes: &'a AtomicU64,
    pub(crate) shared_tbhits: &'a AtomicU64,
    pub(crate) shared_seldepth: &'a AtomicU64,
    pub(crate) deadline: Option<Instant>,
    pub(crate) node_limit: u64,
    pub(crate) generation: u8,
    pub(crate) initial_depth: u32,
    pub(crate) nodes: u64,
    unflushed_nodes: u64,
    pub(crate) seldepth: u32,
    pub(crate) static_eval: [i32; MAX_PLY],
    pub(crate) previous_move: [Move; MAX_PLY],
}

impl<'a> SearchContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        board: &'a mut Board,
        evaluator: &'a mut Evaluator,
        tt: &'a TranspositionTable,
        tb: &'a Tablebases,
        tables: &'a mut ThreadTables,
        params: &'a SearchParams,
        stop: &'a AtomicBool,
        shared_nodes: &'a AtomicU64,
        shared_tbhits: &'a AtomicU64,
        shared_seldepth: &'a AtomicU64,
        deadline: Option<Instant>,
        node_limit: u64,
        generation: u8,
    ) -> Self {
        SearchContext {
            board,
            evaluator,
            tt,
            tb,
            tables,
            params,
            stop,
            shared_nodes,
            shared_tbhits,
            shared_seldepth,
            deadline,
            node_limit,
            generation,
            initial_depth: 1,
            nodes: 0,
            unflushed_nodes: 0,
            seldepth: 0,
            static_eval: [0; MAX_PLY],
            previous_move: [EMPTY_MOVE; MAX_PLY],
        }
    }

    #[inline]
    pub(crate) fn count_node(&mut self, ply: usize) {
        self.nodes += 1;
        self.unflushed_nodes += 1;
        let depth_seen = ply as u32 + 1;
        if depth_seen > self.seldepth {
            self.seldepth = depth_seen;
        }
    }

    /// Publish local node counts and the selective-depth maximum into the
    /// shared aggregates.
    pub(crate) fn flush_counters(&mut self) {
        if self.unflushed_nodes > 0 {
            self.shared_nodes
                .fetch_add(self.unflushed_nodes, Ordering::Relaxed);
            self.unflushed_nodes = 0;
        }
        self.shared_seldepth
            .fetch_max(u64::from(self.seldepth), Ordering::Relaxed);
    }

    /// Poll the stop flag, node limit, and hard deadline. Limit trips set
    /// the shared stop flag so all workers wind down together.
    #[inline]
    pub(crate) fn should_stop(&mut self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return true;
        }

        if self.unflushed_nodes >= CHECK_INTERVAL_NODES {
            self.flush_counters();

            if self.node_limit > 0 && self.shared_nodes.load(Ordering::Relaxed) >= self.node_limit {
                self.stop.store(true, Ordering::Relaxed);
                return true;
            }
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.stop.store(true, Ordering::Relaxed);
                    return true;
                }
            }
        }

        false
    }

    /// Static evaluation from the side-to-move's perspective.
    #[inline]
    pub(crate) fn evaluate(&self) -> i32 {
        self.evaluator.evaluate(self.board)
    }

    /// Make a move, mirroring it into the evaluation backend.
    #[inline]
    pub(crate) fn make(&mut self, m: Move) {
        self.evaluator.push(self.board, m);
        self.board.make_move(m);
    }

    #[inline]
    pub(crate) fn unmake(&mut self) {
        self.board.unmake_move();
        self.evaluator.pop();
    }

    /// Twofold repetition inside the search tree counts as a draw.
    #[inline]
    pub(crate) fn is_repetition(&self) -> bool {
        self.board.repetitions() > 1
    }

    /// Eval trending up versus two plies ago?
    #[inline]
    pub(crate) fn is_improving(&self, ply: usize, eval: i32) -> bool {
        if ply < 2 {
            true
        } else {
            eval > self.static_eval[ply - 2]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tt_score_rebasing_round_trip() {
        for ply in [0usize, 1, 5, 40] {
            for score in [0, 120, -800, MATE_SCORE - 7, -(MATE_SCORE - 9)] {
                let stored = score_to_tt(score, ply);
                assert_eq!(score_from_tt(stored, ply), score);
            }
        }
    }

    #[test]
    fn test_mate_rebasing_direction() {
        // A mate found 3 plies below the root, stored at ply 3, probed at
        // ply 1, must look one ply closer than at the root
        let at_node = MATE_SCORE - 10;
        let stored = score_to_tt(at_node, 3);
        assert_eq!(stored, MATE_SCORE - 7);
        assert_eq!(score_from_tt(stored, 1), MATE_SCORE - 8);
    }
}
