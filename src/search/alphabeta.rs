//! The alpha-beta node: transposition cutoffs, extensions, and the
//! principal-variation-search move loop.

use once_cell::sync::Lazy;

use crate::board::{Move, MoveList, EMPTY_MOVE, MAX_PLY};
use crate::syzygy::Wdl;
use crate::tt::Bound;

use super::constants::{
    CAPTURE_BASE_SCORE, BAD_CAPTURE_BASE_SCORE, COUNTER_SCORE, KILLER1_SCORE, KILLER2_SCORE,
    LMR_SCORE_THRESHOLD, LMR_TABLE_MAX_DEPTH, LMR_TABLE_MAX_IDX, MATE_SCORE, MATE_THRESHOLD,
    SCORE_INFINITE, TB_WIN_SCORE, TT_MOVE_SCORE,
};
use super::tables::{mvv_lva_score, RankedMoves};
use super::{score_from_tt, score_to_tt, SearchContext};

/// Precomputed log-log reduction table.
static LMR_TABLE: Lazy<[[u32; LMR_TABLE_MAX_IDX]; LMR_TABLE_MAX_DEPTH]> = Lazy::new(|| {
    let mut table = [[0u32; LMR_TABLE_MAX_IDX]; LMR_TABLE_MAX_DEPTH];
    for (depth, row) in table.iter_mut().enumerate().skip(1) {
        for (idx, cell) in row.iter_mut().enumerate().skip(1) {
            let val = (0.5 + (depth as f64).ln() * (idx as f64).ln() / 2.4).floor();
            *cell = val.max(0.0) as u32;
        }
    }
    table
});

/// Map a tablebase verdict to a search score at `ply`.
fn tb_score(wdl: Wdl, ply: usize) -> i32 {
    match wdl {
        Wdl::Win => TB_WIN_SCORE - ply as i32,
        Wdl::Loss => -(TB_WIN_SCORE - ply as i32),
        Wdl::Draw | Wdl::BlessedLoss | Wdl::CursedWin => 0,
    }
}

#[derive(Clone, Copy)]
pub(crate) struct NodeContext {
    pub(crate) ply: usize,
    pub(crate) is_pv: bool,
    pub(crate) in_check: bool,
    pub(crate) improving: bool,
    pub(crate) excluded: Move,
    pub(crate) tt_move: Move,
    pub(crate) static_eval: i32,
    pub(crate) singular_extension: u32,
}

impl SearchContext<'_> {
    /// Full-width alpha-beta with all pruning and extension machinery.
    /// `excluded` carries the move omitted by a singular-extension probe.
    pub(crate) fn alphabeta(
        &mut self,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        allow_null: bool,
        ply: usize,
        excluded: Move,
    ) -> i32 {
        if depth == 0 || ply >= MAX_PLY - 1 {
            return self.quiesce(alpha, beta, ply, 0);
        }

        let not_root = ply > 0;
        let is_pv = beta > alpha + 1;
        let excluded_active = excluded != EMPTY_MOVE;

        self.count_node(ply);
        if self.should_stop() {
            return 0;
        }

        if not_root && (self.board.is_theoretical_draw() || self.is_repetition()) {
            return 0;
        }

        // Mate distance pruning
        if not_root {
            alpha = alpha.max(-MATE_SCORE + ply as i32);
            beta = beta.min(MATE_SCORE - ply as i32 - 1);
            if alpha >= beta {
                return alpha;
            }
        }

        let in_check = self.board.is_in_check(self.board.side_to_move());

        // Tablebase probe: exact verdicts replace the whole subtree
        if not_root && !excluded_active && self.tb.should_probe(self.board, depth) {
            if let Some(probe) = self.tb.probe_wdl(self.board) {
                self.record_tbhit();
                return tb_score(probe.wdl, ply);
            }
        }

        // Transposition table probe
        let (mut tt_move, tt_score, tt_bound, tt_depth) = self.probe_tt(ply);
        if !excluded_active
            && not_root
            && tt_depth >= depth as i32
            && !self.is_repetition()
        {
            let cutoff = match tt_bound {
                Bound::Exact => !is_pv || (tt_score > alpha && tt_score < beta),
                Bound::Lower => tt_score >= beta,
                Bound::Upper => tt_score <= alpha,
            };
            if cutoff {
                return tt_score;
            }
        }

        let moves = self.board.generate_legal();
        if moves.is_empty() {
            return if in_check {
                -MATE_SCORE + ply as i32
            } else {
                0
            };
        }

        let static_eval = if in_check {
            -SCORE_INFINITE
        } else {
            self.evaluate()
        };
        if ply < MAX_PLY {
            self.static_eval[ply] = static_eval;
        }
        let improving = !in_check && self.is_improving(ply, static_eval);

        let mut node = NodeContext {
            ply,
            is_pv,
            in_check,
            improving,
            excluded,
            tt_move,
            static_eval,
            singular_extension: 0,
        };

        // Node-level pruning, skipped in PV nodes and while in check
        if !is_pv && !in_check && !excluded_active {
            if let Some(score) = self.prune_before_moves(depth, alpha, beta, static_eval, &node, allow_null)
            {
                return score;
            }
        }

        // Internal iterative deepening: no hash move at high depth means
        // the shallow search runs first just to seed ordering
        if tt_move == EMPTY_MOVE && depth >= self.params.iid_min_depth && !excluded_active {
            let iid_depth = depth - self.params.iid_reduction;
            self.alphabeta(iid_depth, alpha, beta, false, ply, EMPTY_MOVE);
            if let Some(entry) = self.tt.probe(self.board.hash()) {
                tt_move = entry.best_move().unwrap_or(EMPTY_MOVE);
            }
            node.tt_move = tt_move;
        }

        // Singular extension: is the hash move provably the only good one?
        if !excluded_active
            && not_root
            && depth >= self.params.singular_min_depth
            && tt_move != EMPTY_MOVE
            && tt_score.abs() < MATE_THRESHOLD
            && matches!(tt_bound, Bound::Lower | Bound::Exact)
            && tt_depth >= depth as i32 - 3
        {
            let singular_beta = tt_score - self.params.singular_margin * depth as i32;
            let singular_depth = (depth - 1) / 2;
            let singular_score =
                self.alphabeta(singular_depth, singular_beta - 1, singular_beta, false, ply, tt_move);
            if singular_score < singular_beta {
                node.singular_extension = 1;
            }
        }

        self.search_moves(&node, depth, alpha, beta, &moves)
    }

    /// Probe the TT: returns (move, root-relative score, bound, depth).
    /// Depth -1 signals a miss.
    fn probe_tt(&self, ply: usize) -> (Move, i32, Bound, i32) {
        match self.tt.probe(self.board.hash()) {
            Some(entry) => (
                entry.best_move().unwrap_or(EMPTY_MOVE),
                score_from_tt(i32::from(entry.score), ply),
                entry.bound,
                i32::from(entry.depth),
            ),
            None => (EMPTY_MOVE, 0, Bound::Exact, -1),
        }
    }

    pub(crate) fn store_tt(
        &self,
        depth: u32,
        score: i32,
        bound: Bound,
        best_move: Move,
        static_eval: i32,
        ply: usize,
    ) {
        let stored_score = score_to_tt(score, ply).clamp(-SCORE_INFINITE, SCORE_INFINITE) as i16;
        let stored_eval = static_eval.clamp(-SCORE_INFINITE, SCORE_INFINITE) as i16;
        self.tt.store(
            self.board.hash(),
            best_move,
            stored_score,
            stored_eval,
            depth.min(126) as i8,
            bound,
            self.generation,
        );
    }

    /// Order moves: hash move, captures by SEE with MVV-LVA tiebreak,
    /// killers, counter move, then quiets by history.
    fn order_moves(&mut self, moves: &MoveList, tt_move: Move, ply: usize, prev: Move) -> RankedMoves {
        let counter = if prev == EMPTY_MOVE {
            EMPTY_MOVE
        } else {
            self.tables.counters.get(prev)
        };

        let mut ranked = RankedMoves::with_capacity(moves.len());
        for m in moves {
            let score = if *m == tt_move {
                TT_MOVE_SCORE
            } else if m.is_capture() {
                let ordering = mvv_lva_score(self.board, *m);
                if self.board.see_ge(m.from(), m.to(), 0) {
                    CAPTURE_BASE_SCORE + ordering
                } else {
                    BAD_CAPTURE_BASE_SCORE + ordering
                }
            } else if ply < MAX_PLY && *m == self.tables.killers.primary(ply) {
                KILLER1_SCORE
            } else if ply < MAX_PLY && *m == self.tables.killers.secondary(ply) {
                KILLER2_SCORE
            } else if *m == counter {
                COUNTER_SCORE
            } else {
                self.tables.history.score(*m)
            };
            ranked.add(score, *m);
        }
        ranked
    }

    fn lmr_reduction(
        depth: u32,
        move_idx: usize,
        move_score: i32,
        node: &NodeContext,
        gives_check: bool,
        is_quiet: bool,
    ) -> u32 {
        let lmr_ok = move_idx > 2
            && move_score < LMR_SCORE_THRESHOLD
            && depth > 2
            && !node.in_check
            && !gives_check
            && is_quiet
            && !node.is_pv;

        if !lmr_ok {
            return 0;
        }

        let depth_idx = (depth as usize).min(LMR_TABLE_MAX_DEPTH - 1);
        let idx = move_idx.min(LMR_TABLE_MAX_IDX - 1);
        let mut reduction = LMR_TABLE[depth_idx][idx];
        if !node.improving {
            reduction += 1;
        }
        reduction.min(depth - 1)
    }

    /// The PVS move loop.
    fn search_moves(
        &mut self,
        node: &NodeContext,
        depth: u32,
        mut alpha: i32,
        beta: i32,
        moves: &MoveList,
    ) -> i32 {
        let ply = node.ply;
        let prev = if ply > 0 && ply < MAX_PLY {
            self.previous_move[ply - 1]
        } else {
            EMPTY_MOVE
        };

        let mut ranked = self.order_moves(moves, node.tt_move, ply, prev);
        let original_alpha = alpha;

        let mut best_score = -SCORE_INFINITE;
        let mut best_move = EMPTY_MOVE;
        let mut moves_searched = 0usize;
        let mut quiets_searched = 0usize;
        let mut quiets_tried: [Move; 64] = [EMPTY_MOVE; 64];
        let mut quiets_count = 0usize;

        let mut order_index = 0usize;
        while let Some((move_score, m)) = ranked.next() {
            order_index += 1;

            if m == node.excluded {
                continue;
            }
            if self.should_stop() {
                break;
            }

            let is_quiet = !m.is_capture() && !m.is_promotion();

            // Futility: a quiet move from a hopeless eval at low depth
            // cannot raise alpha
            if is_quiet
                && moves_searched > 0
                && !node.is_pv
                && !node.in_check
                && depth <= self.params.futility_max_depth
                && alpha.abs() < MATE_THRESHOLD
                && node.static_eval + self.params.futility_margin * depth as i32 <= alpha
            {
                continue;
            }

            // Late move pruning: enough quiets seen at low depth
            if is_quiet
                && moves_searched > 0
                && !node.is_pv
                && !node.in_check
                && depth <= self.params.lmp_max_depth
                && quiets_searched >= self.params.lmp_limit(depth)
            {
                continue;
            }

            if is_quiet {
                quiets_searched += 1;
                if quiets_count < quiets_tried.len() {
                    quiets_tried[quiets_count] = m;
                    quiets_count += 1;
                }
            }

            self.make(m);
            let gives_check = self.board.is_in_check(self.board.side_to_move());
            if ply < MAX_PLY {
                self.previous_move[ply] = m;
            }
            moves_searched += 1;

            let mut extension = 0u32;
            if gives_check {
                extension += 1;
            }
            if m == node.tt_move {
                extension += node.singular_extension;
            }

            let new_depth = depth - 1 + extension;
            let reduction =
                Self::lmr_reduction(depth, order_index - 1, move_score, node, gives_check, is_quiet);

            let mut score;
            if moves_searched == 1 {
                score = -self.alphabeta(new_depth, -beta, -alpha, true, ply + 1, EMPTY_MOVE);
            } else {
                // Zero-window probe, reduced for late quiets
                score = -self.alphabeta(
                    new_depth.saturating_sub(reduction),
                    -alpha - 1,
                    -alpha,
                    true,
                    ply + 1,
                    EMPTY_MOVE,
                );

                // Fail-high against the reduction: repeat at full depth
                if reduction > 0 && score > alpha {
                    score = -self.alphabeta(new_depth, -alpha - 1, -alpha, true, ply + 1, EMPTY_MOVE);
                }

                // Fail-high in the zero window at a PV node: full window
                if score > alpha && score < beta {
                    score = -self.alphabeta(new_depth, -beta, -alpha, true, ply + 1, EMPTY_MOVE);
                }
            }

            self.unmake();

            if self.should_stop() {
                break;
            }

            if score > best_score {
                best_score = score;
                best_move = m;

                if score > alpha {
                    if score >= beta {
                        self.record_cutoff(m, ply, depth, &quiets_tried[..quiets_count]);
                        if !self.stop_requested() {
                            self.store_tt(depth, score, Bound::Lower, m, node.static_eval, ply);
                        }
                        return score;
                    }
                    alpha = score;
                }
            }
        }

        if moves_searched == 0 {
            // Every legal move was excluded or pruned away
            return alpha;
        }

        if !self.stop_requested() && best_move != EMPTY_MOVE {
            let bound = if best_score > original_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.store_tt(depth, best_score, bound, best_move, node.static_eval, ply);
        }

        best_score
    }

    /// Update killers, counter move, and history after a beta cutoff.
    fn record_cutoff(&mut self, m: Move, ply: usize, depth: u32, earlier_quiets: &[Move]) {
        if m.is_capture() {
            return;
        }

        if ply < MAX_PLY {
            self.tables.killers.update(ply, m);
        }
        if ply > 0 && ply <= MAX_PLY {
            let prev = self.previous_move[ply - 1];
            if prev != EMPTY_MOVE {
                self.tables.counters.set(prev, m);
            }
        }

        self.tables.history.reward(m, depth);
        for &quiet in earlier_quiets {
            if quiet != m && quiet != EMPTY_MOVE {
                self.tables.history.penalize(quiet, depth);
            }
        }
    }

    #[inline]
    fn stop_requested(&self) -> bool {
        self.stop.load(std::sync::atomic::Ordering::Relaxed)
    }

    #[inline]
    fn record_tbhit(&mut self) {
        self.shared_tbhits
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }
}
