//! Root search: iterative deepening with aspiration windows, MultiPV
//! lines, and root-move parallelism.
//!
//! Each iteration the first root move is searched at full window on the
//! calling thread; the remaining root moves become tasks in a shared queue
//! that worker threads drain with zero-window probes against a shared
//! alpha, re-searching locally on fail-high. The iteration ends with a
//! full barrier (scope join) before the result is published.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;

use crate::board::{Board, Move, EMPTY_MOVE, MAX_PLY};
use crate::eval::Evaluator;
use crate::syzygy::Tablebases;
use crate::tt::{Bound, TranspositionTable};

use super::constants::{MATE_SCORE, MATE_THRESHOLD, SCORE_INFINITE};
use super::params::SearchParams;
use super::tables::ThreadTables;
use super::{score_to_tt, InfoCallback, SearchContext, SearchReport};

/// Limits and knobs for one search run.
#[derive(Clone)]
pub struct SearchSettings {
    pub max_depth: u32,
    pub node_limit: u64,
    /// Soft budget: no new iteration starts past this point.
    pub optimal_time_ms: u64,
    /// Hard deadline polled inside the tree.
    pub maximum_time_ms: u64,
    pub multipv: u32,
    pub threads: usize,
    pub infinite: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            max_depth: 64,
            node_limit: 0,
            optimal_time_ms: u64::MAX,
            maximum_time_ms: u64::MAX,
            multipv: 1,
            threads: 1,
            infinite: false,
        }
    }
}

impl SearchSettings {
    #[must_use]
    pub fn depth(max_depth: u32) -> Self {
        SearchSettings {
            max_depth,
            ..SearchSettings::default()
        }
    }
}

/// Final verdict of a search run.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
    pub score: i32,
    pub depth: u32,
    pub nodes: u64,
}

struct RootMove {
    mv: Move,
    score: i32,
}

/// Per-worker state, reused across iterations. Killers, history, counter
/// moves, and the evaluation stack are never shared between threads.
struct WorkerData {
    tables: ThreadTables,
    evaluator: Evaluator,
}

/// Search `board` under `settings` and report the best line(s).
#[allow(clippy::too_many_arguments)]
pub fn search(
    board: &mut Board,
    evaluator: &mut Evaluator,
    tt: &TranspositionTable,
    tb: &Tablebases,
    params: &SearchParams,
    settings: &SearchSettings,
    stop: &Arc<AtomicBool>,
    info: Option<InfoCallback>,
) -> SearchOutcome {
    let start = Instant::now();
    let stop: &AtomicBool = stop;
    let generation = tt.prepare_for_search();

    let shared_nodes = AtomicU64::new(0);
    let shared_tbhits = AtomicU64::new(0);
    let shared_seldepth = AtomicU64::new(0);

    let deadline = if settings.maximum_time_ms == u64::MAX {
        None
    } else {
        Some(start + std::time::Duration::from_millis(settings.maximum_time_ms))
    };

    let all_moves = board.generate_legal();
    if all_moves.is_empty() {
        let score = if board.is_in_check(board.side_to_move()) {
            -MATE_SCORE
        } else {
            0
        };
        return SearchOutcome {
            best_move: None,
            ponder_move: None,
            score,
            depth: 0,
            nodes: 0,
        };
    }

    evaluator.initialize(board);

    let mut main_tables = ThreadTables::new();
    main_tables.new_search();

    let worker_count = settings.threads.max(1) - 1;
    let mut pool: Vec<WorkerData> = (0..worker_count)
        .map(|_| {
            let mut data = WorkerData {
                tables: ThreadTables::new(),
                evaluator: evaluator.clone(),
            };
            data.tables.new_search();
            data
        })
        .collect();

    let multipv = settings.multipv.clamp(1, all_moves.len() as u32);
    let mut excluded: Vec<Move> = Vec::new();
    let mut lines: Vec<(Move, i32, u32)> = Vec::new();

    for line_index in 1..=multipv {
        let mut root_moves: Vec<RootMove> = all_moves
            .iter()
            .filter(|m| !excluded.contains(m))
            .map(|m| RootMove { mv: *m, score: 0 })
            .collect();
        if root_moves.is_empty() {
            break;
        }

        let mut line_best = root_moves[0].mv;
        let mut line_score = 0i32;
        let mut line_depth = 0u32;
        let mut prev_score = 0i32;

        for depth in 1..=settings.max_depth.max(1) {
            if stop.load(Ordering::Relaxed) {
                break;
            }

            // Aspiration window around the previous iteration's score
            let mut delta = if depth <= 4 { SCORE_INFINITE } else { 25 };
            let mut alpha = prev_score.saturating_sub(delta).max(-SCORE_INFINITE);
            let mut beta = prev_score.saturating_add(delta).min(SCORE_INFINITE);

            let (score, completed) = loop {
                let iteration = search_root(
                    RootSearchArgs {
                        board,
                        evaluator,
                        tt,
                        tb,
                        params,
                        stop,
                        shared_nodes: &shared_nodes,
                        shared_tbhits: &shared_tbhits,
                        shared_seldepth: &shared_seldepth,
                        deadline,
                        node_limit: settings.node_limit,
                        generation,
                    },
                    &mut main_tables,
                    &mut pool,
                    &mut root_moves,
                    depth,
                    alpha,
                    beta,
                );

                if stop.load(Ordering::Relaxed) && depth > 1 {
                    break (iteration, false);
                }

                if iteration.abs() >= MATE_THRESHOLD {
                    break (iteration, true);
                }

                if iteration <= alpha {
                    // Fail low: widen down, faster
                    alpha = alpha.saturating_sub(delta * 2).max(-SCORE_INFINITE);
                    delta = delta.saturating_mul(2);
                } else if iteration >= beta {
                    beta = beta.saturating_add(delta).min(SCORE_INFINITE);
                    delta = delta.saturating_mul(3) / 2;
                } else {
                    break (iteration, true);
                }

                if delta > 1200 {
                    alpha = -SCORE_INFINITE;
                    beta = SCORE_INFINITE;
                }
            };

            if !completed {
                break;
            }

            // Best move bubbles to the front for the next iteration
            root_moves.sort_by(|a, b| b.score.cmp(&a.score));
            line_best = root_moves[0].mv;
            line_score = score;
            line_depth = depth;
            prev_score = score;

            // Keep the root entry fresh so PV extraction starts right
            tt.store(
                board.hash(),
                line_best,
                score_to_tt(score, 0).clamp(-SCORE_INFINITE, SCORE_INFINITE) as i16,
                0,
                depth.min(126) as i8,
                Bound::Exact,
                generation,
            );

            if let Some(callback) = &info {
                let elapsed = start.elapsed().as_millis() as u64;
                let nodes = shared_nodes.load(Ordering::Relaxed);
                let nps = if elapsed > 0 { nodes * 1000 / elapsed } else { 0 };
                let pv = extract_pv(board, tt, line_best, depth as usize + 8);
                let mate_in = if score >= MATE_THRESHOLD {
                    Some((MATE_SCORE - score + 1) / 2)
                } else if score <= -MATE_THRESHOLD {
                    Some(-((MATE_SCORE + score + 1) / 2))
                } else {
                    None
                };
                callback(&SearchReport {
                    depth,
                    seldepth: shared_seldepth.load(Ordering::Relaxed) as u32,
                    multipv: line_index,
                    score_cp: score,
                    mate_in,
                    nodes,
                    nps,
                    hashfull: tt.hashfull_per_mille(),
                    tbhits: shared_tbhits.load(Ordering::Relaxed),
                    time_ms: elapsed,
                    pv,
                });
            }

            // Soft time: do not start an iteration we cannot finish
            if settings.optimal_time_ms != u64::MAX
                && start.elapsed().as_millis() as u64 >= settings.optimal_time_ms
            {
                break;
            }

            // A proven mate cannot improve with more depth
            if score.abs() >= MATE_THRESHOLD && depth as i32 >= MATE_SCORE - score.abs() {
                break;
            }
        }

        excluded.push(line_best);
        lines.push((line_best, line_score, line_depth));
    }

    let (best_move, score, depth) = lines
        .first()
        .map_or((all_moves[0], 0, 0), |&(mv, s, d)| (mv, s, d));

    let ponder_move = extract_ponder(board, tt, best_move);

    SearchOutcome {
        best_move: Some(best_move),
        ponder_move,
        score,
        depth,
        nodes: shared_nodes.load(Ordering::Relaxed),
    }
}

/// Borrow bundle for one root iteration.
struct RootSearchArgs<'a> {
    board: &'a mut Board,
    evaluator: &'a mut Evaluator,
    tt: &'a TranspositionTable,
    tb: &'a Tablebases,
    params: &'a SearchParams,
    stop: &'a AtomicBool,
    shared_nodes: &'a AtomicU64,
    shared_tbhits: &'a AtomicU64,
    shared_seldepth: &'a AtomicU64,
    deadline: Option<Instant>,
    node_limit: u64,
    generation: u8,
}

/// One depth iteration over the root moves. Returns the best score; each
/// `RootMove.score` is updated in place.
fn search_root(
    args: RootSearchArgs<'_>,
    main_tables: &mut ThreadTables,
    pool: &mut [WorkerData],
    root_moves: &mut [RootMove],
    depth: u32,
    alpha0: i32,
    beta: i32,
) -> i32 {
    let RootSearchArgs {
        board,
        evaluator,
        tt,
        tb,
        params,
        stop,
        shared_nodes,
        shared_tbhits,
        shared_seldepth,
        deadline,
        node_limit,
        generation,
    } = args;

    let mut alpha = alpha0;
    let mut best_score = -SCORE_INFINITE;

    // First root move: full window on the calling thread
    {
        let mut ctx = SearchContext::new(
            board,
            evaluator,
            tt,
            tb,
            main_tables,
            params,
            stop,
            shared_nodes,
            shared_tbhits,
            shared_seldepth,
            deadline,
            node_limit,
            generation,
        );
        ctx.initial_depth = depth;

        let first = root_moves[0].mv;
        ctx.make(first);
        ctx.previous_move[0] = first;
        let score = -ctx.alphabeta(depth - 1, -beta, -alpha, true, 1, EMPTY_MOVE);
        ctx.unmake();
        ctx.flush_counters();

        root_moves[0].score = score;
        best_score = score;
        alpha = alpha.max(score);
    }

    if root_moves.len() == 1 || best_score >= beta || stop.load(Ordering::Relaxed) {
        return best_score;
    }

    if pool.is_empty() {
        // Single-threaded: plain PVS over the remaining root moves
        let mut ctx = SearchContext::new(
            board,
            evaluator,
            tt,
            tb,
            main_tables,
            params,
            stop,
            shared_nodes,
            shared_tbhits,
            shared_seldepth,
            deadline,
            node_limit,
            generation,
        );
        ctx.initial_depth = depth;

        for root_move in root_moves.iter_mut().skip(1) {
            if ctx.should_stop() {
                break;
            }
            let mv = root_move.mv;
            ctx.make(mv);
            ctx.previous_move[0] = mv;
            let mut score = -ctx.alphabeta(depth - 1, -alpha - 1, -alpha, true, 1, EMPTY_MOVE);
            if score > alpha && score < beta && !stop.load(Ordering::Relaxed) {
                score = -ctx.alphabeta(depth - 1, -beta, -alpha, true, 1, EMPTY_MOVE);
            }
            ctx.unmake();

            root_move.score = score;
            if score > best_score {
                best_score = score;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                break;
            }
        }
        ctx.flush_counters();
        return best_score;
    }

    // Parallel: remaining root moves become tasks; workers pull them with
    // a cloned board and private ordering tables
    let queue: Mutex<VecDeque<usize>> = Mutex::new((1..root_moves.len()).collect());
    let results: Mutex<Vec<(usize, i32)>> = Mutex::new(Vec::with_capacity(root_moves.len() - 1));
    let shared_alpha = AtomicI32::new(alpha);
    let move_list: Vec<Move> = root_moves.iter().map(|rm| rm.mv).collect();
    let root_board: &Board = board;

    thread::scope(|scope| {
        for data in pool.iter_mut() {
            let queue = &queue;
            let results = &results;
            let shared_alpha = &shared_alpha;
            let move_list = &move_list;
            scope.spawn(move || {
                let mut local_board = root_board.clone();
                data.evaluator.initialize(&local_board);

                loop {
                    let Some(task_idx) = queue.lock().pop_front() else {
                        break;
                    };
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }

                    let mv = move_list[task_idx];
                    let window_alpha = shared_alpha.load(Ordering::Relaxed);

                    let mut ctx = SearchContext::new(
                        &mut local_board,
                        &mut data.evaluator,
                        tt,
                        tb,
                        &mut data.tables,
                        params,
                        stop,
                        shared_nodes,
                        shared_tbhits,
                        shared_seldepth,
                        deadline,
                        node_limit,
                        generation,
                    );
                    ctx.initial_depth = depth;

                    ctx.make(mv);
                    ctx.previous_move[0] = mv;
                    let mut score = -ctx.alphabeta(
                        depth - 1,
                        -window_alpha - 1,
                        -window_alpha,
                        true,
                        1,
                        EMPTY_MOVE,
                    );
                    if score > window_alpha && !stop.load(Ordering::Relaxed) {
                        score = -ctx.alphabeta(depth - 1, -beta, -window_alpha, true, 1, EMPTY_MOVE);
                    }
                    ctx.unmake();
                    ctx.flush_counters();

                    shared_alpha.fetch_max(score, Ordering::Relaxed);
                    results.lock().push((task_idx, score));
                }
            });
        }
    });

    for (idx, score) in results.into_inner() {
        root_moves[idx].score = score;
        if score > best_score {
            best_score = score;
        }
    }

    best_score
}

/// Walk the principal variation out of the transposition table.
fn extract_pv(board: &mut Board, tt: &TranspositionTable, first: Move, max_len: usize) -> Vec<Move> {
    let mut pv = Vec::with_capacity(max_len);
    let mut seen = [0u64; MAX_PLY];
    let mut made = 0usize;

    if !board.is_legal_move(first) {
        return pv;
    }
    pv.push(first);
    board.make_move(first);
    made += 1;

    while pv.len() < max_len && made < MAX_PLY {
        let hash = board.hash();
        if seen[..made].contains(&hash) {
            break;
        }
        seen[made] = hash;

        let Some(mv) = tt.probe(hash).and_then(|e| e.best_move()) else {
            break;
        };
        if !board.is_legal_move(mv) {
            break;
        }

        pv.push(mv);
        board.make_move(mv);
        made += 1;
    }

    for _ in 0..made {
        board.unmake_move();
    }

    pv
}

/// The expected reply, pulled from the TT after the best move.
fn extract_ponder(board: &mut Board, tt: &TranspositionTable, best: Move) -> Option<Move> {
    if !board.is_legal_move(best) {
        return None;
    }
    board.make_move(best);
    let ponder = tt
        .probe(board.hash())
        .and_then(|e| e.best_move())
        .filter(|&mv| board.is_legal_move(mv));
    board.unmake_move();
    ponder
}
