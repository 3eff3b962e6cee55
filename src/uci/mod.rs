//! Universal Chess Interface front-end.
//!
//! `EngineSession` owns the root position, the shared transposition table,
//! the evaluation backend, the option registry, and the running search
//! thread; the loop parses one command per line and threads everything
//! through the session. Recoverable failures never kill the process; they
//! surface as `info string` lines and the previous state is retained.

pub mod command;
pub mod options;
pub mod report;

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, warn};

use crate::board::Board;
use crate::eval::Evaluator;
use crate::search::{self, InfoCallback, SearchParams, SearchSettings};
use crate::syzygy::Tablebases;
use crate::time::{compute_allocation, SearchLimits, TimeConfig};
use crate::tt::TranspositionTable;

pub use options::EngineOptions;

use options::{parse_bool, MAX_HASH_MB, MAX_MOVE_OVERHEAD_MS, MAX_MULTIPV, MAX_THREADS};

/// Search thread stack size; the tree recursion is deep in release builds.
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

struct ActiveSearch {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// One engine process: every UCI command mutates this session.
pub struct EngineSession {
    board: Board,
    tt: Arc<TranspositionTable>,
    evaluator: Evaluator,
    params: SearchParams,
    options: EngineOptions,
    tb: Arc<Tablebases>,
    active: Option<ActiveSearch>,
}

impl EngineSession {
    #[must_use]
    pub fn new() -> Self {
        let options = EngineOptions::default();
        EngineSession {
            board: Board::new(),
            tt: Arc::new(TranspositionTable::new(options.hash_mb)),
            evaluator: Evaluator::classical(),
            params: SearchParams::default(),
            tb: Arc::new(Tablebases::new(options.syzygy_config())),
            options,
            active: None,
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    #[must_use]
    pub fn tt(&self) -> &Arc<TranspositionTable> {
        &self.tt
    }

    #[must_use]
    pub fn evaluator_name(&self) -> &'static str {
        self.evaluator.name()
    }

    /// Handle one command line. Returns `false` when the session should
    /// end (`quit`).
    pub fn handle_line(&mut self, line: &str) -> bool {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            return true;
        };

        match command {
            "uci" => options::print_identity(),
            "isready" => println!("readyok"),
            "ucinewgame" => self.cmd_new_game(),
            "position" => self.cmd_position(&parts),
            "go" => self.cmd_go(&parts),
            "stop" => self.stop_search(),
            "ponderhit" => self.cmd_ponderhit(),
            "setoption" => self.cmd_setoption(&parts),
            "quit" => {
                self.stop_search();
                return false;
            }
            other => {
                debug!("ignoring unknown command '{other}'");
            }
        }

        true
    }

    fn cmd_new_game(&mut self) {
        self.stop_search();
        self.tt.clear();
        self.board = Board::new();
    }

    fn cmd_position(&mut self, parts: &[&str]) {
        let mut i = 1;
        let mut board = if parts.get(i) == Some(&"startpos") {
            i += 1;
            Board::new()
        } else if parts.get(i) == Some(&"fen") {
            i += 1;
            let fen_end = parts[i..]
                .iter()
                .position(|&t| t == "moves")
                .map_or(parts.len(), |offset| i + offset);
            let fen = parts[i..fen_end].join(" ");
            i = fen_end;
            match Board::try_from_fen(&fen) {
                Ok(board) => board,
                Err(e) => {
                    println!("info string invalid fen: {e}");
                    return;
                }
            }
        } else {
            println!("info string position requires 'startpos' or 'fen'");
            return;
        };

        if parts.get(i) == Some(&"moves") {
            i += 1;
            while i < parts.len() {
                let token = parts[i];
                if token == "0000" {
                    board.make_null_move();
                    i += 1;
                    continue;
                }
                match board.parse_move(token) {
                    Ok(mv) => board.make_move(mv),
                    Err(e) => {
                        // Remaining tokens are dropped; the position stays
                        // at the last applied move
                        println!("info string illegal move '{token}': {e}");
                        break;
                    }
                }
                i += 1;
            }
        }

        self.board = board;
    }

    fn cmd_go(&mut self, parts: &[&str]) {
        self.stop_search();

        let limits = command::parse_go(&parts[1..]);
        let settings = self.settings_for(&limits);

        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let mut board = self.board.clone();
        let mut evaluator = self.evaluator.clone();
        let tt = Arc::clone(&self.tt);
        let tb = Arc::clone(&self.tb);
        let params = self.params.clone();
        let wait_for_stop = settings.infinite;

        let handle = std::thread::Builder::new()
            .name("search".to_string())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || {
                let info: InfoCallback =
                    Arc::new(|r| println!("{}", report::format_info(r)));

                let outcome = search::search(
                    &mut board,
                    &mut evaluator,
                    &tt,
                    &tb,
                    &params,
                    &settings,
                    &stop_for_thread,
                    Some(info),
                );

                // An infinite or ponder search holds its verdict until the
                // GUI sends stop
                while wait_for_stop && !stop_for_thread.load(Ordering::Relaxed) {
                    std::thread::sleep(Duration::from_millis(5));
                }

                match (outcome.best_move, outcome.ponder_move) {
                    (Some(best), Some(ponder)) => println!("bestmove {best} ponder {ponder}"),
                    (Some(best), None) => println!("bestmove {best}"),
                    (None, _) => println!("bestmove 0000"),
                }
            })
            .expect("failed to spawn search thread");

        self.active = Some(ActiveSearch { stop, handle });
    }

    fn settings_for(&self, limits: &SearchLimits) -> SearchSettings {
        let (optimal, maximum) = if limits.is_untimed() {
            (u64::MAX, u64::MAX)
        } else {
            let alloc = compute_allocation(
                limits,
                self.board.white_to_move(),
                self.options.move_overhead_ms,
                self.board.fullmove_number(),
                &TimeConfig::default(),
            );
            (alloc.optimal_ms, alloc.maximum_ms)
        };

        SearchSettings {
            max_depth: limits.depth.unwrap_or(64).clamp(1, 120),
            node_limit: limits.nodes.unwrap_or(0),
            optimal_time_ms: optimal,
            maximum_time_ms: maximum,
            multipv: self.options.multipv,
            threads: self.options.threads,
            infinite: limits.infinite || limits.ponder,
        }
    }

    /// Cancel the running search, if any, and wait for its `bestmove`.
    pub fn stop_search(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop.store(true, Ordering::Relaxed);
            if active.handle.join().is_err() {
                warn!("search thread panicked");
            }
        }
    }

    fn cmd_ponderhit(&mut self) {
        // The ponder search already has its result; release it
        if let Some(active) = &self.active {
            active.stop.store(true, Ordering::Relaxed);
        }
    }

    fn cmd_setoption(&mut self, parts: &[&str]) {
        let Some((name, value)) = command::parse_setoption(&parts[1..]) else {
            println!("info string setoption requires a name");
            return;
        };
        self.apply_option(&name, value.as_deref());
    }

    /// Apply one option by (case-insensitive) name.
    pub fn apply_option(&mut self, name: &str, value: Option<&str>) {
        match name.trim().to_ascii_lowercase().as_str() {
            "hash" => {
                let mb = value
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(self.options.hash_mb)
                    .clamp(1, MAX_HASH_MB);
                self.options.hash_mb = mb;
                self.tt = Arc::new(TranspositionTable::new(mb));
            }
            "threads" => {
                if let Some(v) = value.and_then(|v| v.parse::<usize>().ok()) {
                    self.options.threads = v.clamp(1, MAX_THREADS);
                }
            }
            "multipv" => {
                if let Some(v) = value.and_then(|v| v.parse::<u32>().ok()) {
                    self.options.multipv = v.clamp(1, MAX_MULTIPV);
                }
            }
            "ponder" => {
                if let Some(v) = value {
                    self.options.ponder = parse_bool(v);
                }
            }
            "moveoverhead" => {
                if let Some(v) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.options.move_overhead_ms = v.min(MAX_MOVE_OVERHEAD_MS);
                }
            }
            "syzygypath" => {
                self.options.syzygy_path = value.unwrap_or_default().to_string();
                self.rebuild_tablebases();
            }
            "syzygyprobedepth" => {
                if let Some(v) = value.and_then(|v| v.parse::<u32>().ok()) {
                    self.options.syzygy_probe_depth = v.clamp(1, 100);
                    self.rebuild_tablebases();
                }
            }
            "syzygy50moverule" => {
                if let Some(v) = value {
                    self.options.syzygy_fifty_move_rule = parse_bool(v);
                    self.rebuild_tablebases();
                }
            }
            "syzygyprobelimit" => {
                if let Some(v) = value.and_then(|v| v.parse::<u32>().ok()) {
                    self.options.syzygy_probe_limit = v.min(7);
                    self.rebuild_tablebases();
                }
            }
            "evalfile" => {
                self.options.eval_file = value.unwrap_or_default().to_string();
                self.reload_evaluator();
            }
            "usennue" => {
                if let Some(v) = value {
                    self.options.use_nnue = parse_bool(v);
                    self.reload_evaluator();
                }
            }
            "uci_chess960" => {
                if value.is_some_and(parse_bool) {
                    println!("info string UCI_Chess960 is not supported");
                }
            }
            "clear hash" => self.tt.clear(),
            other => {
                println!("info string unknown option '{other}'");
            }
        }
    }

    fn rebuild_tablebases(&mut self) {
        self.tb = Arc::new(Tablebases::new(self.options.syzygy_config()));
        if !self.options.syzygy_path.is_empty() && !self.tb.is_available() {
            println!(
                "info string no tablebase files found under '{}'",
                self.options.syzygy_path
            );
        }
    }

    /// Pick the evaluation backend from `UseNNUE` and `EvalFile`. A failed
    /// network load keeps the previously active backend.
    fn reload_evaluator(&mut self) {
        if !self.options.use_nnue {
            self.evaluator = Evaluator::classical();
            return;
        }

        if self.options.eval_file.is_empty() {
            self.evaluator = Evaluator::classical();
            return;
        }

        match Evaluator::nnue_from_file(std::path::Path::new(&self.options.eval_file)) {
            Ok(evaluator) => {
                self.evaluator = evaluator;
                println!("info string loaded network '{}'", self.options.eval_file);
            }
            Err(e) => {
                println!(
                    "info string failed to load network '{}': {e}",
                    self.options.eval_file
                );
            }
        }
    }
}

impl Default for EngineSession {
    fn default() -> Self {
        EngineSession::new()
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.stop_search();
    }
}

/// Read commands from stdin until `quit` or end of input.
pub fn run_uci_loop() {
    let mut session = EngineSession::new();
    let stdin = std::io::stdin();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if !session.handle_line(&line) {
            break;
        }
    }

    session.stop_search();
}
