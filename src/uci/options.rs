//! The UCI option registry and its application to the engine session.

use std::path::PathBuf;

use crate::syzygy::SyzygyConfig;

pub(crate) const DEFAULT_HASH_MB: usize = 16;
pub(crate) const MAX_HASH_MB: usize = 1_048_576;
pub(crate) const MAX_THREADS: usize = 256;
pub(crate) const MAX_MULTIPV: u32 = 256;
pub(crate) const MAX_MOVE_OVERHEAD_MS: u64 = 5000;

/// Current option values, with the registry defaults.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub multipv: u32,
    pub ponder: bool,
    pub move_overhead_ms: u64,
    pub syzygy_path: String,
    pub syzygy_probe_depth: u32,
    pub syzygy_fifty_move_rule: bool,
    pub syzygy_probe_limit: u32,
    pub eval_file: String,
    pub use_nnue: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            hash_mb: DEFAULT_HASH_MB,
            threads: 1,
            multipv: 1,
            ponder: false,
            move_overhead_ms: 10,
            syzygy_path: String::new(),
            syzygy_probe_depth: 1,
            syzygy_fifty_move_rule: true,
            syzygy_probe_limit: 7,
            eval_file: String::new(),
            use_nnue: true,
        }
    }
}

impl EngineOptions {
    pub(crate) fn syzygy_config(&self) -> SyzygyConfig {
        SyzygyConfig {
            path: if self.syzygy_path.is_empty() {
                None
            } else {
                Some(PathBuf::from(&self.syzygy_path))
            },
            probe_depth: self.syzygy_probe_depth,
            probe_limit: self.syzygy_probe_limit,
            fifty_move_rule: self.syzygy_fifty_move_rule,
        }
    }
}

fn print_spin(name: &str, default: impl std::fmt::Display, min: impl std::fmt::Display, max: impl std::fmt::Display) {
    println!("option name {name} type spin default {default} min {min} max {max}");
}

fn print_check(name: &str, default: bool) {
    println!(
        "option name {name} type check default {}",
        if default { "true" } else { "false" }
    );
}

fn print_string(name: &str, default: &str) {
    let shown = if default.is_empty() { "<empty>" } else { default };
    println!("option name {name} type string default {shown}");
}

/// Respond to `uci`: identity plus the full option table.
pub(crate) fn print_identity() {
    let defaults = EngineOptions::default();

    println!("id name Sirocco {}", env!("CARGO_PKG_VERSION"));
    println!("id author the Sirocco developers");

    print_spin("Hash", defaults.hash_mb, 1, MAX_HASH_MB);
    print_spin("Threads", defaults.threads, 1, MAX_THREADS);
    print_spin("MultiPV", defaults.multipv, 1, MAX_MULTIPV);
    print_check("Ponder", defaults.ponder);
    print_spin("MoveOverhead", defaults.move_overhead_ms, 0, MAX_MOVE_OVERHEAD_MS);
    print_string("SyzygyPath", &defaults.syzygy_path);
    print_spin("SyzygyProbeDepth", defaults.syzygy_probe_depth, 1, 100);
    print_check("Syzygy50MoveRule", defaults.syzygy_fifty_move_rule);
    print_spin("SyzygyProbeLimit", defaults.syzygy_probe_limit, 0, 7);
    print_string("EvalFile", &defaults.eval_file);
    print_check("UseNNUE", defaults.use_nnue);
    print_check("UCI_Chess960", false);
    println!("option name Clear Hash type button");

    println!("uciok");
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on")
}
