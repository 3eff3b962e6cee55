//! Syzygy tablebase interface.
//!
//! The search sees tablebases only through `probe_wdl`/`probe_root`; file
//! decoding is delegated to an external prober. The shipped implementation
//! validates the configured directory and applies the piece-count and
//! 50-move-rule gates, and answers `None` whenever no prober can serve the
//! position, which the search treats as "tablebases unavailable" rather
//! than an error.

use std::path::{Path, PathBuf};

use crate::board::{Board, Move};

/// Five-valued game-theoretic verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wdl {
    Loss,
    BlessedLoss,
    Draw,
    CursedWin,
    Win,
}

impl Wdl {
    /// Collapse cursed wins and blessed losses to draws, per the 50-move
    /// rule option.
    #[must_use]
    pub fn with_fifty_move_rule(self) -> Wdl {
        match self {
            Wdl::BlessedLoss | Wdl::CursedWin => Wdl::Draw,
            other => other,
        }
    }
}

/// Result of an interior-node probe.
#[derive(Clone, Copy, Debug)]
pub struct WdlProbe {
    pub wdl: Wdl,
    pub dtz: i32,
}

/// Result of a root probe, carrying the tablebase-best move.
#[derive(Clone, Copy, Debug)]
pub struct RootProbe {
    pub wdl: Wdl,
    pub dtz: i32,
    pub best_move: Move,
}

/// Tablebase configuration from the UCI options.
#[derive(Clone, Debug)]
pub struct SyzygyConfig {
    pub path: Option<PathBuf>,
    /// Minimum search depth before interior probes fire.
    pub probe_depth: u32,
    /// Maximum piece count to probe (0 disables probing).
    pub probe_limit: u32,
    pub fifty_move_rule: bool,
}

impl Default for SyzygyConfig {
    fn default() -> Self {
        SyzygyConfig {
            path: None,
            probe_depth: 1,
            probe_limit: 0,
            fifty_move_rule: true,
        }
    }
}

/// Tablebase access point handed to the search.
pub struct Tablebases {
    config: SyzygyConfig,
    available: bool,
}

impl Tablebases {
    /// Build from configuration. Availability requires an existing
    /// directory containing `.rtbw` files.
    #[must_use]
    pub fn new(config: SyzygyConfig) -> Self {
        let available = config
            .path
            .as_deref()
            .is_some_and(|p| directory_has_tables(p));
        Tablebases { config, available }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Tablebases::new(SyzygyConfig::default())
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available && self.config.probe_limit > 0
    }

    #[must_use]
    pub fn config(&self) -> &SyzygyConfig {
        &self.config
    }

    /// Should the search probe at this node at all?
    #[must_use]
    pub fn should_probe(&self, board: &Board, depth: u32) -> bool {
        self.is_available()
            && depth >= self.config.probe_depth
            && board.piece_count() <= self.config.probe_limit
            && board.castling_rights == 0
    }

    /// WDL/DTZ verdict for an interior node. `None` means no table can
    /// serve this position.
    #[must_use]
    pub fn probe_wdl(&self, board: &Board) -> Option<WdlProbe> {
        if !self.is_available() || board.piece_count() > self.config.probe_limit {
            return None;
        }
        self.decode_probe(board).map(|mut probe| {
            if self.config.fifty_move_rule {
                probe.wdl = probe.wdl.with_fifty_move_rule();
            }
            probe
        })
    }

    /// Verdict plus best move for the root position.
    #[must_use]
    pub fn probe_root(&self, board: &Board) -> Option<RootProbe> {
        let probe = self.probe_wdl(board)?;
        let best_move = self.decode_root_move(board)?;
        Some(RootProbe {
            wdl: probe.wdl,
            dtz: probe.dtz,
            best_move,
        })
    }

    fn decode_probe(&self, _board: &Board) -> Option<WdlProbe> {
        // Table file decoding lives in the external prober.
        None
    }

    fn decode_root_move(&self, _board: &Board) -> Option<Move> {
        // DTZ-ranked root move selection lives in the external prober.
        None
    }
}

fn directory_has_tables(path: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(path) else {
        return false;
    };
    entries.filter_map(Result::ok).any(|entry| {
        entry
            .path()
            .extension()
            .is_some_and(|ext| ext == "rtbw" || ext == "rtbz")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_probes_return_none() {
        let tb = Tablebases::disabled();
        let board = Board::from_fen("8/8/8/8/8/8/4k3/4K3 w - - 0 1");
        assert!(!tb.is_available());
        assert!(tb.probe_wdl(&board).is_none());
        assert!(tb.probe_root(&board).is_none());
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let config = SyzygyConfig {
            path: Some(PathBuf::from("/nonexistent/syzygy")),
            probe_limit: 6,
            ..SyzygyConfig::default()
        };
        let tb = Tablebases::new(config);
        assert!(!tb.is_available());
    }

    #[test]
    fn test_piece_count_gate() {
        let dir = std::env::temp_dir().join(format!("sirocco_tb_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("KQvK.rtbw"), b"stub").unwrap();

        let config = SyzygyConfig {
            path: Some(dir.clone()),
            probe_limit: 5,
            probe_depth: 1,
            fifty_move_rule: true,
        };
        let tb = Tablebases::new(config);
        assert!(tb.is_available());

        let few = Board::from_fen("8/8/8/8/8/8/4k3/4K1Q1 w - - 0 1");
        let many = Board::new();
        assert!(tb.should_probe(&few, 1));
        assert!(!tb.should_probe(&many, 1));
        assert!(!tb.should_probe(&few, 0));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_fifty_move_rule_mapping() {
        assert_eq!(Wdl::CursedWin.with_fifty_move_rule(), Wdl::Draw);
        assert_eq!(Wdl::BlessedLoss.with_fifty_move_rule(), Wdl::Draw);
        assert_eq!(Wdl::Win.with_fifty_move_rule(), Wdl::Win);
        assert_eq!(Wdl::Loss.with_fifty_move_rule(), Wdl::Loss);
    }
}
