//! Formatting of `info` lines from search reports.

use crate::search::SearchReport;

/// Render one iteration report as a UCI `info` line.
#[must_use]
pub fn format_info(report: &SearchReport) -> String {
    let mut line = format!(
        "info depth {} seldepth {} multipv {}",
        report.depth, report.seldepth, report.multipv
    );

    match report.mate_in {
        Some(mate) => line.push_str(&format!(" score mate {mate}")),
        None => line.push_str(&format!(" score cp {}", report.score_cp)),
    }

    line.push_str(&format!(
        " nodes {} nps {} hashfull {} tbhits {} time {}",
        report.nodes, report.nps, report.hashfull, report.tbhits, report.time_ms
    ));

    if !report.pv.is_empty() {
        line.push_str(" pv");
        for mv in &report.pv {
            line.push_str(&format!(" {mv}"));
        }
    }

    line
}
