//! Tokenized command parsing for the UCI loop.

use crate::time::SearchLimits;

/// Parse the argument tokens of a `go` command.
#[must_use]
pub fn parse_go(parts: &[&str]) -> SearchLimits {
    let mut limits = SearchLimits::default();
    let mut i = 0;

    while i < parts.len() {
        match parts[i] {
            "depth" => {
                if let Some(v) = parts.get(i + 1).and_then(|v| v.parse().ok()) {
                    limits.depth = Some(v);
                    i += 1;
                }
            }
            "nodes" => {
                if let Some(v) = parts.get(i + 1).and_then(|v| v.parse().ok()) {
                    limits.nodes = Some(v);
                    i += 1;
                }
            }
            "movetime" => {
                if let Some(v) = parts.get(i + 1).and_then(|v| v.parse().ok()) {
                    limits.movetime_ms = Some(v);
                    i += 1;
                }
            }
            "wtime" => {
                if let Some(v) = parts.get(i + 1).and_then(|v| v.parse().ok()) {
                    limits.wtime_ms = Some(v);
                    i += 1;
                }
            }
            "btime" => {
                if let Some(v) = parts.get(i + 1).and_then(|v| v.parse().ok()) {
                    limits.btime_ms = Some(v);
                    i += 1;
                }
            }
            "winc" => {
                if let Some(v) = parts.get(i + 1).and_then(|v| v.parse().ok()) {
                    limits.winc_ms = v;
                    i += 1;
                }
            }
            "binc" => {
                if let Some(v) = parts.get(i + 1).and_then(|v| v.parse().ok()) {
                    limits.binc_ms = v;
                    i += 1;
                }
            }
            "movestogo" => {
                if let Some(v) = parts.get(i + 1).and_then(|v| v.parse().ok()) {
                    limits.movestogo = Some(v);
                    i += 1;
                }
            }
            "infinite" => limits.infinite = true,
            "ponder" => limits.ponder = true,
            _ => {}
        }
        i += 1;
    }

    limits
}

/// Split a `setoption` line into its name and optional value, both of
/// which may span several tokens.
#[must_use]
pub fn parse_setoption(parts: &[&str]) -> Option<(String, Option<String>)> {
    let mut name_parts: Vec<&str> = Vec::new();
    let mut value_parts: Vec<&str> = Vec::new();
    let mut mode = "";

    for part in parts {
        match *part {
            "name" => mode = "name",
            "value" => mode = "value",
            _ => match mode {
                "name" => name_parts.push(part),
                "value" => value_parts.push(part),
                _ => {}
            },
        }
    }

    if name_parts.is_empty() {
        return None;
    }

    let name = name_parts.join(" ");
    let value = if value_parts.is_empty() {
        None
    } else {
        Some(value_parts.join(" "))
    };

    Some((name, value))
}
