//! Time allocation.
//!
//! `compute_allocation` is a pure function from the clock state to an
//! (optimal, maximum) think-time pair. The search treats `optimal_ms` as
//! the point after which no new iteration starts and `maximum_ms` as a
//! hard deadline polled inside the tree.

/// Limits parsed from a `go` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchLimits {
    pub wtime_ms: Option<u64>,
    pub btime_ms: Option<u64>,
    pub winc_ms: u64,
    pub binc_ms: u64,
    pub movestogo: Option<u64>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub movetime_ms: Option<u64>,
    pub infinite: bool,
    pub ponder: bool,
}

impl SearchLimits {
    /// No clock at all: search until stopped or depth/node limited.
    #[must_use]
    pub fn is_untimed(&self) -> bool {
        self.infinite
            || self.ponder
            || (self.movetime_ms.is_none() && self.wtime_ms.is_none() && self.btime_ms.is_none())
    }
}

/// Tunable allocation policy.
#[derive(Debug, Clone, Copy)]
pub struct TimeConfig {
    /// Expected total full moves in a game, for moves-to-go estimation.
    pub expected_full_moves: u32,
    pub min_moves_to_go: u32,
    pub max_moves_to_go: u32,
    /// Fraction of the increment folded into the optimal budget, percent.
    pub increment_reserve_percent: u64,
    /// Below this much clock the allocator goes into panic mode.
    pub panic_threshold_ms: u64,
    /// Above this much clock a spending bonus applies.
    pub healthy_threshold_ms: u64,
    pub healthy_bonus_percent: u64,
    /// `maximum = min(time_left, max(optimal, stretch * base))`, percent.
    pub stretch_percent: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        TimeConfig {
            expected_full_moves: 50,
            min_moves_to_go: 12,
            max_moves_to_go: 40,
            increment_reserve_percent: 75,
            panic_threshold_ms: 3000,
            healthy_threshold_ms: 60_000,
            healthy_bonus_percent: 30,
            stretch_percent: 400,
        }
    }
}

/// The allocator's verdict for one move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAllocation {
    pub optimal_ms: u64,
    pub maximum_ms: u64,
    pub moves_to_go: u32,
    pub panic_mode: bool,
}

/// Compute the think-time budget for the side to move.
#[must_use]
pub fn compute_allocation(
    limits: &SearchLimits,
    white_to_move: bool,
    move_overhead_ms: u64,
    fullmove_number: u16,
    config: &TimeConfig,
) -> TimeAllocation {
    // Fixed time per move bypasses the allocator proper
    if let Some(movetime) = limits.movetime_ms {
        let optimal = movetime.saturating_sub(move_overhead_ms).max(1);
        return TimeAllocation {
            optimal_ms: optimal,
            maximum_ms: movetime.max(1),
            moves_to_go: 1,
            panic_mode: false,
        };
    }

    let clock = if white_to_move {
        limits.wtime_ms
    } else {
        limits.btime_ms
    };
    let increment = if white_to_move {
        limits.winc_ms
    } else {
        limits.binc_ms
    };

    let Some(clock_ms) = clock else {
        // No clock given: effectively unlimited
        return TimeAllocation {
            optimal_ms: u64::MAX,
            maximum_ms: u64::MAX,
            moves_to_go: 1,
            panic_mode: false,
        };
    };

    let time_left = clock_ms.saturating_sub(move_overhead_ms).max(1);

    let moves_to_go = match limits.movestogo {
        Some(mtg) => (mtg.max(1) as u32).min(config.max_moves_to_go),
        None => {
            let expected_remaining = config
                .expected_full_moves
                .saturating_sub(u32::from(fullmove_number))
                .saturating_add(1);
            expected_remaining.clamp(config.min_moves_to_go, config.max_moves_to_go)
        }
    };

    let base = (time_left / u64::from(moves_to_go)).max(1);
    let panic_mode = time_left <= config.panic_threshold_ms;

    let reserved_increment = increment * config.increment_reserve_percent / 100;
    let healthy_bonus = if !panic_mode && time_left > config.healthy_threshold_ms {
        base * config.healthy_bonus_percent / 100
    } else {
        0
    };

    let mut optimal = base + reserved_increment + healthy_bonus;
    if panic_mode {
        // Never commit more than a sliver when the flag is near
        optimal = optimal.min(time_left / 8).max(1);
    }
    optimal = optimal.min(time_left);

    let stretch = base.saturating_mul(config.stretch_percent) / 100;
    let maximum = optimal.max(stretch).min(time_left);

    TimeAllocation {
        optimal_ms: optimal,
        maximum_ms: maximum,
        moves_to_go,
        panic_mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits_with_clock(wtime: u64, winc: u64) -> SearchLimits {
        SearchLimits {
            wtime_ms: Some(wtime),
            winc_ms: winc,
            ..SearchLimits::default()
        }
    }

    #[test]
    fn test_movetime_is_used_directly() {
        let limits = SearchLimits {
            movetime_ms: Some(5000),
            ..SearchLimits::default()
        };
        let alloc = compute_allocation(&limits, true, 50, 1, &TimeConfig::default());
        assert_eq!(alloc.optimal_ms, 4950);
        assert_eq!(alloc.maximum_ms, 5000);
        assert!(!alloc.panic_mode);
    }

    #[test]
    fn test_movetime_smaller_than_overhead() {
        let limits = SearchLimits {
            movetime_ms: Some(20),
            ..SearchLimits::default()
        };
        let alloc = compute_allocation(&limits, true, 50, 1, &TimeConfig::default());
        assert_eq!(alloc.optimal_ms, 1);
        assert_eq!(alloc.maximum_ms, 20);
    }

    #[test]
    fn test_no_clock_is_unlimited() {
        let limits = SearchLimits::default();
        let alloc = compute_allocation(&limits, true, 50, 1, &TimeConfig::default());
        assert_eq!(alloc.optimal_ms, u64::MAX);
        assert_eq!(alloc.maximum_ms, u64::MAX);
    }

    #[test]
    fn test_movestogo_divides_clock() {
        let mut limits = limits_with_clock(60_000, 0);
        limits.movestogo = Some(20);
        let alloc = compute_allocation(&limits, true, 0, 1, &TimeConfig::default());
        assert_eq!(alloc.moves_to_go, 20);
        assert_eq!(alloc.optimal_ms, 3000);
        assert!(alloc.maximum_ms >= alloc.optimal_ms);
        assert!(alloc.maximum_ms <= 60_000);
    }

    #[test]
    fn test_moves_to_go_estimate_is_clamped() {
        let limits = limits_with_clock(120_000, 0);
        let config = TimeConfig::default();

        // Early game: near the max clamp
        let early = compute_allocation(&limits, true, 0, 1, &config);
        assert_eq!(early.moves_to_go, config.max_moves_to_go);

        // Late game: clamped to the minimum
        let late = compute_allocation(&limits, true, 0, 200, &config);
        assert_eq!(late.moves_to_go, config.min_moves_to_go);
    }

    #[test]
    fn test_increment_reserved_fraction() {
        let limits = limits_with_clock(30_000, 2000);
        let alloc = compute_allocation(&limits, true, 0, 30, &TimeConfig::default());
        let base = 30_000 / u64::from(alloc.moves_to_go);
        assert_eq!(alloc.optimal_ms, base + 1500);
    }

    #[test]
    fn test_healthy_bonus_applies_above_threshold() {
        let config = TimeConfig::default();
        let rich = compute_allocation(
            &limits_with_clock(120_000, 0),
            true,
            0,
            30,
            &config,
        );
        let poor = compute_allocation(&limits_with_clock(30_000, 0), true, 0, 30, &config);

        let rich_base = 120_000 / u64::from(rich.moves_to_go);
        let poor_base = 30_000 / u64::from(poor.moves_to_go);
        assert_eq!(rich.optimal_ms, rich_base + rich_base * 30 / 100);
        assert_eq!(poor.optimal_ms, poor_base);
    }

    #[test]
    fn test_panic_mode_spends_a_sliver() {
        let alloc = compute_allocation(
            &limits_with_clock(2000, 0),
            true,
            0,
            40,
            &TimeConfig::default(),
        );
        assert!(alloc.panic_mode);
        assert!(alloc.optimal_ms <= 2000 / 8);
        assert!(alloc.optimal_ms >= 1);
        assert!(alloc.maximum_ms <= 2000);
    }

    #[test]
    fn test_maximum_never_exceeds_clock() {
        for clock in [10u64, 100, 1000, 10_000, 100_000] {
            let alloc = compute_allocation(
                &limits_with_clock(clock, 500),
                true,
                10,
                20,
                &TimeConfig::default(),
            );
            assert!(alloc.maximum_ms <= clock);
            assert!(alloc.optimal_ms <= alloc.maximum_ms);
        }
    }

    #[test]
    fn test_black_uses_black_clock() {
        let limits = SearchLimits {
            wtime_ms: Some(100),
            btime_ms: Some(60_000),
            ..SearchLimits::default()
        };
        let white = compute_allocation(&limits, true, 0, 30, &TimeConfig::default());
        let black = compute_allocation(&limits, false, 0, 30, &TimeConfig::default());
        assert!(white.panic_mode);
        assert!(!black.panic_mode);
        assert!(black.optimal_ms > white.optimal_ms);
    }

    #[test]
    fn test_is_untimed() {
        assert!(SearchLimits::default().is_untimed());
        assert!(SearchLimits {
            infinite: true,
            wtime_ms: Some(1000),
            ..SearchLimits::default()
        }
        .is_untimed());
        assert!(!limits_with_clock(1000, 0).is_untimed());
    }
}
