//! Tunable search parameters.

/// Margins and depth gates for the pruning and reduction heuristics.
/// Exposed through UCI spin options for tuning runs.
#[derive(Clone, Debug)]
pub struct SearchParams {
    pub rfp_max_depth: u32,
    pub rfp_margin: i32,
    pub razor_max_depth: u32,
    pub razor_margin: i32,
    pub null_min_depth: u32,
    pub null_base_reduction: u32,
    pub null_depth_divisor: u32,
    pub probcut_min_depth: u32,
    pub probcut_margin: i32,
    pub probcut_reduction: u32,
    pub iid_min_depth: u32,
    pub iid_reduction: u32,
    pub futility_max_depth: u32,
    pub futility_margin: i32,
    pub lmp_max_depth: u32,
    pub lmp_base: usize,
    pub singular_min_depth: u32,
    pub singular_margin: i32,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            rfp_max_depth: 7,
            rfp_margin: 90,
            razor_max_depth: 3,
            razor_margin: 280,
            null_min_depth: 3,
            null_base_reduction: 2,
            null_depth_divisor: 4,
            probcut_min_depth: 6,
            probcut_margin: 180,
            probcut_reduction: 4,
            iid_min_depth: 6,
            iid_reduction: 2,
            futility_max_depth: 3,
            futility_margin: 120,
            lmp_max_depth: 4,
            lmp_base: 4,
            singular_min_depth: 7,
            singular_margin: 3,
        }
    }
}

impl SearchParams {
    /// Quiet-move limit for late move pruning at `depth`.
    #[must_use]
    pub fn lmp_limit(&self, depth: u32) -> usize {
        self.lmp_base + (depth as usize) * (depth as usize)
    }
}
