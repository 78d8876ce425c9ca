//! Running counters and periodic report snapshots.

/// Cumulative performance counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsAccumulator {
    clicks: u64,
    good_actions: u64,
    good_actions_since_last: u64,
    last_emitted: Option<u64>,
}

/// Point-in-time view emitted at report cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// 1-based iteration the snapshot was taken at.
    pub iteration: u64,
    /// `clicks / iteration`.
    pub click_rate: f64,
    pub clicks: u64,
    pub good_actions: u64,
    /// Good actions since the previous snapshot.
    pub good_actions_since_last: u64,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one step's outcome.
    pub fn record(&mut self, is_good_action: bool, got_click: bool) {
        if got_click {
            self.clicks = self.clicks.saturating_add(1);
        }
        if is_good_action {
            self.good_actions = self.good_actions.saturating_add(1);
            self.good_actions_since_last = self.good_actions_since_last.saturating_add(1);
        }
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    pub fn good_actions(&self) -> u64 {
        self.good_actions
    }

    pub fn good_actions_since_last(&self) -> u64 {
        self.good_actions_since_last
    }

    /// Whether a row is due at `iteration` (1-based).
    pub fn is_due(iteration: u64, report_interval: u64, total_iterations: u64) -> bool {
        (report_interval > 0 && iteration % report_interval == 0) || iteration == total_iterations
    }

    /// Snapshot the counters at `iteration` and reset the since-last counter.
    ///
    /// Returns `None` (and leaves the counters untouched) if a snapshot was
    /// already taken at this iteration, or if `iteration` is 0 or past
    /// `total_iterations`.
    pub fn emit(&mut self, iteration: u64, total_iterations: u64) -> Option<MetricsSnapshot> {
        if iteration == 0 || iteration > total_iterations || self.last_emitted == Some(iteration) {
            return None;
        }
        let snap = MetricsSnapshot {
            iteration,
            click_rate: self.clicks as f64 / iteration as f64,
            clicks: self.clicks,
            good_actions: self.good_actions,
            good_actions_since_last: self.good_actions_since_last,
        };
        self.good_actions_since_last = 0;
        self.last_emitted = Some(iteration);
        Some(snap)
    }
}
