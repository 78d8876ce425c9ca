//! Run configuration.

use crate::context::validate_bounds;
use crate::{PropensityStrategy, SimError};

/// Full configuration for a simulation run.
///
/// Start with [`SimulationConfig::default()`] and override fields directly.
/// Nothing is checked until [`SimulationConfig::validate`] (called by
/// [`SimulationRunner::new`](crate::SimulationRunner::new)), so an invalid
/// configuration never reaches the first iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationConfig {
    /// Learner configuration string, echoed verbatim into every report row.
    pub learner_args: String,
    /// Number of actions per context (>= 1).
    pub num_actions: usize,
    /// Number of distinct contexts (>= 1, <= `num_actions`).
    pub num_contexts: usize,
    /// Click probability of every non-best action.
    pub min_p: f64,
    /// Click probability of the best action.
    pub max_p: f64,
    /// Cost when the click trial fails.
    pub no_click_cost: f64,
    /// Cost when the click trial succeeds (typically negative).
    pub click_cost: f64,
    /// Propensity-strategy id; see [`PropensityStrategy::from_id`].
    pub p_strategy: i64,
    /// Number of iterations (>= 1).
    pub total_iterations: u64,
    /// Emit a report row every this many iterations (>= 1).
    pub report_interval: u64,
    /// Seed for the single random source driving the whole run.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            learner_args: String::new(),
            num_actions: 10,
            num_contexts: 10,
            min_p: 0.03,
            max_p: 0.04,
            no_click_cost: 0.0,
            click_cost: -1.0,
            p_strategy: 0,
            total_iterations: 1_000,
            report_interval: 100,
            seed: 0,
        }
    }
}

impl SimulationConfig {
    /// Resolve the configured propensity strategy.
    pub fn strategy(&self) -> Result<PropensityStrategy, SimError> {
        PropensityStrategy::from_id(self.p_strategy)
    }

    /// Check every field; returns the resolved propensity strategy.
    pub fn validate(&self) -> Result<PropensityStrategy, SimError> {
        if self.num_actions == 0 {
            return Err(SimError::invalid("num_actions", "must be >= 1"));
        }
        if self.num_contexts == 0 {
            return Err(SimError::invalid("num_contexts", "must be >= 1"));
        }
        if self.num_contexts > self.num_actions {
            return Err(SimError::invalid(
                "num_contexts",
                format!(
                    "{} contexts need at least as many actions, got {}",
                    self.num_contexts, self.num_actions
                ),
            ));
        }
        validate_bounds(self.min_p, self.max_p)?;
        if !self.no_click_cost.is_finite() {
            return Err(SimError::invalid("no_click_cost", "must be finite"));
        }
        if !self.click_cost.is_finite() {
            return Err(SimError::invalid("click_cost", "must be finite"));
        }
        if self.total_iterations == 0 {
            return Err(SimError::invalid("total_iterations", "must be >= 1"));
        }
        if self.report_interval == 0 {
            return Err(SimError::invalid("report_interval", "must be >= 1"));
        }
        self.strategy()
    }
}
