//! Error taxonomy for the simulator.
//!
//! Every error is fatal for a run: nothing is retried and there is no
//! partial-run checkpointing. Library code returns these; the binary prints
//! the diagnostic and exits non-zero.

use thiserror::Error;

/// Failure reported by a [`Learner`](crate::Learner) implementation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LearnerError {
    /// The learner configuration string could not be understood.
    #[error("invalid learner configuration `{config}`: {detail}")]
    Config { config: String, detail: String },
    /// The learner was handed a context or label it cannot use.
    #[error("learner rejected input: {detail}")]
    Rejected { detail: String },
}

/// Errors surfaced by configuration, the decision engine, or the runner.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A construction argument is out of its documented domain.
    #[error("invalid parameter `{name}`: {detail}")]
    InvalidParameter { name: &'static str, detail: String },

    /// The propensity-strategy id is not one of the recognized ids.
    #[error("unknown propensity strategy id {0} (expected one of 0, 1, 2, 6, 7, 13, 14)")]
    UnknownStrategy(i64),

    /// The learner's scores do not sum to a positive, finite total.
    #[error("degenerate score distribution: total score {total}")]
    DegenerateDistribution { total: f64 },

    /// The learner returned an action index outside `[0, num_actions)`.
    #[error("action index {action} out of range for {num_actions} actions")]
    ActionOutOfRange { action: usize, num_actions: usize },

    /// The learner's score list breaks the one-entry-per-action invariant.
    #[error("malformed score list: {detail}")]
    MalformedScores { detail: String },

    /// Opaque failure from the external learner.
    #[error("learner failure: {0}")]
    LearnerFailure(#[from] LearnerError),
}

impl SimError {
    pub(crate) fn invalid(name: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            detail: detail.into(),
        }
    }
}
