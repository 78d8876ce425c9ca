//! Synthetic decision contexts with known ground truth.
//!
//! Each context has one uniquely best action (the action whose index equals the
//! context id). That action clicks with probability `max_p`; every other action
//! clicks with probability `min_p`.

use crate::SimError;

/// One synthetic decision scenario.
///
/// Immutable after construction. `true_pdf[id] == max_p` and every other entry
/// is `min_p`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticContext {
    id: usize,
    true_pdf: Vec<f64>,
}

impl SyntheticContext {
    /// Build the context for `id` over `num_actions` actions.
    ///
    /// Fails with [`SimError::InvalidParameter`] unless
    /// `0 <= min_p <= max_p <= 1` (both finite), `num_actions >= 1`, and
    /// `id < num_actions`.
    pub fn new(num_actions: usize, id: usize, min_p: f64, max_p: f64) -> Result<Self, SimError> {
        validate_bounds(min_p, max_p)?;
        if num_actions == 0 {
            return Err(SimError::invalid("num_actions", "must be >= 1"));
        }
        if id >= num_actions {
            return Err(SimError::invalid(
                "id",
                format!("context id {id} has no matching action among {num_actions}"),
            ));
        }
        let mut true_pdf = vec![min_p; num_actions];
        true_pdf[id] = max_p;
        Ok(Self { id, true_pdf })
    }

    /// Context id; also the index of the best action.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn num_actions(&self) -> usize {
        self.true_pdf.len()
    }

    /// Per-action click probabilities.
    pub fn true_pdf(&self) -> &[f64] {
        &self.true_pdf
    }

    /// Click probability of `action`, or `None` if out of range.
    pub fn click_probability(&self, action: usize) -> Option<f64> {
        self.true_pdf.get(action).copied()
    }

    /// Whether `action` is this context's designated best action.
    pub fn is_best(&self, action: usize) -> bool {
        action == self.id
    }

    /// Build the learner-facing representation of this context.
    pub fn features(&self) -> ContextFeatures {
        let k = self.num_actions();
        let actions = (0..k)
            .map(|a| ActionFeatures {
                action: a,
                cross: k * self.id + a,
            })
            .collect();
        ContextFeatures {
            shared: self.id,
            actions,
        }
    }
}

pub(crate) fn validate_bounds(min_p: f64, max_p: f64) -> Result<(), SimError> {
    if !min_p.is_finite() || !max_p.is_finite() {
        return Err(SimError::invalid(
            "min_p/max_p",
            format!("probabilities must be finite (min_p={min_p}, max_p={max_p})"),
        ));
    }
    if min_p < 0.0 {
        return Err(SimError::invalid("min_p", format!("{min_p} < 0")));
    }
    if max_p > 1.0 {
        return Err(SimError::invalid("max_p", format!("{max_p} > 1")));
    }
    if min_p > max_p {
        return Err(SimError::invalid(
            "min_p",
            format!("min_p ({min_p}) exceeds max_p ({max_p})"),
        ));
    }
    Ok(())
}

/// Per-action features handed to a learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionFeatures {
    /// Action index.
    pub action: usize,
    /// Context x action cross: `num_actions * context_id + action`.
    pub cross: usize,
}

/// Learner-facing representation of a [`SyntheticContext`].
///
/// Built once per context at startup and passed unchanged to both
/// `predict` and `learn`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContextFeatures {
    /// Shared (context-level) feature: the context id.
    pub shared: usize,
    /// One entry per action, in action-index order.
    pub actions: Vec<ActionFeatures>,
}

impl ContextFeatures {
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }
}
