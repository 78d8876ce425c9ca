//! The learner contract.
//!
//! The simulator treats the learner as an external collaborator: it asks for a
//! score per action and later hands back a labeled event for the action it
//! actually took. Anything that can do those two things can be evaluated.

use crate::{ContextFeatures, LearnerError};

/// One `(action, score)` entry of a learner's prediction.
///
/// Scores are non-negative and need not sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionScore {
    pub action: usize,
    pub score: f64,
}

impl ActionScore {
    pub fn new(action: usize, score: f64) -> Self {
        Self { action, score }
    }
}

/// Labeled feedback for the action that was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedbackEvent {
    /// Index of the sampled action.
    pub chosen_action: usize,
    /// Cost observed for that action (negative is desirable).
    pub cost: f64,
    /// Propensity to importance-weight the cost by; in `(0, 1]`.
    pub reported_propensity: f64,
}

/// A contextual-bandit learner under evaluation.
///
/// `predict` may update internal state but must have no other observable
/// effect. Errors from either method abort the run.
///
/// # Example
///
/// ```rust
/// use cbsim::{ActionScore, ContextFeatures, FeedbackEvent, Learner, LearnerError};
///
/// /// Always scores every action equally and ignores feedback.
/// struct Uniform;
///
/// impl Learner for Uniform {
///     fn predict(&mut self, ctx: &ContextFeatures) -> Result<Vec<ActionScore>, LearnerError> {
///         Ok(ctx.actions.iter().map(|a| ActionScore::new(a.action, 1.0)).collect())
///     }
///     fn learn(&mut self, _: &ContextFeatures, _: &FeedbackEvent) -> Result<(), LearnerError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Learner {
    /// Score every action for `context`.
    fn predict(&mut self, context: &ContextFeatures) -> Result<Vec<ActionScore>, LearnerError>;

    /// Update from the feedback observed for `context`.
    fn learn(&mut self, context: &ContextFeatures, event: &FeedbackEvent)
        -> Result<(), LearnerError>;
}

impl<L: Learner + ?Sized> Learner for &mut L {
    fn predict(&mut self, context: &ContextFeatures) -> Result<Vec<ActionScore>, LearnerError> {
        (**self).predict(context)
    }

    fn learn(
        &mut self,
        context: &ContextFeatures,
        event: &FeedbackEvent,
    ) -> Result<(), LearnerError> {
        (**self).learn(context, event)
    }
}

impl<L: Learner + ?Sized> Learner for Box<L> {
    fn predict(&mut self, context: &ContextFeatures) -> Result<Vec<ActionScore>, LearnerError> {
        (**self).predict(context)
    }

    fn learn(
        &mut self,
        context: &ContextFeatures,
        event: &FeedbackEvent,
    ) -> Result<(), LearnerError> {
        (**self).learn(context, event)
    }
}
