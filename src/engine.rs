//! One simulation step: query, sample, click, label, learn.
//!
//! Draw order is part of the reproducibility contract. Each [`DecisionEngine::step`]
//! consumes exactly two uniform draws from the caller's RNG: first the action
//! draw, then the click draw.

use rand::Rng;

use crate::{
    ActionScore, ContextFeatures, FeedbackEvent, Learner, PropensityStrategy, SimError,
    SyntheticContext,
};

/// What happened in one step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepOutcome {
    /// The label that was sent to the learner.
    pub event: FeedbackEvent,
    /// Whether the sampled action is the context's best action.
    pub good_action: bool,
    /// Whether the click trial succeeded.
    pub clicked: bool,
    /// The learner's normalized probability for the chosen action, before
    /// the propensity strategy was applied.
    pub raw_propensity: f64,
}

/// Validate a learner's score list against `num_actions` and return its total.
///
/// The list must name every action in `[0, num_actions)` exactly once with a
/// finite, non-negative score, and the scores must sum to a positive total.
pub fn score_total(scores: &[ActionScore], num_actions: usize) -> Result<f64, SimError> {
    let mut seen = vec![false; num_actions];
    let mut total = 0.0;
    for s in scores {
        let Some(slot) = seen.get_mut(s.action) else {
            return Err(SimError::ActionOutOfRange {
                action: s.action,
                num_actions,
            });
        };
        if *slot {
            return Err(SimError::MalformedScores {
                detail: format!("action {} listed more than once", s.action),
            });
        }
        *slot = true;
        if !(s.score.is_finite() && s.score >= 0.0) {
            return Err(SimError::MalformedScores {
                detail: format!("action {} has score {}", s.action, s.score),
            });
        }
        total += s.score;
    }
    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(SimError::MalformedScores {
            detail: format!("no score for action {missing}"),
        });
    }
    if !(total.is_finite() && total > 0.0) {
        return Err(SimError::DegenerateDistribution { total });
    }
    Ok(total)
}

/// Weighted sampling over an unnormalized categorical distribution.
///
/// Walks `scores` in order and returns the first entry whose cumulative score
/// exceeds `u * total`, so equal scores resolve toward the earlier entry. If
/// rounding leaves the walk short of the target, the last entry with a
/// positive score is returned.
///
/// Callers must pass a list validated by [`score_total`].
pub fn sample_action(scores: &[ActionScore], total: f64, u: f64) -> ActionScore {
    let target = u * total;
    let mut cum = 0.0;
    for s in scores {
        cum += s.score;
        if cum > target {
            return *s;
        }
    }
    // Numerical fallback.
    scores
        .iter()
        .rev()
        .find(|s| s.score > 0.0)
        .or_else(|| scores.last())
        .copied()
        .unwrap_or(ActionScore::new(0, 0.0))
}

/// Per-step decision protocol, parameterized by the run's costs and
/// propensity strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionEngine {
    strategy: PropensityStrategy,
    no_click_cost: f64,
    click_cost: f64,
}

impl DecisionEngine {
    pub fn new(strategy: PropensityStrategy, no_click_cost: f64, click_cost: f64) -> Self {
        Self {
            strategy,
            no_click_cost,
            click_cost,
        }
    }

    pub fn strategy(&self) -> PropensityStrategy {
        self.strategy
    }

    /// Run one step against `learner`, drawing the action and click uniforms
    /// from `rng` (in that order).
    pub fn step<L, R>(
        &self,
        context: &SyntheticContext,
        features: &ContextFeatures,
        learner: &mut L,
        rng: &mut R,
    ) -> Result<StepOutcome, SimError>
    where
        L: Learner + ?Sized,
        R: Rng,
    {
        let scores = learner.predict(features)?;
        let total = score_total(&scores, context.num_actions())?;
        let u: f64 = rng.random();
        let v: f64 = rng.random();
        let outcome = self.resolve(context, &scores, total, u, v)?;
        learner.learn(features, &outcome.event)?;
        tracing::trace!(
            context = context.id(),
            action = outcome.event.chosen_action,
            clicked = outcome.clicked,
            propensity = outcome.event.reported_propensity,
            "step"
        );
        Ok(outcome)
    }

    /// Resolve a step from validated scores and the two uniform draws.
    ///
    /// `u` selects the action; `v` decides the click. No learner call and no
    /// randomness happens here.
    pub fn resolve(
        &self,
        context: &SyntheticContext,
        scores: &[ActionScore],
        total: f64,
        u: f64,
        v: f64,
    ) -> Result<StepOutcome, SimError> {
        let num_actions = context.num_actions();
        let chosen = sample_action(scores, total, u);
        let Some(click_p) = context.click_probability(chosen.action) else {
            return Err(SimError::ActionOutOfRange {
                action: chosen.action,
                num_actions,
            });
        };

        let clicked = v < click_p;
        let cost = if clicked {
            self.click_cost
        } else {
            self.no_click_cost
        };

        let raw_propensity = chosen.score / total;
        let reported_propensity = self.strategy.report(raw_propensity, num_actions);

        Ok(StepOutcome {
            event: FeedbackEvent {
                chosen_action: chosen.action,
                cost,
                reported_propensity,
            },
            good_action: context.is_best(chosen.action),
            clicked,
            raw_propensity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LearnerError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flat(k: usize) -> Vec<ActionScore> {
        (0..k).map(|a| ActionScore::new(a, 1.0)).collect()
    }

    struct Scripted {
        scores: Vec<ActionScore>,
        learned: Vec<FeedbackEvent>,
    }

    impl Learner for Scripted {
        fn predict(&mut self, _: &ContextFeatures) -> Result<Vec<ActionScore>, LearnerError> {
            Ok(self.scores.clone())
        }
        fn learn(&mut self, _: &ContextFeatures, ev: &FeedbackEvent) -> Result<(), LearnerError> {
            self.learned.push(*ev);
            Ok(())
        }
    }

    #[test]
    fn flat_scores_with_half_draws_pick_second_action() {
        let ctx = SyntheticContext::new(3, 0, 0.03, 0.04).unwrap();
        assert_eq!(ctx.true_pdf(), &[0.04, 0.03, 0.03]);
        let engine = DecisionEngine::new(PropensityStrategy::Identity, 0.0, -1.0);
        let scores = flat(3);
        let total = score_total(&scores, 3).unwrap();

        let out = engine.resolve(&ctx, &scores, total, 0.5, 0.5).unwrap();
        assert_eq!(out.event.chosen_action, 1);
        assert!(!out.good_action);
        assert!(!out.clicked);
        assert_eq!(out.event.cost, 0.0);
        assert!((out.event.reported_propensity - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn click_uses_click_cost_and_strategy_applies() {
        let ctx = SyntheticContext::new(2, 1, 0.1, 0.9).unwrap();
        let engine = DecisionEngine::new(PropensityStrategy::ClipLowNinety, 0.0, -1.0);
        assert_eq!(engine.strategy(), PropensityStrategy::ClipLowNinety);
        let scores = vec![ActionScore::new(0, 1.0), ActionScore::new(1, 3.0)];
        let out = engine.resolve(&ctx, &scores, 4.0, 0.9, 0.5).unwrap();
        assert_eq!(out.event.chosen_action, 1);
        assert!(out.good_action);
        assert!(out.clicked);
        assert_eq!(out.event.cost, -1.0);
        assert_eq!(out.raw_propensity, 0.75);
        assert_eq!(out.event.reported_propensity, 0.9);
    }

    #[test]
    fn sampling_follows_list_order_not_action_index() {
        let scores = vec![
            ActionScore::new(2, 1.0),
            ActionScore::new(0, 1.0),
            ActionScore::new(1, 1.0),
        ];
        assert_eq!(sample_action(&scores, 3.0, 0.0).action, 2);
        assert_eq!(sample_action(&scores, 3.0, 0.5).action, 0);
        assert_eq!(sample_action(&scores, 3.0, 0.99).action, 1);
    }

    #[test]
    fn boundary_tie_goes_to_earlier_entry() {
        // target == 1.0 equals the first cumulative sum, which is not
        // strictly greater, so the second entry wins.
        let scores = flat(4);
        assert_eq!(sample_action(&scores, 4.0, 0.25).action, 1);
    }

    #[test]
    fn overshooting_draw_falls_back_to_last_positive_entry() {
        let scores = vec![
            ActionScore::new(0, 1.0),
            ActionScore::new(1, 1.0),
            ActionScore::new(2, 0.0),
        ];
        assert_eq!(sample_action(&scores, 2.0, 1.0).action, 1);
        assert_eq!(sample_action(&flat(4), 4.0, 1.0).action, 3);
    }

    #[test]
    fn zero_scores_are_degenerate() {
        let scores = vec![ActionScore::new(0, 0.0), ActionScore::new(1, 0.0)];
        assert_eq!(
            score_total(&scores, 2),
            Err(SimError::DegenerateDistribution { total: 0.0 })
        );
    }

    #[test]
    fn malformed_score_lists_are_rejected() {
        let out_of_range = vec![ActionScore::new(0, 1.0), ActionScore::new(5, 1.0)];
        assert!(matches!(
            score_total(&out_of_range, 2),
            Err(SimError::ActionOutOfRange { action: 5, num_actions: 2 })
        ));

        let dup = vec![ActionScore::new(0, 1.0), ActionScore::new(0, 1.0)];
        assert!(matches!(score_total(&dup, 2), Err(SimError::MalformedScores { .. })));

        let missing = vec![ActionScore::new(0, 1.0)];
        assert!(matches!(score_total(&missing, 2), Err(SimError::MalformedScores { .. })));

        let negative = vec![ActionScore::new(0, 1.0), ActionScore::new(1, -0.5)];
        assert!(matches!(score_total(&negative, 2), Err(SimError::MalformedScores { .. })));
    }

    #[test]
    fn step_sends_the_label_it_reports() {
        let ctx = SyntheticContext::new(3, 2, 0.0, 1.0).unwrap();
        let features = ctx.features();
        let engine = DecisionEngine::new(PropensityStrategy::Uniform, 0.0, -2.0);
        let mut learner = Scripted {
            scores: flat(3),
            learned: Vec::new(),
        };
        let mut rng = StdRng::seed_from_u64(7);
        let out = engine.step(&ctx, &features, &mut learner, &mut rng).unwrap();
        assert_eq!(learner.learned, vec![out.event]);
        assert!((out.event.reported_propensity - 1.0 / 3.0).abs() < 1e-12);
        // min_p = 0 and max_p = 1 make the click deterministic.
        assert_eq!(out.clicked, out.good_action);
    }

    #[test]
    fn step_consumes_exactly_two_draws() {
        let ctx = SyntheticContext::new(3, 0, 0.2, 0.6).unwrap();
        let features = ctx.features();
        let engine = DecisionEngine::new(PropensityStrategy::Identity, 0.0, -1.0);
        let mut learner = Scripted {
            scores: flat(3),
            learned: Vec::new(),
        };

        let mut a = StdRng::seed_from_u64(11);
        engine.step(&ctx, &features, &mut learner, &mut a).unwrap();

        let mut b = StdRng::seed_from_u64(11);
        let _: f64 = b.random();
        let _: f64 = b.random();

        assert_eq!(a.random::<u64>(), b.random::<u64>());
    }

    #[test]
    fn degenerate_learner_aborts_before_learning() {
        let ctx = SyntheticContext::new(2, 0, 0.2, 0.6).unwrap();
        let features = ctx.features();
        let engine = DecisionEngine::new(PropensityStrategy::Identity, 0.0, -1.0);
        let mut learner = Scripted {
            scores: vec![ActionScore::new(0, 0.0), ActionScore::new(1, 0.0)],
            learned: Vec::new(),
        };
        let mut rng = StdRng::seed_from_u64(0);
        let err = engine
            .step(&ctx, &features, &mut learner, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SimError::DegenerateDistribution { .. }));
        assert!(learner.learned.is_empty());
    }
}
