//! A small cost-sensitive tabular learner.
//!
//! Keeps one cost estimate per context x action cross and regresses the chosen
//! action's estimate toward the observed cost, importance-weighted by
//! `1 / reported_propensity`. Predictions are exploration distributions built
//! from the estimates (lower cost is better):
//!
//! - epsilon-greedy: `1 - epsilon + epsilon/K` on the greedy action (lowest
//!   action index among equal estimates), `epsilon/K` elsewhere;
//! - softmax: `p_a ∝ exp(-lambda * (est_a - min_est))`.
//!
//! Because the weight uses the *reported* propensity, clipping or fixing the
//! propensity changes how fast the estimates move, which is exactly what the
//! simulator is meant to expose.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::{ActionScore, ContextFeatures, FeedbackEvent, Learner, LearnerError};

/// Exploration scheme applied on top of the cost estimates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Exploration {
    /// Uniform exploration mass `epsilon` in `[0, 1]`.
    EpsilonGreedy { epsilon: f64 },
    /// Boltzmann exploration with inverse temperature `lambda` (finite, >= 0).
    Softmax { lambda: f64 },
}

/// Configuration for [`TabularLearner`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TabularConfig {
    pub exploration: Exploration,
    /// Base step size (finite, > 0). The effective step is
    /// `min(1, learning_rate / propensity)`.
    pub learning_rate: f64,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            exploration: Exploration::EpsilonGreedy { epsilon: 0.05 },
            learning_rate: 0.5,
        }
    }
}

impl FromStr for TabularConfig {
    type Err = LearnerError;

    /// Parse a flag string such as `--epsilon 0.1 -l 0.3` or
    /// `--softmax --lambda 8`. An empty string yields the defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |detail: String| LearnerError::Config {
            config: s.to_string(),
            detail,
        };

        let mut epsilon: Option<f64> = None;
        let mut lambda: Option<f64> = None;
        let mut softmax = false;
        let mut learning_rate = TabularConfig::default().learning_rate;

        let mut tokens = s.split_whitespace();
        while let Some(flag) = tokens.next() {
            let mut value = |name: &str| -> Result<f64, LearnerError> {
                let raw = tokens
                    .next()
                    .ok_or_else(|| err(format!("missing value for `{name}`")))?;
                raw.parse::<f64>()
                    .map_err(|_| err(format!("`{name}` expects a number, got `{raw}`")))
            };
            match flag {
                "--epsilon" => epsilon = Some(value(flag)?),
                "--lambda" => lambda = Some(value(flag)?),
                "--learning_rate" | "-l" => learning_rate = value(flag)?,
                "--softmax" => softmax = true,
                other => return Err(err(format!("unknown flag `{other}`"))),
            }
        }

        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(err(format!("learning rate must be > 0, got {learning_rate}")));
        }

        let exploration = if softmax {
            if epsilon.is_some() {
                return Err(err("`--epsilon` cannot be combined with `--softmax`".to_string()));
            }
            let lambda = lambda.unwrap_or(1.0);
            if !(lambda.is_finite() && lambda >= 0.0) {
                return Err(err(format!("lambda must be finite and >= 0, got {lambda}")));
            }
            Exploration::Softmax { lambda }
        } else {
            if lambda.is_some() {
                return Err(err("`--lambda` requires `--softmax`".to_string()));
            }
            let epsilon = epsilon.unwrap_or(0.05);
            if !(0.0..=1.0).contains(&epsilon) {
                return Err(err(format!("epsilon must be in [0, 1], got {epsilon}")));
            }
            Exploration::EpsilonGreedy { epsilon }
        };

        Ok(Self {
            exploration,
            learning_rate,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    estimate: f64,
    updates: u64,
}

/// Tabular importance-weighted cost regressor with configurable exploration.
#[derive(Debug, Clone)]
pub struct TabularLearner {
    cfg: TabularConfig,
    cells: BTreeMap<usize, Cell>,
}

impl TabularLearner {
    pub fn new(cfg: TabularConfig) -> Self {
        Self {
            cfg,
            cells: BTreeMap::new(),
        }
    }

    /// Build from a flag string (see [`TabularConfig`]'s `FromStr`).
    pub fn from_args(args: &str) -> Result<Self, LearnerError> {
        Ok(Self::new(args.parse()?))
    }

    pub fn config(&self) -> TabularConfig {
        self.cfg
    }

    /// Current cost estimate for a crossed feature (`None` if never updated).
    pub fn estimate(&self, cross: usize) -> Option<f64> {
        self.cells
            .get(&cross)
            .filter(|c| c.updates > 0)
            .map(|c| c.estimate)
    }

    fn estimates(&self, context: &ContextFeatures) -> Vec<f64> {
        context
            .actions
            .iter()
            .map(|a| self.cells.get(&a.cross).map(|c| c.estimate).unwrap_or(0.0))
            .collect()
    }
}

impl Default for TabularLearner {
    fn default() -> Self {
        Self::new(TabularConfig::default())
    }
}

impl Learner for TabularLearner {
    fn predict(&mut self, context: &ContextFeatures) -> Result<Vec<ActionScore>, LearnerError> {
        let k = context.num_actions();
        if k == 0 {
            return Err(LearnerError::Rejected {
                detail: "context has no actions".to_string(),
            });
        }
        let est = self.estimates(context);

        let probs: Vec<f64> = match self.cfg.exploration {
            Exploration::EpsilonGreedy { epsilon } => {
                // Strict `<` keeps the lowest index among ties.
                let mut greedy = 0usize;
                for (i, e) in est.iter().enumerate() {
                    if *e < est[greedy] {
                        greedy = i;
                    }
                }
                let floor = epsilon / k as f64;
                (0..k)
                    .map(|i| if i == greedy { 1.0 - epsilon + floor } else { floor })
                    .collect()
            }
            Exploration::Softmax { lambda } => {
                let min_e = est.iter().copied().fold(f64::INFINITY, f64::min);
                let w: Vec<f64> = est.iter().map(|e| (-lambda * (e - min_e)).exp()).collect();
                let denom: f64 = w.iter().sum();
                if denom > 0.0 && denom.is_finite() {
                    w.into_iter().map(|x| x / denom).collect()
                } else {
                    vec![1.0 / k as f64; k]
                }
            }
        };

        Ok(context
            .actions
            .iter()
            .zip(probs)
            .map(|(a, p)| ActionScore::new(a.action, p))
            .collect())
    }

    fn learn(
        &mut self,
        context: &ContextFeatures,
        event: &FeedbackEvent,
    ) -> Result<(), LearnerError> {
        let p = event.reported_propensity;
        if !(p.is_finite() && p > 0.0 && p <= 1.0) {
            return Err(LearnerError::Rejected {
                detail: format!("propensity {p} outside (0, 1]"),
            });
        }
        if !event.cost.is_finite() {
            return Err(LearnerError::Rejected {
                detail: format!("non-finite cost {}", event.cost),
            });
        }
        let Some(feat) = context
            .actions
            .iter()
            .find(|a| a.action == event.chosen_action)
        else {
            return Err(LearnerError::Rejected {
                detail: format!("action {} not in context", event.chosen_action),
            });
        };

        let step = (self.cfg.learning_rate / p).min(1.0);
        let cell = self.cells.entry(feat.cross).or_default();
        cell.estimate += step * (event.cost - cell.estimate);
        cell.updates = cell.updates.saturating_add(1);
        Ok(())
    }
}
