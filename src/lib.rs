//! `cbsim`: offline feedback-loop simulator for contextual-bandit learners.
//!
//! The simulator manufactures synthetic decision contexts with known ground
//! truth, asks a [`Learner`] for an action distribution, samples an action,
//! draws a click against the context's true click probabilities, and feeds the
//! resulting cost back with a *reported propensity*. Running metrics (click
//! rate, how often the best action was chosen) are emitted as CSV rows at a
//! fixed cadence.
//!
//! The interesting knob is the [`PropensityStrategy`]: what the label claims
//! the probability of the chosen action was. Clipping, fixing, or flattening
//! that value changes the importance weights a learner trains on, and the
//! simulator shows what that does to learning.
//!
//! **Pieces:**
//! - [`SyntheticContext`]: one scenario; action `id` is best (`max_p`), the rest
//!   click with `min_p`. [`ContextFeatures`] is what a learner sees.
//! - [`PropensityStrategy`]: pure map from the learner's estimate to the
//!   reported propensity, selected by numeric id (unknown ids are errors).
//! - [`DecisionEngine`]: one step: predict, sample, click, label, learn.
//! - [`MetricsAccumulator`]: counters and report snapshots.
//! - [`SimulationRunner`]: the seeded loop that wires everything together.
//! - [`TabularLearner`]: a built-in importance-weighted learner with
//!   epsilon-greedy or softmax exploration, configured by a flag string.
//!
//! **Determinism:** a run is driven by a single seeded RNG. Each iteration
//! draws the context index, then the action uniform, then the click uniform.
//! Same configuration and seed give byte-identical rows.
//!
//! **Non-goals:** deployment plumbing (logging pipelines, replay, distributed
//! training). Everything is single-threaded and synchronous.
//!
//! ```rust
//! use cbsim::{SimulationConfig, SimulationRunner, TabularLearner};
//!
//! let cfg = SimulationConfig {
//!     learner_args: "--epsilon 0.2".to_string(),
//!     num_actions: 4,
//!     num_contexts: 4,
//!     total_iterations: 500,
//!     report_interval: 250,
//!     ..SimulationConfig::default()
//! };
//! let learner = TabularLearner::from_args(&cfg.learner_args).unwrap();
//! let rows = SimulationRunner::new(cfg, learner).unwrap().run().unwrap();
//! assert_eq!(rows.len(), 2);
//! assert!((0.0..=1.0).contains(&rows[1].click_rate));
//! ```

#![forbid(unsafe_code)]

mod error;
pub use error::*;

mod context;
pub use context::*;

mod propensity;
pub use propensity::*;

mod learner;
pub use learner::*;

mod tabular;
pub use tabular::*;

mod engine;
pub use engine::*;

mod metrics;
pub use metrics::*;

mod config;
pub use config::*;

mod runner;
pub use runner::*;
