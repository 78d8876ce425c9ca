//! The simulation loop.
//!
//! [`SimulationRunner`] owns every piece of mutable state in a run: the seeded
//! RNG, the contexts, the learner, and the metrics. Each iteration draws, in
//! order:
//!
//! 1. the context index (uniform over `[0, num_contexts)`),
//! 2. the action uniform,
//! 3. the click uniform.
//!
//! Given the same configuration and seed, two runs draw the same values and
//! emit byte-identical report rows.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{
    ContextFeatures, DecisionEngine, Learner, MetricsAccumulator, MetricsSnapshot,
    SimError, SimulationConfig, StepOutcome, SyntheticContext,
};

/// One CSV report row.
///
/// `Display` renders
/// `config,num_actions,num_contexts,no_click_cost,click_cost,p_strategy,seed,iteration,click_rate,good_actions,good_actions_since_last`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReportRow {
    pub config: String,
    pub num_actions: usize,
    pub num_contexts: usize,
    pub no_click_cost: f64,
    pub click_cost: f64,
    pub p_strategy: i64,
    pub seed: u64,
    pub iteration: u64,
    pub click_rate: f64,
    pub good_actions: u64,
    pub good_actions_since_last: u64,
}

impl ReportRow {
    fn new(cfg: &SimulationConfig, snap: MetricsSnapshot) -> Self {
        Self {
            config: cfg.learner_args.clone(),
            num_actions: cfg.num_actions,
            num_contexts: cfg.num_contexts,
            no_click_cost: cfg.no_click_cost,
            click_cost: cfg.click_cost,
            p_strategy: cfg.p_strategy,
            seed: cfg.seed,
            iteration: snap.iteration,
            click_rate: snap.click_rate,
            good_actions: snap.good_actions,
            good_actions_since_last: snap.good_actions_since_last,
        }
    }
}

impl fmt::Display for ReportRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.config,
            self.num_actions,
            self.num_contexts,
            self.no_click_cost,
            self.click_cost,
            self.p_strategy,
            self.seed,
            self.iteration,
            self.click_rate,
            self.good_actions,
            self.good_actions_since_last
        )
    }
}

/// Drives a learner through `total_iterations` simulated decisions.
#[derive(Debug)]
pub struct SimulationRunner<L> {
    cfg: SimulationConfig,
    rng: StdRng,
    contexts: Vec<(SyntheticContext, ContextFeatures)>,
    engine: DecisionEngine,
    metrics: MetricsAccumulator,
    learner: L,
    iteration: u64,
}

impl<L: Learner> SimulationRunner<L> {
    /// Validate `cfg`, build the contexts, and seed the RNG.
    ///
    /// Every configuration error (including an unknown propensity strategy)
    /// surfaces here, before any iteration runs.
    pub fn new(cfg: SimulationConfig, learner: L) -> Result<Self, SimError> {
        let strategy = cfg.validate()?;
        let contexts = (0..cfg.num_contexts)
            .map(|id| {
                let c = SyntheticContext::new(cfg.num_actions, id, cfg.min_p, cfg.max_p)?;
                let f = c.features();
                Ok((c, f))
            })
            .collect::<Result<Vec<_>, SimError>>()?;
        Ok(Self {
            engine: DecisionEngine::new(strategy, cfg.no_click_cost, cfg.click_cost),
            rng: StdRng::seed_from_u64(cfg.seed),
            contexts,
            metrics: MetricsAccumulator::new(),
            learner,
            iteration: 0,
            cfg,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.cfg
    }

    pub fn contexts(&self) -> impl Iterator<Item = &SyntheticContext> {
        self.contexts.iter().map(|(c, _)| c)
    }

    pub fn metrics(&self) -> &MetricsAccumulator {
        &self.metrics
    }

    pub fn learner(&self) -> &L {
        &self.learner
    }

    pub fn into_learner(self) -> L {
        self.learner
    }

    /// Iterations completed so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn is_finished(&self) -> bool {
        self.iteration >= self.cfg.total_iterations
    }

    /// Run one iteration. Returns the step outcome and, when one is due, the
    /// report row for this iteration. Returns `Ok(None)` once finished.
    pub fn step(&mut self) -> Result<Option<(StepOutcome, Option<ReportRow>)>, SimError> {
        if self.is_finished() {
            return Ok(None);
        }
        let i = self.iteration + 1;

        let idx = self.rng.random_range(0..self.contexts.len());
        let (context, features) = &self.contexts[idx];
        let outcome = self
            .engine
            .step(context, features, &mut self.learner, &mut self.rng)?;
        self.metrics.record(outcome.good_action, outcome.clicked);
        self.iteration = i;

        let due = MetricsAccumulator::is_due(i, self.cfg.report_interval, self.cfg.total_iterations);
        let row = if due {
            self.metrics
                .emit(i, self.cfg.total_iterations)
                .map(|snap| ReportRow::new(&self.cfg, snap))
        } else {
            None
        };
        if let Some(r) = &row {
            tracing::debug!(
                iteration = r.iteration,
                click_rate = r.click_rate,
                good_actions = r.good_actions,
                good_actions_since_last = r.good_actions_since_last,
                "report"
            );
        }
        Ok(Some((outcome, row)))
    }

    /// Run to completion, handing each report row to `on_row`.
    ///
    /// The first error (from the simulation or from `on_row`) aborts the run.
    pub fn try_run_with<E, F>(&mut self, mut on_row: F) -> Result<(), E>
    where
        E: From<SimError>,
        F: FnMut(&ReportRow) -> Result<(), E>,
    {
        tracing::info!(
            learner = %self.cfg.learner_args,
            num_actions = self.cfg.num_actions,
            num_contexts = self.cfg.num_contexts,
            p_strategy = self.cfg.p_strategy,
            total_iterations = self.cfg.total_iterations,
            seed = self.cfg.seed,
            "simulation start"
        );
        while let Some((_, row)) = self.step()? {
            if let Some(r) = row {
                on_row(&r)?;
            }
        }
        tracing::info!(
            iterations = self.iteration,
            clicks = self.metrics.clicks(),
            good_actions = self.metrics.good_actions(),
            "simulation done"
        );
        Ok(())
    }

    /// Run to completion and collect every report row.
    pub fn run(&mut self) -> Result<Vec<ReportRow>, SimError> {
        let mut rows = Vec::new();
        self.try_run_with(|r: &ReportRow| -> Result<(), SimError> {
            rows.push(r.clone());
            Ok(())
        })?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActionScore, FeedbackEvent, LearnerError, TabularLearner};

    #[derive(Debug)]
    struct Flat;

    impl Learner for Flat {
        fn predict(&mut self, ctx: &ContextFeatures) -> Result<Vec<ActionScore>, LearnerError> {
            Ok(ctx.actions.iter().map(|a| ActionScore::new(a.action, 1.0)).collect())
        }
        fn learn(&mut self, _: &ContextFeatures, _: &FeedbackEvent) -> Result<(), LearnerError> {
            Ok(())
        }
    }

    fn small_cfg() -> SimulationConfig {
        SimulationConfig {
            learner_args: "--epsilon 0.1".to_string(),
            num_actions: 4,
            num_contexts: 3,
            min_p: 0.1,
            max_p: 0.6,
            total_iterations: 250,
            report_interval: 100,
            seed: 42,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn emits_on_interval_and_final_iteration() {
        let mut r = SimulationRunner::new(small_cfg(), Flat).unwrap();
        let rows = r.run().unwrap();
        let its: Vec<u64> = rows.iter().map(|x| x.iteration).collect();
        assert_eq!(its, vec![100, 200, 250]);
        assert!(r.is_finished());
        assert!(r.step().unwrap().is_none());

        let since: u64 = rows.iter().map(|x| x.good_actions_since_last).sum();
        assert_eq!(since, rows.last().unwrap().good_actions);
    }

    #[test]
    fn builds_one_context_per_id_and_hands_back_the_learner() {
        let learner = TabularLearner::from_args("--epsilon 0.1").unwrap();
        let mut r = SimulationRunner::new(small_cfg(), learner).unwrap();
        assert_eq!(r.config(), &small_cfg());
        let ids: Vec<usize> = r.contexts().map(SyntheticContext::id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        for c in r.contexts() {
            assert_eq!(c.num_actions(), 4);
            assert_eq!(c.true_pdf()[c.id()], 0.6);
        }

        r.run().unwrap();
        let learner = r.into_learner();
        // Every context was visited, so each has at least one trained cell.
        for id in 0..3 {
            let trained = (0..4).any(|a| learner.estimate(4 * id + a).is_some());
            assert!(trained, "context {id} never trained");
        }
    }

    #[test]
    fn final_iteration_on_interval_emits_once() {
        let cfg = SimulationConfig {
            total_iterations: 200,
            ..small_cfg()
        };
        let rows = SimulationRunner::new(cfg, Flat).unwrap().run().unwrap();
        let its: Vec<u64> = rows.iter().map(|x| x.iteration).collect();
        assert_eq!(its, vec![100, 200]);
    }

    #[test]
    fn same_seed_same_rows() {
        let render = || {
            let learner = TabularLearner::from_args("--epsilon 0.1").unwrap();
            SimulationRunner::new(small_cfg(), learner)
                .unwrap()
                .run()
                .unwrap()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn unknown_strategy_fails_before_running() {
        let cfg = SimulationConfig {
            p_strategy: 99,
            ..small_cfg()
        };
        let err = SimulationRunner::new(cfg, Flat).unwrap_err();
        assert_eq!(err, SimError::UnknownStrategy(99));
    }

    #[test]
    fn row_renders_as_csv() {
        let row = ReportRow {
            config: "--epsilon 0.1".to_string(),
            num_actions: 10,
            num_contexts: 10,
            no_click_cost: 0.0,
            click_cost: -1.0,
            p_strategy: 0,
            seed: 3,
            iteration: 100,
            click_rate: 0.04,
            good_actions: 12,
            good_actions_since_last: 5,
        };
        assert_eq!(row.to_string(), "--epsilon 0.1,10,10,0,-1,0,3,100,0.04,12,5");
    }
}
