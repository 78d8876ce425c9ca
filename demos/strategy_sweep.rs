//! Compare propensity-reporting strategies against the same learner and seeds.
//!
//! Run with: cargo run --example strategy_sweep

use cbsim::{PropensityStrategy, SimulationConfig, SimulationRunner, TabularLearner};

fn main() {
    let learner_args = "--epsilon 0.1 -l 0.3";
    let seeds = 0..5u64;

    println!("p_strategy,mean_click_rate,mean_good_action_rate");
    for strategy in PropensityStrategy::ALL {
        let mut click_sum = 0.0;
        let mut good_sum = 0.0;
        for seed in seeds.clone() {
            let cfg = SimulationConfig {
                learner_args: learner_args.to_string(),
                num_actions: 10,
                num_contexts: 10,
                min_p: 0.03,
                max_p: 0.3,
                p_strategy: strategy.id(),
                total_iterations: 20_000,
                report_interval: 20_000,
                seed,
                ..SimulationConfig::default()
            };
            let learner = match TabularLearner::from_args(learner_args) {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("bad learner args: {e}");
                    return;
                }
            };
            let rows = match SimulationRunner::new(cfg, learner).and_then(|mut r| r.run()) {
                Ok(rows) => rows,
                Err(e) => {
                    eprintln!("strategy {strategy} seed {seed}: {e}");
                    return;
                }
            };
            if let Some(last) = rows.last() {
                click_sum += last.click_rate;
                good_sum += last.good_actions as f64 / last.iteration as f64;
            }
        }
        let n = seeds.clone().count() as f64;
        println!("{},{:.4},{:.4}", strategy, click_sum / n, good_sum / n);
    }
}
