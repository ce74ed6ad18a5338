//! Runs every configured strategy against the same game.

mod blueprint;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use mystery_core::sim::{PolicySimulator, SimulationError, SimulationRun, TrialPlan};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError, AnalyticsSummary, GameOverview};
use crate::config::{ResolvedOutputs, SimulationConfig, ValidationError};

pub use blueprint::StrategyBlueprint;

/// Primary entry point for strategy comparisons.
pub struct ComparisonRunner {
    config: SimulationConfig,
    outputs: ResolvedOutputs,
    strategies: Vec<StrategyBlueprint>,
    simulator: PolicySimulator,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub trials: usize,
    pub strategies: usize,
    pub seed: u64,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_paths: Vec<PathBuf>,
    pub analytics: AnalyticsSummary,
}

impl ComparisonRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: SimulationConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let space = config.game.space()?;
        let strategies = StrategyBlueprint::from_configs(&config.strategies, &config.game);
        Ok(Self {
            config,
            outputs,
            strategies,
            simulator: PolicySimulator::new(space),
        })
    }

    pub fn strategies(&self) -> &[StrategyBlueprint] {
        &self.strategies
    }

    /// Execute every strategy, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let game = &self.config.game;
        let seed = self
            .config
            .trials
            .seed
            .unwrap_or_else(|| StdRng::from_entropy().next_u64());
        let mut seeds = StdRng::seed_from_u64(seed);

        let base_cost = game.base_cost();
        let payoffs = game.payoffs();
        let sampling_prior = game.implied_prior();
        let mut analytics = AnalyticsCollector::new(
            self.config.metrics.baseline(),
            GameOverview {
                hypotheses: game.hypotheses.clone(),
                payoffs: payoffs.clone(),
                sampling_prior: sampling_prior.clone(),
                observations: game.observations,
                base_cost,
                extra_cost: game.extra_observation_price,
                trials: self.config.trials.count,
                seed,
            },
        );

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rows_written = 0usize;

        for strategy in &self.strategies {
            let stream_seed = seeds.next_u64();
            let mut rng = StdRng::seed_from_u64(stream_seed);
            let plan = TrialPlan {
                trials: self.config.trials.count,
                sampling_prior: sampling_prior.clone(),
                betting_prior: strategy.betting_prior.clone(),
                payoffs: payoffs.clone(),
                observations: game.observations,
                base_cost,
                extra_cost: game.extra_observation_price,
            };

            let policy = strategy.spawn_policy();
            let run = self
                .simulator
                .run_trials(&plan, policy.as_ref(), &mut rng)?;

            rows_written += write_trial_rows(
                &mut writer,
                &self.config.run_id,
                strategy,
                self.simulator.engine().space().values(),
                &run,
            )?;
            analytics.record_run(
                &strategy.name,
                strategy.policy,
                &strategy.betting_prior,
                &run,
            )?;

            event!(
                target: "mystery_bench::strategy",
                Level::INFO,
                run_id = %self.config.run_id,
                strategy = %strategy.name,
                policy = strategy.policy.label(),
                stream_seed,
                trials = run.len() as u64,
                correct = run.correct_count() as u64,
                extra_purchases = run.extra_purchases() as u64,
                final_cumulative = run.final_cumulative(),
                final_average = run.final_average()
            );
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_paths = match summary.render_plots(&self.outputs.plots_dir) {
            Ok(outcome) => {
                for err in &outcome.failures {
                    event!(target: "mystery_bench::plot", Level::WARN, error = %err);
                    eprintln!("WARN: {}", err);
                }
                outcome.written
            }
            Err(err) => {
                event!(target: "mystery_bench::plot", Level::WARN, error = %err);
                eprintln!("WARN: {}", err);
                Vec::new()
            }
        };

        Ok(RunSummary {
            trials: self.config.trials.count,
            strategies: self.strategies.len(),
            seed,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_paths,
            analytics: summary,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_trial_rows(
    writer: &mut BufWriter<File>,
    run_id: &str,
    strategy: &StrategyBlueprint,
    hypotheses: &[f64],
    run: &SimulationRun,
) -> Result<usize, RunnerError> {
    for trial in run.trials() {
        let row = TrialLogRow {
            run_id,
            strategy: &strategy.name,
            policy: strategy.policy.label(),
            trial: trial.trial,
            true_hypothesis: hypotheses[trial.true_index],
            guessed_hypothesis: hypotheses[trial.guessed_index],
            successes: trial.successes,
            extra_draw: trial.extra_draw,
            total_cost: trial.total_cost,
            net: trial.net,
            correct: trial.correct,
            cumulative_net: trial.cumulative_net,
            average_net: trial.average_net,
        };

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
    }

    Ok(run.len())
}

#[derive(Serialize)]
struct TrialLogRow<'a> {
    run_id: &'a str,
    strategy: &'a str,
    policy: &'static str,
    trial: usize,
    true_hypothesis: f64,
    guessed_hypothesis: f64,
    successes: u32,
    extra_draw: Option<bool>,
    total_cost: f64,
    net: f64,
    correct: bool,
    cumulative_net: f64,
    average_net: f64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid game configuration: {0}")]
    Config(#[from] ValidationError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}
