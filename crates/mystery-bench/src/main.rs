use std::path::PathBuf;

use clap::Parser;

use mystery_bench::comparison::ComparisonRunner;
use mystery_bench::config::{ResolvedOutputs, SimulationConfig};
use mystery_bench::logging::init_logging;
use mystery_bench::telemetry::{append_highlights_to_markdown, write_summary_outputs};

/// Monte Carlo comparison of mystery-box guessing strategies.
#[derive(Debug, Parser)]
#[command(
    name = "mystery-bench",
    author,
    version,
    about = "Deterministic strategy comparison for the mystery box game"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/mystery.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of trials per strategy.
    #[arg(long, value_name = "TRIALS")]
    trials: Option<usize>,

    /// Override the RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Exit after validating the configuration (no simulation is run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = SimulationConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(trials) = cli.trials {
        config.trials.count = trials;
    }

    if let Some(seed) = cli.seed {
        config.trials.seed = Some(seed);
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let strategy_count = config.strategies.len();
    let run_id = config.run_id.clone();
    let trials = config.trials.count;

    println!(
        "Loaded configuration '{run_id}' with {strategy_count} strateg{} ({trials} trials each)",
        if strategy_count == 1 { "y" } else { "ies" }
    );

    if cli.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = ComparisonRunner::new(config, outputs.clone())?;
    let summary = runner.run()?;

    println!(
        "Comparison complete for '{run_id}' (seed {}): {} strategies × {} trials → {} rows at {}",
        summary.seed,
        summary.strategies,
        summary.trials,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    for report in &summary.analytics.strategies {
        println!(
            "  {:<20} final average {:>9.4}  cumulative {:>11.2}  correct {:>5.1}%",
            report.name,
            report.final_average,
            report.final_cumulative,
            report.correct_rate * 100.0
        );
    }
    println!("Summary table: {}", summary.summary_path.display());
    for plot_path in &summary.plot_paths {
        println!("Chart: {}", plot_path.display());
    }

    // Dropping the guard flushes the log before it is summarised.
    let telemetry_path = logging_guard.map(|guard| guard.telemetry_path.clone());
    if let Some(path) = telemetry_path {
        println!("Telemetry log: {}", path.display());
        if let Some(telemetry) = write_summary_outputs(&path, &outputs.summary_dir())? {
            append_highlights_to_markdown(&summary.summary_path, &telemetry)?;
            println!("Telemetry summary (JSON): {}", telemetry.json_path.display());
            println!(
                "Telemetry summary (Markdown): {}",
                telemetry.markdown_path.display()
            );
            if let Some(best) = telemetry.summary.strategies.best_strategy.as_ref() {
                println!("  Best strategy by final average: {best}");
            }
        }
    }

    Ok(())
}
