use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

const STRATEGY_TARGET: &str = "mystery_bench::strategy";
const SIMULATION_TARGET: &str = "mystery_core::sim";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub strategies: StrategyTelemetrySummary,
    pub simulation: SimulationTelemetrySummary,
}

#[derive(Debug, Default, Serialize)]
pub struct StrategyTelemetrySummary {
    pub count: usize,
    pub best_strategy: Option<String>,
    pub best_average: Option<f64>,
    pub avg_final_average: Option<f64>,
    pub avg_correct_rate: Option<f64>,
    pub policy_counts: BTreeMap<String, usize>,
}

/// Core simulator events; only present at `debug` level or finer.
#[derive(Debug, Default, Serialize)]
pub struct SimulationTelemetrySummary {
    pub runs: usize,
    pub trials_traced: usize,
    pub degenerate_posteriors: usize,
}

#[derive(Debug)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Aggregate strategy and simulator events from a JSON log.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut strategies = StrategyTelemetrySummary::default();
    let mut simulation = SimulationTelemetrySummary::default();
    let mut average_avg = Average::new();
    let mut correct_avg = Average::new();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match target {
            STRATEGY_TARGET => {
                strategies.count += 1;

                let policy = fields
                    .get("policy")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("<unset>");
                *strategies
                    .policy_counts
                    .entry(policy.to_string())
                    .or_insert(0) += 1;

                let trials = fields.get("trials").and_then(Value::as_f64);
                if let (Some(correct), Some(trials)) =
                    (fields.get("correct").and_then(Value::as_f64), trials)
                    && trials > 0.0
                {
                    correct_avg.add(correct / trials);
                }

                if let Some(average) = fields.get("final_average").and_then(Value::as_f64) {
                    average_avg.add(average);
                    if strategies.best_average.is_none_or(|best| average > best) {
                        strategies.best_average = Some(average);
                        strategies.best_strategy = fields
                            .get("strategy")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                    }
                }
            }
            SIMULATION_TARGET => {
                if fields.contains_key("final_average") {
                    simulation.runs += 1;
                } else if fields.contains_key("trial") {
                    simulation.trials_traced += 1;
                } else if fields
                    .get("message")
                    .and_then(Value::as_str)
                    .is_some_and(|m| m.contains("no mass"))
                {
                    simulation.degenerate_posteriors += 1;
                }
            }
            _ => {}
        }
    }

    strategies.avg_final_average = average_avg.mean();
    strategies.avg_correct_rate = correct_avg.mean();

    Ok(TelemetrySummary {
        strategies,
        simulation,
    })
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(&json_path, serde_json::to_vec_pretty(&summary)?).map_err(|source| {
        TelemetryError::Io {
            context: "writing telemetry summary json",
            source,
        }
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    push_strategy_lines(&mut section, &outputs.summary.strategies);

    let sim = &outputs.summary.simulation;
    if sim.runs > 0 {
        section.push_str(&format!("- Simulator runs logged: {}\n", sim.runs));
        section.push_str(&format!(
            "- Degenerate posteriors: {}\n",
            sim.degenerate_posteriors
        ));
    }

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn push_strategy_lines(out: &mut String, strategies: &StrategyTelemetrySummary) {
    out.push_str(&format!("- Strategy runs captured: {}\n", strategies.count));
    if let (Some(name), Some(value)) = (&strategies.best_strategy, strategies.best_average) {
        out.push_str(&format!("- Best final average: {name} ({value:.4})\n"));
    }
    if let Some(value) = strategies.avg_final_average {
        out.push_str(&format!("- Mean final average: {value:.4}\n"));
    }
    if let Some(value) = strategies.avg_correct_rate {
        out.push_str(&format!("- Mean correct rate: {:.1}%\n", value * 100.0));
    }
    if !strategies.policy_counts.is_empty() {
        out.push_str("- Policies:\n");
        for (label, count) in &strategies.policy_counts {
            out.push_str(&format!("  - {label}: {count}\n"));
        }
    }
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n", telemetry_path.display()));
    output.push('\n');

    output.push_str("## Strategies\n");
    push_strategy_lines(&mut output, &summary.strategies);
    output.push('\n');

    output.push_str("## Simulator\n");
    let sim = &summary.simulation;
    if sim.runs == 0 && sim.trials_traced == 0 && sim.degenerate_posteriors == 0 {
        output.push_str("- <none> (enable debug level to capture)\n");
    } else {
        output.push_str(&format!("- Runs: {}\n", sim.runs));
        output.push_str(&format!("- Trials traced: {}\n", sim.trials_traced));
        output.push_str(&format!(
            "- Degenerate posteriors: {}\n",
            sim.degenerate_posteriors
        ));
    }
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        for line in lines {
            writeln!(file, "{line}").expect("write line");
        }
        file
    }

    #[test]
    fn summarises_strategy_and_simulator_events() {
        let lines = vec![
            r#"{"target":"mystery_bench::strategy","fields":{"strategy":"optimal","policy":"ev","trials":100,"correct":60,"final_average":1.5}}"#,
            r#"{"target":"mystery_bench::strategy","fields":{"strategy":"uniform_extra_map","policy":"always_extra_map","trials":100,"correct":40,"final_average":-0.5}}"#,
            r#"{"target":"mystery_core::sim","fields":{"policy":"ev","trials":100,"final_average":1.5}}"#,
            r#"{"target":"mystery_core::sim","fields":{"policy":"ev","trial":3,"net":-5.0}}"#,
            r#"{"target":"mystery_core::sim","fields":{"message":"posterior carries no mass; continuing with zero vector","successes":0}}"#,
            r#"{"target":"somewhere_else","fields":{}}"#,
        ];
        let file = write_temp_file(&lines);
        let summary = summarise_telemetry(file.path()).expect("summarise");

        let strategies = &summary.strategies;
        assert_eq!(strategies.count, 2);
        assert_eq!(strategies.best_strategy.as_deref(), Some("optimal"));
        assert_eq!(strategies.best_average, Some(1.5));
        assert!((strategies.avg_final_average.unwrap() - 0.5).abs() < 1e-12);
        assert!((strategies.avg_correct_rate.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(strategies.policy_counts.get("ev"), Some(&1));
        assert_eq!(strategies.policy_counts.get("always_extra_map"), Some(&1));

        assert_eq!(summary.simulation.runs, 1);
        assert_eq!(summary.simulation.trials_traced, 1);
        assert_eq!(summary.simulation.degenerate_posteriors, 1);
    }

    #[test]
    fn handles_missing_file() {
        let path = Path::new("tests/does/not/exist.jsonl");
        let summary = summarise_telemetry(path).expect("summarise missing file");
        assert_eq!(summary.strategies.count, 0);
        assert!(summary.strategies.best_strategy.is_none());
        assert!(write_summary_outputs(path, Path::new(".")).unwrap().is_none());
    }

    #[test]
    fn appends_highlights_to_summary_markdown() {
        let mut summary_file = tempfile::NamedTempFile::new().expect("summary temp file");
        writeln!(summary_file, "# Strategy Comparison").expect("seed summary content");

        let mut policy_counts = BTreeMap::new();
        policy_counts.insert("ev".to_string(), 1);
        policy_counts.insert("always_extra_map".to_string(), 2);
        let outputs = TelemetryOutputs {
            summary: TelemetrySummary {
                strategies: StrategyTelemetrySummary {
                    count: 3,
                    best_strategy: Some("optimal".to_string()),
                    best_average: Some(2.25),
                    avg_final_average: Some(0.75),
                    avg_correct_rate: Some(0.5),
                    policy_counts,
                },
                simulation: SimulationTelemetrySummary::default(),
            },
            json_path: PathBuf::from("telemetry_summary.json"),
            markdown_path: PathBuf::from("telemetry_summary.md"),
        };

        append_highlights_to_markdown(summary_file.path(), &outputs).expect("append highlights");

        let contents = std::fs::read_to_string(summary_file.path()).expect("read summary file");
        assert!(contents.starts_with("# Strategy Comparison"));
        assert!(contents.contains("## Telemetry Highlights"));
        assert!(contents.contains("Strategy runs captured: 3"));
        assert!(contents.contains("Best final average: optimal (2.2500)"));
        assert!(contents.contains("always_extra_map: 2"));
        assert!(!contents.contains("Simulator runs logged"));
    }
}
