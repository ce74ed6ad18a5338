use std::fs;
use std::panic::UnwindSafe;
use std::path::{Path, PathBuf};

use mystery_core::sim::{PolicyKind, SimulationRun};
use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::display::format_probability;

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline strategy '{0}' not present in simulation results")]
    MissingBaseline(String),
    #[error("strategy '{0}' recorded more than once")]
    DuplicateStrategy(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

/// Game parameters echoed at the top of the summary.
#[derive(Debug, Clone, Serialize)]
pub struct GameOverview {
    pub hypotheses: Vec<f64>,
    pub payoffs: Vec<f64>,
    pub sampling_prior: Vec<f64>,
    pub observations: u32,
    pub base_cost: f64,
    pub extra_cost: f64,
    pub trials: usize,
    pub seed: u64,
}

/// Gathers finished runs in strategy order.
pub struct AnalyticsCollector {
    baseline: String,
    overview: GameOverview,
    strategies: Vec<StrategyReport>,
}

impl AnalyticsCollector {
    pub fn new(baseline: impl Into<String>, overview: GameOverview) -> Self {
        Self {
            baseline: baseline.into(),
            overview,
            strategies: Vec::new(),
        }
    }

    pub fn record_run(
        &mut self,
        name: &str,
        policy: PolicyKind,
        betting_prior: &[f64],
        run: &SimulationRun,
    ) -> Result<(), AnalyticsError> {
        if self.strategies.iter().any(|s| s.name == name) {
            return Err(AnalyticsError::DuplicateStrategy(name.to_string()));
        }
        let nets = run.per_trial_net();
        self.strategies.push(StrategyReport {
            name: name.to_string(),
            policy,
            betting_prior: betting_prior.to_vec(),
            trials: run.len(),
            final_cumulative: run.final_cumulative(),
            final_average: run.final_average(),
            correct_rate: run.correct_rate(),
            extra_purchases: run.extra_purchases(),
            ci95: confidence_interval(&nets),
            delta_vs_baseline: 0.0,
            p_value: 1.0,
            cumulative: run.per_trial_cumulative(),
            average: run.per_trial_average(),
            nets,
        });
        Ok(())
    }

    pub fn finalize(self) -> Result<AnalyticsSummary, AnalyticsError> {
        let Some(baseline) = self.strategies.iter().find(|s| s.name == self.baseline) else {
            return Err(AnalyticsError::MissingBaseline(self.baseline));
        };
        let baseline_average = baseline.final_average;
        let baseline_nets = baseline.nets.clone();

        let mut strategies = self.strategies;
        for report in &mut strategies {
            report.delta_vs_baseline = report.final_average - baseline_average;
            report.p_value = if report.name == self.baseline {
                1.0
            } else {
                welch_z_test(&report.nets, &baseline_nets)
            };
        }

        Ok(AnalyticsSummary {
            baseline: self.baseline,
            overview: self.overview,
            strategies,
        })
    }
}

/// Final statistics for one strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub name: String,
    pub policy: PolicyKind,
    pub betting_prior: Vec<f64>,
    pub trials: usize,
    pub final_cumulative: f64,
    pub final_average: f64,
    pub correct_rate: f64,
    pub extra_purchases: usize,
    pub ci95: (f64, f64),
    pub delta_vs_baseline: f64,
    /// Two-sided p-value of the mean net difference against the baseline.
    pub p_value: f64,
    #[serde(skip)]
    pub cumulative: Vec<f64>,
    #[serde(skip)]
    pub average: Vec<f64>,
    #[serde(skip)]
    nets: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub baseline: String,
    pub overview: GameOverview,
    pub strategies: Vec<StrategyReport>,
}

impl AnalyticsSummary {
    pub fn strategy(&self, name: &str) -> Option<&StrategyReport> {
        self.strategies.iter().find(|s| s.name == name)
    }

    pub fn render_markdown(&self) -> String {
        let overview = &self.overview;
        let mut out = String::new();
        out.push_str("# Strategy Comparison\n\n");
        out.push_str(&format!(
            "{} trials per strategy, seed {}, {} draws at {:.2} total, extra draw {:.2}\n\n",
            overview.trials, overview.seed, overview.observations, overview.base_cost, overview.extra_cost
        ));

        out.push_str("| Hypothesis | Payoff | Sampling prior |\n");
        out.push_str("|------------|--------|----------------|\n");
        for ((value, payoff), prior) in overview
            .hypotheses
            .iter()
            .zip(&overview.payoffs)
            .zip(&overview.sampling_prior)
        {
            out.push_str(&format!(
                "| {value:.2} | {payoff:.2} | {} |\n",
                format_probability(*prior)
            ));
        }
        out.push('\n');

        out.push_str("| Strategy | Policy | Betting prior | Final cumulative | Final average | Δ vs baseline | 95% CI | Correct % | Extra draws | p-value |\n");
        out.push_str("|----------|--------|---------------|------------------|---------------|----------------|--------|-----------|-------------|---------|\n");
        for report in &self.strategies {
            let prior = report
                .betting_prior
                .iter()
                .map(|p| format_probability(*p))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "| {name} | {policy} | {prior} | {cumulative:.2} | {average:.4} | {delta:+.4} | [{ci_low:.4}, {ci_high:.4}] | {correct:.1}% | {extra} | {pval:.3} |\n",
                name = report.name,
                policy = report.policy,
                cumulative = report.final_cumulative,
                average = report.final_average,
                delta = report.delta_vs_baseline,
                ci_low = report.ci95.0,
                ci_high = report.ci95.1,
                correct = report.correct_rate * 100.0,
                extra = report.extra_purchases,
                pval = report.p_value,
            ));
        }
        out.push_str(&format!("\nBaseline: `{}`\n", self.baseline));
        out
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        fs::write(path.as_ref(), self.render_markdown()).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })
    }

    /// Renders cumulative and average net charts. Each chart is attempted
    /// on its own, so one failure does not block the other.
    pub fn render_plots(&self, dir: impl AsRef<Path>) -> Result<PlotOutcome, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let cumulative = self
            .strategies
            .iter()
            .map(|s| (s.name.clone(), s.cumulative.clone()))
            .collect::<Vec<_>>();
        let average = self
            .strategies
            .iter()
            .map(|s| (s.name.clone(), s.average.clone()))
            .collect::<Vec<_>>();

        let cumulative_path = dir.join("cumulative_net.png");
        let average_path = dir.join("average_net.png");
        Ok(render_each(vec![
            Box::new(move || {
                draw_line_chart(
                    cumulative_path,
                    "Cumulative net by trial",
                    "Cumulative net",
                    &cumulative,
                )
            }),
            Box::new(move || {
                draw_line_chart(
                    average_path,
                    "Average net by trial",
                    "Average net",
                    &average,
                )
            }),
        ]))
    }
}

/// Charts that rendered and the errors of those that did not.
#[derive(Debug, Default)]
pub struct PlotOutcome {
    pub written: Vec<PathBuf>,
    pub failures: Vec<AnalyticsError>,
}

type RenderJob = Box<dyn FnOnce() -> Result<PathBuf, AnalyticsError> + UnwindSafe>;

fn render_each(jobs: Vec<RenderJob>) -> PlotOutcome {
    let mut outcome = PlotOutcome::default();
    for job in jobs {
        match guarded_render(job) {
            Ok(path) => outcome.written.push(path),
            Err(err) => outcome.failures.push(err),
        }
    }
    outcome
}

/// Runs a plotters closure with panics converted to errors.
fn guarded_render<F>(render: F) -> Result<PathBuf, AnalyticsError>
where
    F: FnOnce() -> Result<PathBuf, AnalyticsError> + UnwindSafe,
{
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let attempt = std::panic::catch_unwind(render);
    std::panic::set_hook(prev_hook);

    match attempt {
        Ok(result) => result,
        Err(_) => Err(AnalyticsError::Plot(
            "plotters panicked while rendering (missing font support?)".into(),
        )),
    }
}

fn plot_error(err: impl std::fmt::Display) -> AnalyticsError {
    AnalyticsError::Plot(err.to_string())
}

/// One line per strategy over a log-scaled trial axis.
fn draw_line_chart(
    output_path: PathBuf,
    caption: &str,
    y_desc: &str,
    series: &[(String, Vec<f64>)],
) -> Result<PathBuf, AnalyticsError> {
    let root = BitMapBackend::new(&output_path, (960, 540)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let max_trial = series
        .iter()
        .map(|(_, values)| values.len())
        .max()
        .unwrap_or(1)
        .max(2) as f64;
    let (y_min, y_max) = series
        .iter()
        .flat_map(|(_, values)| values.iter().copied())
        .fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let margin = ((y_max - y_min).abs() * 0.1).max(0.5);

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(caption, ("sans-serif", 22))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(
            (1f64..max_trial).log_scale(),
            (y_min - margin)..(y_max + margin),
        )
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("Trial (log scale)")
        .y_desc(y_desc)
        .draw()
        .map_err(plot_error)?;

    for (idx, (name, values)) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(
                values
                    .iter()
                    .enumerate()
                    .map(|(i, value)| ((i + 1) as f64, *value)),
                &color,
            ))
            .map_err(plot_error)?
            .label(name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    drop(chart);
    root.present().map_err(plot_error)?;
    drop(root);

    Ok(output_path)
}

fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if values.len() == 1 {
        return (mean, 0.0);
    }
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (values.len() as f64 - 1.0);
    (mean, variance)
}

fn confidence_interval(values: &[f64]) -> (f64, f64) {
    let (mean, variance) = mean_and_variance(values);
    if values.len() < 2 {
        return (mean, mean);
    }
    let margin = CONFIDENCE_Z * (variance / values.len() as f64).sqrt();
    (mean - margin, mean + margin)
}

/// Two-sided large-sample test of equal means with unequal variances.
fn welch_z_test(a: &[f64], b: &[f64]) -> f64 {
    if a.len() < 2 || b.len() < 2 {
        return 1.0;
    }
    let (mean_a, var_a) = mean_and_variance(a);
    let (mean_b, var_b) = mean_and_variance(b);
    let std_error = (var_a / a.len() as f64 + var_b / b.len() as f64).sqrt();
    let diff = mean_a - mean_b;
    if std_error <= 0.0 || !std_error.is_finite() {
        return if diff.abs() <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    let Ok(normal) = Normal::new(0.0, 1.0) else {
        return 1.0;
    };
    let z = diff.abs() / std_error;
    (2.0 * (1.0 - normal.cdf(z))).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mystery_core::sim::{PolicySimulator, TrialPlan};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn overview() -> GameOverview {
        GameOverview {
            hypotheses: vec![0.25, 0.5, 0.75],
            payoffs: vec![10.0, 15.0, 30.0],
            sampling_prior: vec![0.5, 1.0 / 3.0, 1.0 / 6.0],
            observations: 5,
            base_cost: 5.0,
            extra_cost: 0.5,
            trials: 200,
            seed: 7,
        }
    }

    fn run(kind: PolicyKind, seed: u64) -> SimulationRun {
        let plan = TrialPlan {
            trials: 200,
            sampling_prior: vec![0.5, 1.0 / 3.0, 1.0 / 6.0],
            betting_prior: vec![0.5, 1.0 / 3.0, 1.0 / 6.0],
            payoffs: vec![10.0, 15.0, 30.0],
            observations: 5,
            base_cost: 5.0,
            extra_cost: 0.5,
        };
        PolicySimulator::default()
            .run_trials(&plan, kind.spawn().as_ref(), &mut StdRng::seed_from_u64(seed))
            .expect("simulation runs")
    }

    #[test]
    fn confidence_interval_brackets_the_mean() {
        let (low, high) = confidence_interval(&[1.0, 2.0, 3.0, 4.0]);
        assert!(low < 2.5 && 2.5 < high);
        assert_eq!(confidence_interval(&[3.0]), (3.0, 3.0));
    }

    #[test]
    fn welch_test_handles_identical_and_separated_samples() {
        let same = [1.0, 2.0, 3.0, 4.0];
        assert!((welch_z_test(&same, &same) - 1.0).abs() < 1e-12);

        let low = [0.0, 0.1, -0.1, 0.05, -0.05];
        let high = [10.0, 10.1, 9.9, 10.05, 9.95];
        assert!(welch_z_test(&high, &low) < 1e-6);

        assert_eq!(welch_z_test(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(welch_z_test(&[3.0, 3.0], &[2.0, 2.0]), 0.0);
    }

    #[test]
    fn baseline_gets_zero_delta_and_unit_p_value() {
        let mut collector = AnalyticsCollector::new("optimal", overview());
        let optimal = run(PolicyKind::EvOptimal, 1);
        let map = run(PolicyKind::AlwaysExtraMap, 2);
        collector
            .record_run("optimal", PolicyKind::EvOptimal, &[0.5, 0.3, 0.2], &optimal)
            .unwrap();
        collector
            .record_run("map", PolicyKind::AlwaysExtraMap, &[0.5, 0.3, 0.2], &map)
            .unwrap();
        let summary = collector.finalize().unwrap();

        let base = summary.strategy("optimal").unwrap();
        assert_eq!(base.delta_vs_baseline, 0.0);
        assert_eq!(base.p_value, 1.0);

        let other = summary.strategy("map").unwrap();
        assert!(
            (other.delta_vs_baseline - (map.final_average() - optimal.final_average())).abs()
                < 1e-12
        );
        assert!((0.0..=1.0).contains(&other.p_value));
        assert_eq!(other.extra_purchases, 200);

        let markdown = summary.render_markdown();
        assert!(markdown.contains("| optimal | ev |"));
        assert!(markdown.contains("0.333 (1/3)"));
    }

    #[test]
    fn failed_chart_does_not_block_the_next() {
        let jobs: Vec<RenderJob> = vec![
            Box::new(|| -> Result<PathBuf, AnalyticsError> {
                Err(AnalyticsError::Plot("no backend".into()))
            }),
            Box::new(|| -> Result<PathBuf, AnalyticsError> { panic!("font lookup failed") }),
            Box::new(|| -> Result<PathBuf, AnalyticsError> {
                Ok(PathBuf::from("average_net.png"))
            }),
        ];
        let outcome = render_each(jobs);
        assert_eq!(outcome.written, vec![PathBuf::from("average_net.png")]);
        assert_eq!(outcome.failures.len(), 2);
        assert!(
            outcome
                .failures
                .iter()
                .all(|err| matches!(err, AnalyticsError::Plot(_)))
        );
    }

    #[test]
    fn missing_baseline_is_reported() {
        let mut collector = AnalyticsCollector::new("ghost", overview());
        collector
            .record_run("optimal", PolicyKind::EvOptimal, &[1.0, 1.0, 1.0], &run(PolicyKind::EvOptimal, 3))
            .unwrap();
        assert!(matches!(
            collector.finalize(),
            Err(AnalyticsError::MissingBaseline(name)) if name == "ghost"
        ));
    }
}
