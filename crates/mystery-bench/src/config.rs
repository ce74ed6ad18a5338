use mystery_core::game::round::MAX_OBSERVATIONS;
use mystery_core::model::HypothesisSpace;
use mystery_core::model::payoff::{
    DEFAULT_BONUSES, base_cost, gross_payoffs, implied_probabilities,
};
use mystery_core::sim::PolicyKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_OBSERVATIONS: u32 = 5;
const DEFAULT_OBSERVATION_PRICE: f64 = 1.0;
const DEFAULT_EXTRA_OBSERVATION_PRICE: f64 = 0.5;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root simulation configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub run_id: String,
    #[serde(default)]
    pub game: GameConfig,
    pub trials: TrialsConfig,
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: SimulationConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    ///
    /// Fills in the baseline strategy when none is named.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.game.validate()?;
        self.trials.validate()?;
        self.outputs.validate(&self.run_id)?;
        validate_strategies(&self.strategies, self.game.hypotheses.len())?;
        self.metrics.normalize(&self.strategies)?;
        self.logging.normalize()?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

/// Prices, prizes and hypotheses of the simulated game.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GameConfig {
    #[serde(default = "default_hypotheses")]
    pub hypotheses: Vec<f64>,
    #[serde(default = "default_observations")]
    pub observations: u32,
    #[serde(default = "default_observation_price")]
    pub observation_price: f64,
    #[serde(default = "default_extra_observation_price")]
    pub extra_observation_price: f64,
    /// Net prize over the base cost, per hypothesis.
    #[serde(default = "default_bonuses")]
    pub bonuses: Vec<f64>,
    /// Gross payoffs; overrides `bonuses` when present.
    #[serde(default)]
    pub payoffs: Option<Vec<f64>>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            hypotheses: default_hypotheses(),
            observations: default_observations(),
            observation_price: default_observation_price(),
            extra_observation_price: default_extra_observation_price(),
            bonuses: default_bonuses(),
            payoffs: None,
        }
    }
}

impl GameConfig {
    pub fn space(&self) -> Result<HypothesisSpace, ValidationError> {
        HypothesisSpace::new(self.hypotheses.clone()).map_err(|err| {
            ValidationError::InvalidField {
                field: "game.hypotheses".to_string(),
                message: err.to_string(),
            }
        })
    }

    pub fn base_cost(&self) -> f64 {
        base_cost(self.observation_price, self.observations)
    }

    pub fn payoffs(&self) -> Vec<f64> {
        match &self.payoffs {
            Some(payoffs) => payoffs.clone(),
            None => gross_payoffs(&self.bonuses, self.base_cost()),
        }
    }

    /// Prior the hidden box is drawn from.
    pub fn implied_prior(&self) -> Vec<f64> {
        implied_probabilities(&self.payoffs(), self.base_cost())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.space()?;

        if !(1..=MAX_OBSERVATIONS).contains(&self.observations) {
            return Err(ValidationError::InvalidField {
                field: "game.observations".to_string(),
                message: format!("must be between 1 and {MAX_OBSERVATIONS}"),
            });
        }

        for (field, price) in [
            ("game.observation_price", self.observation_price),
            ("game.extra_observation_price", self.extra_observation_price),
        ] {
            if !price.is_finite() || price < 0.0 {
                return Err(ValidationError::InvalidField {
                    field: field.to_string(),
                    message: "price must be a non-negative number".to_string(),
                });
            }
        }

        let (field, values) = match &self.payoffs {
            Some(payoffs) => ("game.payoffs", payoffs),
            None => ("game.bonuses", &self.bonuses),
        };
        if values.len() != self.hypotheses.len() {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!(
                    "expected {} entries (one per hypothesis) but found {}",
                    self.hypotheses.len(),
                    values.len()
                ),
            });
        }
        if values.iter().any(|value| !value.is_finite()) {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: "entries must be finite".to_string(),
            });
        }

        Ok(())
    }
}

fn default_hypotheses() -> Vec<f64> {
    HypothesisSpace::STANDARD.to_vec()
}

fn default_observations() -> u32 {
    DEFAULT_OBSERVATIONS
}

fn default_observation_price() -> f64 {
    DEFAULT_OBSERVATION_PRICE
}

fn default_extra_observation_price() -> f64 {
    DEFAULT_EXTRA_OBSERVATION_PRICE
}

fn default_bonuses() -> Vec<f64> {
    DEFAULT_BONUSES.to_vec()
}

/// Trial count and RNG seed.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrialsConfig {
    pub count: usize,
    pub seed: Option<u64>,
}

impl TrialsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: "trials.count".to_string(),
                message: "number of trials must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Which prior a strategy bets with.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriorChoice {
    #[default]
    Implied,
    Uniform,
    Custom,
}

/// Definition of a competing strategy.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StrategyConfig {
    pub name: String,
    pub policy: PolicyKind,
    #[serde(default)]
    pub betting_prior: PriorChoice,
    /// Required when `betting_prior` is `custom`.
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

impl StrategyConfig {
    fn new(name: &str, policy: PolicyKind, betting_prior: PriorChoice) -> Self {
        Self {
            name: name.to_string(),
            policy,
            betting_prior,
            weights: None,
        }
    }

    /// Betting prior for this strategy under `game`.
    pub fn resolve_prior(&self, game: &GameConfig) -> Vec<f64> {
        match self.betting_prior {
            PriorChoice::Implied => game.implied_prior(),
            PriorChoice::Uniform => {
                let share = 1.0 / game.hypotheses.len() as f64;
                vec![share; game.hypotheses.len()]
            }
            PriorChoice::Custom => self.weights.clone().unwrap_or_default(),
        }
    }
}

fn default_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::new("optimal", PolicyKind::EvOptimal, PriorChoice::Implied),
        StrategyConfig::new(
            "uniform_extra_map",
            PolicyKind::AlwaysExtraMap,
            PriorChoice::Uniform,
        ),
        StrategyConfig::new(
            "implied_extra_map",
            PolicyKind::AlwaysExtraMap,
            PriorChoice::Implied,
        ),
    ]
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Metrics configuration block.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MetricsConfig {
    /// Strategy the others are compared against; defaults to the first one.
    #[serde(default)]
    pub baseline: Option<String>,
}

impl MetricsConfig {
    fn normalize(&mut self, strategies: &[StrategyConfig]) -> Result<(), ValidationError> {
        match self.baseline.as_ref() {
            Some(baseline) => {
                if !strategies.iter().any(|s| &s.name == baseline) {
                    return Err(ValidationError::InvalidField {
                        field: "metrics.baseline".to_string(),
                        message: format!(
                            "baseline strategy '{baseline}' is not defined in strategies list"
                        ),
                    });
                }
            }
            None => self.baseline = strategies.first().map(|s| s.name.clone()),
        }
        Ok(())
    }

    pub fn baseline(&self) -> &str {
        self.baseline.as_deref().unwrap_or_default()
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) -> Result<(), ValidationError> {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
        if self.level().is_none() {
            return Err(ValidationError::InvalidField {
                field: "logging.tracing_level".to_string(),
                message: format!(
                    "unknown level '{}'; expected trace, debug, info, warn or error",
                    self.tracing_level
                ),
            });
        }
        Ok(())
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_strategies(
    strategies: &[StrategyConfig],
    hypotheses: usize,
) -> Result<(), ValidationError> {
    if strategies.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "strategies".to_string(),
            message: "at least one strategy must be specified".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for strategy in strategies {
        if strategy.name.trim().is_empty()
            || !strategy.name.chars().all(|c| RUN_ID_ALLOWED.contains(c))
        {
            return Err(ValidationError::InvalidField {
                field: format!("strategies[{}].name", strategy.name),
                message: "strategy name must be non-empty and use only [A-Za-z0-9._-]"
                    .to_string(),
            });
        }

        if !seen.insert(strategy.name.as_str()) {
            return Err(ValidationError::InvalidField {
                field: "strategies".to_string(),
                message: format!("strategy name '{}' defined more than once", strategy.name),
            });
        }

        let field = format!("strategies[{}].weights", strategy.name);
        match (strategy.betting_prior, strategy.weights.as_ref()) {
            (PriorChoice::Custom, None) => {
                return Err(ValidationError::InvalidField {
                    field,
                    message: "custom betting prior requires weights".to_string(),
                });
            }
            (PriorChoice::Custom, Some(weights)) => {
                if weights.len() != hypotheses {
                    return Err(ValidationError::InvalidField {
                        field,
                        message: format!(
                            "expected {hypotheses} weights but found {}",
                            weights.len()
                        ),
                    });
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(ValidationError::InvalidField {
                        field,
                        message: "weights must be finite and non-negative".to_string(),
                    });
                }
                if weights.iter().all(|w| *w == 0.0) {
                    return Err(ValidationError::InvalidField {
                        field,
                        message: "weights must not all be zero".to_string(),
                    });
                }
            }
            (_, Some(_)) => {
                return Err(ValidationError::InvalidField {
                    field,
                    message: "weights are only used with a custom betting prior".to_string(),
                });
            }
            (_, None) => {}
        }
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

impl ResolvedOutputs {
    /// Directory holding the summary and structured logs.
    pub fn summary_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
