use mystery_core::sim::{DecisionPolicy, PolicyKind};

use crate::config::{GameConfig, StrategyConfig};

/// A configured strategy with its betting prior resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyBlueprint {
    pub name: String,
    pub policy: PolicyKind,
    pub betting_prior: Vec<f64>,
}

impl StrategyBlueprint {
    pub fn from_configs(configs: &[StrategyConfig], game: &GameConfig) -> Vec<Self> {
        configs
            .iter()
            .map(|config| Self::from_config(config, game))
            .collect()
    }

    pub fn from_config(config: &StrategyConfig, game: &GameConfig) -> Self {
        Self {
            name: config.name.clone(),
            policy: config.policy,
            betting_prior: config.resolve_prior(game),
        }
    }

    pub fn spawn_policy(&self) -> Box<dyn DecisionPolicy> {
        self.policy.spawn()
    }
}
