use crate::inference::{InferenceEngine, InferenceError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inputs a policy sees at each decision point of a trial.
pub struct PolicyContext<'a> {
    pub engine: &'a InferenceEngine,
    pub posterior: &'a [f64],
    pub payoffs: &'a [f64],
    /// Cost already sunk into the initial draws.
    pub committed_cost: f64,
    /// Price of one additional draw.
    pub extra_cost: f64,
}

/// Whether to buy one more draw, and where the posterior goes if so.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraObservationPlan {
    Decline,
    Purchase {
        posterior_if_positive: Vec<f64>,
        posterior_if_negative: Vec<f64>,
    },
}

impl ExtraObservationPlan {
    pub fn is_purchase(&self) -> bool {
        matches!(self, ExtraObservationPlan::Purchase { .. })
    }

    /// Posterior after the purchased draw came up `success`; `None` when declined.
    pub fn resolve(self, success: bool) -> Option<Vec<f64>> {
        match self {
            ExtraObservationPlan::Decline => None,
            ExtraObservationPlan::Purchase {
                posterior_if_positive,
                posterior_if_negative,
            } => Some(if success {
                posterior_if_positive
            } else {
                posterior_if_negative
            }),
        }
    }
}

/// Unified interface for guessing strategies.
pub trait DecisionPolicy: Send + Sync {
    fn kind(&self) -> PolicyKind;

    /// Called once after the initial draws.
    fn plan_extra_observation(
        &self,
        ctx: &PolicyContext<'_>,
    ) -> Result<ExtraObservationPlan, InferenceError>;

    /// Index of the guessed hypothesis under the final posterior.
    fn choose(&self, ctx: &PolicyContext<'_>) -> Result<usize, InferenceError>;
}

/// Built-in policies, addressable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Buy a draw only when the lookahead says it pays, then guess by expected value.
    #[serde(rename = "ev", alias = "ev_optimal")]
    EvOptimal,
    /// Always buy one draw, then guess the most likely box.
    #[serde(rename = "always_extra_map")]
    AlwaysExtraMap,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 2] = [PolicyKind::EvOptimal, PolicyKind::AlwaysExtraMap];

    pub const fn label(self) -> &'static str {
        match self {
            PolicyKind::EvOptimal => "ev",
            PolicyKind::AlwaysExtraMap => "always_extra_map",
        }
    }

    pub fn spawn(self) -> Box<dyn DecisionPolicy> {
        match self {
            PolicyKind::EvOptimal => Box::new(EvOptimalPolicy),
            PolicyKind::AlwaysExtraMap => Box::new(AlwaysExtraMapPolicy),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EvOptimalPolicy;

impl DecisionPolicy for EvOptimalPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::EvOptimal
    }

    fn plan_extra_observation(
        &self,
        ctx: &PolicyContext<'_>,
    ) -> Result<ExtraObservationPlan, InferenceError> {
        let now = ctx.engine.best_decision(ctx.posterior, ctx.payoffs)?;
        let net_now = now.expected - ctx.committed_cost;
        let option = ctx.engine.evaluate_extra_observation(
            ctx.posterior,
            ctx.payoffs,
            ctx.committed_cost,
            ctx.extra_cost,
        )?;
        if option.net_expected_value > net_now {
            Ok(ExtraObservationPlan::Purchase {
                posterior_if_positive: option.posterior_if_positive,
                posterior_if_negative: option.posterior_if_negative,
            })
        } else {
            Ok(ExtraObservationPlan::Decline)
        }
    }

    fn choose(&self, ctx: &PolicyContext<'_>) -> Result<usize, InferenceError> {
        Ok(ctx.engine.best_decision(ctx.posterior, ctx.payoffs)?.index)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysExtraMapPolicy;

impl DecisionPolicy for AlwaysExtraMapPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::AlwaysExtraMap
    }

    fn plan_extra_observation(
        &self,
        ctx: &PolicyContext<'_>,
    ) -> Result<ExtraObservationPlan, InferenceError> {
        Ok(ExtraObservationPlan::Purchase {
            posterior_if_positive: ctx.engine.branch_posterior(ctx.posterior, true)?,
            posterior_if_negative: ctx.engine.branch_posterior(ctx.posterior, false)?,
        })
    }

    fn choose(&self, ctx: &PolicyContext<'_>) -> Result<usize, InferenceError> {
        Ok(ctx.engine.most_likely(ctx.posterior)?.index)
    }
}
