use super::InferenceError;
use crate::model::{HypothesisSpace, Observation};
use serde::Serialize;

/// Scales `weights` to sum to one.
///
/// A zero (or NaN) total is replaced by a divisor of one, so an all-zero
/// input comes back as the zero vector instead of NaNs.
pub fn normalize(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    let divisor = if total == 0.0 || total.is_nan() {
        1.0
    } else {
        total
    };
    weights.iter().map(|weight| weight / divisor).collect()
}

/// True when a distribution carries no mass at all.
pub fn is_degenerate(distribution: &[f64]) -> bool {
    distribution.iter().all(|weight| *weight == 0.0)
}

/// Stateless Bayesian engine bound to one hypothesis space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceEngine {
    space: HypothesisSpace,
}

impl InferenceEngine {
    pub fn new(space: HypothesisSpace) -> Self {
        Self { space }
    }

    pub fn space(&self) -> &HypothesisSpace {
        &self.space
    }

    /// Posterior over the hypotheses after a binomial observation.
    ///
    /// Likelihoods are combined in log space and shifted by their maximum
    /// before exponentiating, so long observations neither overflow nor
    /// underflow. The binomial coefficient is shared by every hypothesis and
    /// cancels under normalization.
    pub fn compute_posterior(
        &self,
        prior: &[f64],
        observation: Observation,
    ) -> Result<Vec<f64>, InferenceError> {
        self.space.check_weights("prior", prior)?;
        let n = observation.draws();
        let k = observation.successes();
        let log_weights: Vec<f64> = self
            .space
            .values()
            .iter()
            .zip(prior)
            .map(|(theta, weight)| {
                log_power(*theta, k) + log_power(1.0 - theta, n - k) + weight.ln()
            })
            .collect();
        let peak = log_weights
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if peak == f64::NEG_INFINITY {
            return Ok(vec![0.0; log_weights.len()]);
        }
        let shifted: Vec<f64> = log_weights
            .iter()
            .map(|log_weight| (log_weight - peak).exp())
            .collect();
        Ok(normalize(&shifted))
    }

    /// Posterior after a single extra draw that came up `success`.
    pub fn branch_posterior(
        &self,
        posterior: &[f64],
        success: bool,
    ) -> Result<Vec<f64>, InferenceError> {
        self.space.check_weights("posterior", posterior)?;
        Ok(self.reweight(posterior, success))
    }

    /// Predictive probability that the next draw is a success.
    pub fn predictive_success(&self, posterior: &[f64]) -> Result<f64, InferenceError> {
        self.space.check_weights("posterior", posterior)?;
        Ok(self.success_mass(posterior))
    }

    pub(super) fn reweight(&self, posterior: &[f64], success: bool) -> Vec<f64> {
        let weighted: Vec<f64> = posterior
            .iter()
            .zip(self.space.values())
            .map(|(weight, theta)| {
                if success {
                    weight * theta
                } else {
                    weight * (1.0 - theta)
                }
            })
            .collect();
        normalize(&weighted)
    }

    pub(super) fn success_mass(&self, posterior: &[f64]) -> f64 {
        posterior
            .iter()
            .zip(self.space.values())
            .map(|(weight, theta)| weight * theta)
            .sum()
    }
}

/// `exponent * ln(base)`, with `0^0 = 1` and `ln 0 = -inf`.
fn log_power(base: f64, exponent: u32) -> f64 {
    if exponent == 0 {
        0.0
    } else if base <= 0.0 {
        f64::NEG_INFINITY
    } else {
        f64::from(exponent) * base.ln()
    }
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::new(HypothesisSpace::standard())
    }
}
