use super::{InferenceEngine, InferenceError};
use serde::Serialize;

/// Value of buying exactly one more draw before guessing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraObservationOption {
    /// Branch-weighted best expected payoff minus committed and extra cost.
    pub net_expected_value: f64,
    /// Predictive probability that the extra draw is a success.
    pub success_probability: f64,
    pub posterior_if_positive: Vec<f64>,
    pub posterior_if_negative: Vec<f64>,
}

impl InferenceEngine {
    /// One-step lookahead on a single extra draw.
    ///
    /// Buying is worthwhile iff the returned `net_expected_value` exceeds
    /// `best_decision(..).expected - committed_cost`.
    pub fn evaluate_extra_observation(
        &self,
        posterior: &[f64],
        payoffs: &[f64],
        committed_cost: f64,
        extra_cost: f64,
    ) -> Result<ExtraObservationOption, InferenceError> {
        self.space().check_weights("posterior", posterior)?;
        self.space().check_payoffs(payoffs)?;
        check_cost("committed_cost", committed_cost)?;
        check_cost("extra_cost", extra_cost)?;

        let p_positive = self.success_mass(posterior);
        let p_negative = 1.0 - p_positive;

        let posterior_if_positive = self.reweight(posterior, true);
        let posterior_if_negative = self.reweight(posterior, false);

        let best_positive = self.decide(&posterior_if_positive, payoffs).expected;
        let best_negative = self.decide(&posterior_if_negative, payoffs).expected;

        let net_expected_value = p_positive * best_positive + p_negative * best_negative
            - (committed_cost + extra_cost);

        Ok(ExtraObservationOption {
            net_expected_value,
            success_probability: p_positive,
            posterior_if_positive,
            posterior_if_negative,
        })
    }
}

fn check_cost(field: &'static str, value: f64) -> Result<(), InferenceError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InferenceError::InvalidWeight {
            field,
            index: 0,
            value,
        })
    }
}
