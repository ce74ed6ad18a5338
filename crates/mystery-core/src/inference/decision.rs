use super::{InferenceEngine, InferenceError};
use serde::Serialize;

/// Expected-value optimal guess under a posterior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub index: usize,
    pub value: f64,
    pub expected: f64,
}

/// Maximum-a-posteriori guess, ignoring payoffs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub index: usize,
    pub value: f64,
    pub probability: f64,
}

impl InferenceEngine {
    /// Picks the hypothesis maximising `posterior[i] * payoffs[i]`.
    ///
    /// Comparison is strict, so the lowest index wins ties.
    pub fn best_decision(
        &self,
        posterior: &[f64],
        payoffs: &[f64],
    ) -> Result<Decision, InferenceError> {
        self.space().check_weights("posterior", posterior)?;
        self.space().check_payoffs(payoffs)?;
        Ok(self.decide(posterior, payoffs))
    }

    /// Picks the hypothesis with the largest posterior weight; lowest index wins ties.
    pub fn most_likely(&self, posterior: &[f64]) -> Result<Estimate, InferenceError> {
        self.space().check_weights("posterior", posterior)?;
        let index = argmax(posterior.iter().copied());
        Ok(Estimate {
            index,
            value: self.space().values()[index],
            probability: posterior[index],
        })
    }

    pub(super) fn decide(&self, posterior: &[f64], payoffs: &[f64]) -> Decision {
        let index = argmax(
            posterior
                .iter()
                .zip(payoffs)
                .map(|(weight, payoff)| weight * payoff),
        );
        Decision {
            index,
            value: self.space().values()[index],
            expected: posterior[index] * payoffs[index],
        }
    }
}

fn argmax(scores: impl Iterator<Item = f64>) -> usize {
    let mut best_index = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (index, score) in scores.enumerate() {
        if score > best_score {
            best_score = score;
            best_index = index;
        }
    }
    best_index
}
