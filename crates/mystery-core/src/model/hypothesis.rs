use crate::inference::InferenceError;
use serde::Serialize;

/// Largest distance at which a guessed value still names a hypothesis.
const MATCH_TOLERANCE: f64 = 0.01;

/// Ordered, finite set of candidate success rates for the hidden box.
///
/// Every weight vector used by the engine (priors, posteriors, payoffs) is
/// aligned positionally with this set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisSpace {
    values: Vec<f64>,
}

impl HypothesisSpace {
    /// Proportions of red balls used by the classic game.
    pub const STANDARD: [f64; 3] = [0.25, 0.50, 0.75];

    pub fn new(values: Vec<f64>) -> Result<Self, InferenceError> {
        if values.is_empty() {
            return Err(InferenceError::EmptyHypotheses);
        }
        if let Some((index, value)) = values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, value)| !value.is_finite() || !(0.0..=1.0).contains(value))
        {
            return Err(InferenceError::InvalidHypothesis { index, value });
        }
        Ok(Self { values })
    }

    pub fn standard() -> Self {
        Self {
            values: Self::STANDARD.to_vec(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Index of the first hypothesis within tolerance of `value`.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        self.values
            .iter()
            .position(|candidate| (candidate - value).abs() < MATCH_TOLERANCE)
    }

    pub fn uniform_prior(&self) -> Vec<f64> {
        let share = 1.0 / self.values.len() as f64;
        vec![share; self.values.len()]
    }

    pub(crate) fn check_aligned(
        &self,
        field: &'static str,
        weights: &[f64],
    ) -> Result<(), InferenceError> {
        if weights.len() != self.values.len() {
            return Err(InferenceError::MismatchedLengths {
                field,
                expected: self.values.len(),
                found: weights.len(),
            });
        }
        Ok(())
    }

    /// Aligned, finite and non-negative.
    pub(crate) fn check_weights(
        &self,
        field: &'static str,
        weights: &[f64],
    ) -> Result<(), InferenceError> {
        self.check_aligned(field, weights)?;
        match weights
            .iter()
            .copied()
            .enumerate()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            Some((index, value)) => Err(InferenceError::InvalidWeight {
                field,
                index,
                value,
            }),
            None => Ok(()),
        }
    }

    /// Aligned and finite; payoffs may be negative.
    pub(crate) fn check_payoffs(&self, payoffs: &[f64]) -> Result<(), InferenceError> {
        self.check_aligned("payoffs", payoffs)?;
        match payoffs
            .iter()
            .copied()
            .enumerate()
            .find(|(_, value)| !value.is_finite())
        {
            Some((index, value)) => Err(InferenceError::InvalidWeight {
                field: "payoffs",
                index,
                value,
            }),
            None => Ok(()),
        }
    }
}

impl Default for HypothesisSpace {
    fn default() -> Self {
        Self::standard()
    }
}
