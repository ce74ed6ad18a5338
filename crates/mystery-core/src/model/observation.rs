use crate::inference::InferenceError;
use serde::Serialize;

/// A batch of Bernoulli draws: `successes` reds out of `draws` balls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Observation {
    draws: u32,
    successes: u32,
}

impl Observation {
    pub fn new(draws: u32, successes: u32) -> Result<Self, InferenceError> {
        if successes > draws {
            return Err(InferenceError::InvalidObservation { draws, successes });
        }
        Ok(Self { draws, successes })
    }

    pub const fn empty() -> Self {
        Self {
            draws: 0,
            successes: 0,
        }
    }

    /// Counts the `true` entries of a draw sequence as successes.
    pub fn from_outcomes(outcomes: &[bool]) -> Self {
        let successes = outcomes.iter().filter(|outcome| **outcome).count();
        Self {
            draws: outcomes.len() as u32,
            successes: successes as u32,
        }
    }

    pub const fn draws(&self) -> u32 {
        self.draws
    }

    pub const fn successes(&self) -> u32 {
        self.successes
    }

    pub const fn failures(&self) -> u32 {
        self.draws - self.successes
    }

    /// Observation extended by one more draw.
    pub const fn with_draw(self, success: bool) -> Self {
        Self {
            draws: self.draws + 1,
            successes: self.successes + success as u32,
        }
    }

    /// Fraction of successes, or zero when nothing was drawn.
    pub fn proportion(&self) -> f64 {
        if self.draws == 0 {
            0.0
        } else {
            f64::from(self.successes) / f64::from(self.draws)
        }
    }
}
