use crate::inference::InferenceError;
use std::fmt;

/// Errors that stop a simulation before (or while) it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    InvalidTrialCount { requested: usize },
    Inference(InferenceError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::InvalidTrialCount { requested } => {
                write!(f, "number of trials must be at least 1 (got {requested})")
            }
            SimulationError::Inference(err) => write!(f, "invalid simulation input: {err}"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Inference(err) => Some(err),
            SimulationError::InvalidTrialCount { .. } => None,
        }
    }
}

impl From<InferenceError> for SimulationError {
    fn from(err: InferenceError) -> Self {
        SimulationError::Inference(err)
    }
}
