use std::fmt;

/// Errors raised when inference inputs do not describe a valid problem.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    EmptyHypotheses,
    InvalidHypothesis {
        index: usize,
        value: f64,
    },
    MismatchedLengths {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    InvalidWeight {
        field: &'static str,
        index: usize,
        value: f64,
    },
    InvalidObservation {
        draws: u32,
        successes: u32,
    },
    ZeroMass {
        field: &'static str,
    },
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::EmptyHypotheses => {
                write!(f, "hypothesis space must contain at least one value")
            }
            InferenceError::InvalidHypothesis { index, value } => {
                write!(f, "hypothesis {index} has value {value}, expected a probability in [0, 1]")
            }
            InferenceError::MismatchedLengths {
                field,
                expected,
                found,
            } => write!(
                f,
                "{field} has {found} entries but the hypothesis space has {expected}"
            ),
            InferenceError::InvalidWeight {
                field,
                index,
                value,
            } => write!(f, "{field}[{index}] = {value} is not a valid weight"),
            InferenceError::InvalidObservation { draws, successes } => write!(
                f,
                "observation reports {successes} successes out of {draws} draws"
            ),
            InferenceError::ZeroMass { field } => {
                write!(f, "{field} must carry some positive weight")
            }
        }
    }
}

impl std::error::Error for InferenceError {}
