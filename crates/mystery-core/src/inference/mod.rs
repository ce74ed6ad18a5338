//! Bayesian updating and expected-value decisions over a finite hypothesis space.
//!
//! - `binomial`: coefficient and probability mass helpers.
//! - `posterior`: normalization and the [`InferenceEngine`] update rules.
//! - `decision`: EV-optimal and most-likely selections.
//! - `lookahead`: one-step value of buying another observation.

mod binomial;
mod decision;
mod error;
mod lookahead;
mod posterior;

pub use binomial::{binomial_coefficient, binomial_pmf};
pub use decision::{Decision, Estimate};
pub use error::InferenceError;
pub use lookahead::ExtraObservationOption;
pub use posterior::{InferenceEngine, is_degenerate, normalize};
