//! Monte Carlo comparison of guessing policies.
//!
//! - `sampling`: inverse-CDF hypothesis sampling and Bernoulli draws.
//! - `policy`: the [`DecisionPolicy`] seam and its two built-in policies.
//! - `runner`: [`PolicySimulator`], which plays repeated trials.
//! - `result`: per-trial records and the aggregated [`SimulationRun`].

mod error;
mod policy;
mod result;
mod runner;
pub mod sampling;

pub use error::SimulationError;
pub use policy::{
    AlwaysExtraMapPolicy, DecisionPolicy, EvOptimalPolicy, ExtraObservationPlan, PolicyContext,
    PolicyKind,
};
pub use result::{SimulationRun, TrialResult};
pub use runner::{PolicySimulator, TrialPlan};
