pub mod hypothesis;
pub mod observation;
pub mod payoff;

pub use hypothesis::HypothesisSpace;
pub use observation::Observation;
