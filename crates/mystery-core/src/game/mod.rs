//! The interactive game surface.
//!
//! - `grid`: laying out boxes in proportion to a prior.
//! - `round`: one round as an explicit state machine with advisory output.
//! - `tally`: session winnings and losses.

pub mod grid;
pub mod round;
pub mod tally;

pub use grid::{BoxGrid, allocate_counts};
pub use round::{Recommendation, RoundConfig, RoundError, RoundOutcome, RoundPhase, RoundState};
pub use tally::Tally;
