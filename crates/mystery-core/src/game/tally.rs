use super::round::RoundOutcome;
use serde::Serialize;

/// Running session totals. Lives only as long as its owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tally {
    rounds: u32,
    winnings: f64,
    losses: f64,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &RoundOutcome) {
        self.record_net(outcome.net);
    }

    pub fn record_net(&mut self, net: f64) {
        self.rounds += 1;
        if net > 0.0 {
            self.winnings += net;
        } else if net < 0.0 {
            self.losses += net.abs();
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn winnings(&self) -> f64 {
        self.winnings
    }

    pub fn losses(&self) -> f64 {
        self.losses
    }

    pub fn net(&self) -> f64 {
        self.winnings - self.losses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_wins_and_losses() {
        let mut tally = Tally::new();
        tally.record_net(24.5);
        tally.record_net(-5.5);
        tally.record_net(0.0);
        assert_eq!(tally.rounds(), 3);
        assert_eq!(tally.winnings(), 24.5);
        assert_eq!(tally.losses(), 5.5);
        assert_eq!(tally.net(), 19.0);
    }
}
