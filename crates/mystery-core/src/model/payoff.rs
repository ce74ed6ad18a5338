//! Prize schedule helpers: gross payoffs and the probabilities they imply.

/// Net bonuses over the entry cost paid for a correct guess in the classic game.
pub const DEFAULT_BONUSES: [f64; 3] = [5.0, 10.0, 25.0];

/// Cost of the initial batch of draws.
pub fn base_cost(observation_price: f64, observations: u32) -> f64 {
    observation_price * f64::from(observations)
}

/// Gross payoff per hypothesis: the bonus plus a refund of the base cost.
pub fn gross_payoffs(bonuses: &[f64], base_cost: f64) -> Vec<f64> {
    bonuses.iter().map(|bonus| bonus + base_cost).collect()
}

/// Converts payoffs into the probabilities at which each would be a fair bet.
///
/// Each positive payoff implies `base_cost / payoff`; the results are
/// renormalized to sum to one. When nothing is implied (every payoff
/// non-positive, or a zero base cost) the result is uniform.
pub fn implied_probabilities(payoffs: &[f64], base_cost: f64) -> Vec<f64> {
    let raw: Vec<f64> = payoffs
        .iter()
        .map(|payoff| {
            if *payoff > 0.0 {
                base_cost / payoff
            } else {
                0.0
            }
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        raw.iter().map(|value| value / sum).collect()
    } else if payoffs.is_empty() {
        Vec::new()
    } else {
        vec![1.0 / payoffs.len() as f64; payoffs.len()]
    }
}
