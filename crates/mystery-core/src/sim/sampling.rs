//! Random draws used by the simulator and the interactive round.

use rand::Rng;

/// Uniform draw in `[0, 1)`.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.r#gen::<f64>()
}

/// Inverse-CDF sample of an index from `weights`.
///
/// Walks the running sum until it reaches a single uniform draw. If
/// rounding leaves the total just short of the draw, the last index is
/// returned.
pub fn sample_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    let draw = uniform(rng);
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if draw <= cumulative {
            return index;
        }
    }
    weights.len().saturating_sub(1)
}

/// One Bernoulli draw at rate `p`.
pub fn draw_success<R: Rng + ?Sized>(p: f64, rng: &mut R) -> bool {
    uniform(rng) < p
}

/// Number of successes in `n` independent draws at rate `p`.
pub fn draw_successes<R: Rng + ?Sized>(n: u32, p: f64, rng: &mut R) -> u32 {
    (0..n).filter(|_| draw_success(p, rng)).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rand::rngs::mock::StepRng;

    #[test]
    fn sample_index_tracks_weights() {
        let mut rng = SmallRng::seed_from_u64(7);
        let weights = [0.5, 1.0 / 3.0, 1.0 / 6.0];
        let mut counts = [0usize; 3];
        for _ in 0..30_000 {
            counts[sample_index(&weights, &mut rng)] += 1;
        }
        let freq: Vec<f64> = counts.iter().map(|c| *c as f64 / 30_000.0).collect();
        for (observed, expected) in freq.iter().zip(weights) {
            assert!(
                (observed - expected).abs() < 0.02,
                "{freq:?} vs {weights:?}"
            );
        }
    }

    #[test]
    fn short_cumulative_sum_returns_last_index() {
        // A constant stream of u64::MAX produces a draw just below one.
        let mut rng = StepRng::new(u64::MAX, 0);
        assert_eq!(sample_index(&[0.3, 0.3, 0.3], &mut rng), 2);
        assert_eq!(sample_index(&[0.0, 0.0], &mut rng), 1);
    }

    #[test]
    fn zero_draw_returns_first_index_even_with_zero_weight() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(sample_index(&[0.0, 0.4, 0.6], &mut rng), 0);
        assert_eq!(uniform(&mut rng), 0.0);
    }

    #[test]
    fn certain_rates_are_respected() {
        let mut rng = SmallRng::seed_from_u64(3);
        assert_eq!(draw_successes(20, 1.0, &mut rng), 20);
        assert_eq!(draw_successes(20, 0.0, &mut rng), 0);
        assert_eq!(draw_successes(0, 0.5, &mut rng), 0);
    }
}
