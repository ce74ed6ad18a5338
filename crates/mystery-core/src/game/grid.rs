use rand::Rng;
use rand::seq::SliceRandom;

/// Number of boxes laid out for the player to pick from.
pub const DEFAULT_BOX_COUNT: usize = 100;

/// Splits `total` boxes across hypotheses in proportion to `weights`.
///
/// Largest-remainder apportionment: every share is floored, then the
/// leftover boxes go one at a time to the largest fractional parts,
/// cycling if needed. Non-finite or negative weights count as zero. The
/// result always sums to `total` (or is empty when `weights` is).
pub fn allocate_counts(weights: &[f64], total: usize) -> Vec<usize> {
    if weights.is_empty() {
        return Vec::new();
    }

    let cleaned: Vec<f64> = weights
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();
    let sum: f64 = cleaned.iter().sum();
    let divisor = if sum > 0.0 { sum } else { 1.0 };

    let mut counts = Vec::with_capacity(cleaned.len());
    let mut remainders = Vec::with_capacity(cleaned.len());
    for (index, weight) in cleaned.iter().enumerate() {
        let exact = weight / divisor * total as f64;
        let floor = exact.floor();
        counts.push(floor as usize);
        remainders.push((index, exact - floor));
    }

    // Stable sort keeps index order among equal remainders.
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut used: usize = counts.iter().sum();
    let mut cursor = 0;
    while used < total {
        counts[remainders[cursor].0] += 1;
        used += 1;
        cursor = (cursor + 1) % remainders.len();
    }

    counts
}

/// Shuffled row of boxes, each holding the index of its hypothesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxGrid {
    cells: Vec<usize>,
}

impl BoxGrid {
    pub fn build<R: Rng + ?Sized>(weights: &[f64], total: usize, rng: &mut R) -> Self {
        let mut cells = Vec::with_capacity(total);
        for (index, count) in allocate_counts(weights, total).into_iter().enumerate() {
            cells.extend(std::iter::repeat_n(index, count));
        }
        cells.shuffle(rng);
        Self { cells }
    }

    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Hypothesis index hidden in the box at `position`.
    pub fn hypothesis_at(&self, position: usize) -> Option<usize> {
        self.cells.get(position).copied()
    }

    /// Number of boxes holding each hypothesis.
    pub fn counts(&self, hypotheses: usize) -> Vec<usize> {
        let mut counts = vec![0; hypotheses];
        for &cell in &self.cells {
            if let Some(slot) = counts.get_mut(cell) {
                *slot += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn implied_prior_splits_hundred_boxes() {
        assert_eq!(allocate_counts(&[0.5, 1.0 / 3.0, 1.0 / 6.0], 100), vec![50, 33, 17]);
    }

    #[test]
    fn counts_always_sum_to_total() {
        for weights in [
            vec![1.0, 1.0, 1.0],
            vec![0.2, 0.0, 0.8],
            vec![3.0, f64::NAN, -2.0],
            vec![0.0, 0.0],
        ] {
            for total in [0, 1, 7, 100] {
                let counts = allocate_counts(&weights, total);
                assert_eq!(counts.iter().sum::<usize>(), total, "{weights:?} / {total}");
            }
        }
        assert!(allocate_counts(&[], 10).is_empty());
    }

    #[test]
    fn zero_weights_are_dealt_round_robin() {
        assert_eq!(allocate_counts(&[0.0, 0.0, 0.0], 4), vec![2, 1, 1]);
    }

    #[test]
    fn grid_is_shuffled_but_keeps_counts() {
        let weights = [0.5, 1.0 / 3.0, 1.0 / 6.0];
        let mut rng = SmallRng::seed_from_u64(17);
        let grid = BoxGrid::build(&weights, DEFAULT_BOX_COUNT, &mut rng);
        assert_eq!(grid.len(), 100);
        assert_eq!(grid.counts(3), vec![50, 33, 17]);
        let sorted = {
            let mut cells = grid.cells().to_vec();
            cells.sort_unstable();
            cells
        };
        assert_ne!(grid.cells(), sorted.as_slice());
        assert_eq!(grid.hypothesis_at(100), None);
    }
}
