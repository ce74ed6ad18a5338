/// `C(n, k)` via the multiplicative formula, reducing `k` to `min(k, n - k)`.
///
/// Returns zero when `k > n`.
pub fn binomial_coefficient(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut coefficient = 1.0_f64;
    for i in 0..k {
        coefficient = coefficient * f64::from(n - i) / f64::from(i + 1);
    }
    coefficient
}

/// Probability of exactly `k` successes in `n` draws at rate `p`.
pub fn binomial_pmf(n: u32, k: u32, p: f64) -> f64 {
    if k > n {
        return 0.0;
    }
    binomial_coefficient(n, k) * p.powf(f64::from(k)) * (1.0 - p).powf(f64::from(n - k))
}
