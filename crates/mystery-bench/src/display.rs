const FRACTION_DENOMINATORS: [u32; 9] = [2, 3, 4, 5, 6, 8, 10, 12, 16];

/// Closest `n/d` to `value` over a small set of friendly denominators.
///
/// Starts from `1/1`; earlier denominators win ties.
pub fn approx_fraction(value: f64) -> (u32, u32) {
    let mut best = (1, 1);
    let mut best_err = (value - 1.0).abs();
    for d in FRACTION_DENOMINATORS {
        let n = (value * f64::from(d)).round().max(0.0);
        let err = (value - n / f64::from(d)).abs();
        if err < best_err {
            best = (n as u32, d);
            best_err = err;
        }
    }
    best
}

/// Renders a probability as `"0.333 (1/3)"`, or `"-"` when not positive.
pub fn format_probability(value: f64) -> String {
    if !value.is_finite() || value <= 0.0 {
        return "-".to_string();
    }
    let (n, d) = approx_fraction(value);
    format!("{value:.3} ({n}/{d})")
}
