//! The Poisson distribution, evaluated over small non-negative counts.

/// `k!` as a float. Exact for every `k` this module is ever asked about.
#[inline]
pub fn factorial(k: u8) -> f64 {
    (2..=k as u64).map(|i| i as f64).product()
}

/// Probability of exactly `k` events, given a mean rate of `lambda`.
#[inline]
pub fn univariate(k: u8, lambda: f64) -> f64 {
    lambda.powi(k as i32) * f64::exp(-lambda) / factorial(k)
}

/// Probabilities of `0..=max_k` events, given a mean rate of `lambda`. Successive terms
/// are derived by recurrence. The tail beyond `max_k` is left out, so the terms sum to
/// slightly less than 1.
pub fn series(lambda: f64, max_k: u8) -> Vec<f64> {
    assert!(lambda >= 0.0, "rate cannot be negative (got {lambda})");
    let mut probs = Vec::with_capacity(max_k as usize + 1);
    let mut term = f64::exp(-lambda);
    probs.push(term);
    for k in 1..=max_k {
        term *= lambda / k as f64;
        probs.push(term);
    }
    probs
}
