//! Piecewise-linear trend with changepoints.
//!
//! With scaled time `t ∈ [0, 1]` over the history, the trend is
//!
//! ```text
//! g(t) = m + k t + Σ_j δ_j (t - s_j)_+
//! ```
//!
//! so the slope changes by `δ_j` at changepoint `s_j` while the curve stays
//! continuous.

/// Indices (into sorted history) of potential changepoints.
///
/// Up to `n_changepoints` are placed uniformly over the first
/// `changepoint_range` fraction of the history; the first point is never used.
pub fn changepoint_indices(n: usize, n_changepoints: usize, changepoint_range: f64) -> Vec<usize> {
    let hist_size = (n as f64 * changepoint_range.clamp(0.0, 1.0)).floor() as usize;
    let count = n_changepoints.min(hist_size.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    let last = (hist_size - 1) as f64;
    (1..=count)
        .map(|i| (i as f64 * last / count as f64).round() as usize)
        .collect()
}

/// Evaluate the trend at scaled time `t`.
pub fn piecewise_linear(t: f64, k: f64, m: f64, deltas: &[f64], changepoints: &[f64]) -> f64 {
    let bends: f64 = deltas
        .iter()
        .zip(changepoints)
        .map(|(d, s)| d * (t - s).max(0.0))
        .sum();
    m + k * t + bends
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changepoints_cover_first_eighty_percent() {
        let idx = changepoint_indices(100, 25, 0.8);
        assert_eq!(idx.len(), 25);
        assert_eq!(*idx.last().unwrap(), 79);
        assert!(idx.windows(2).all(|w| w[0] <= w[1]));
        assert!(idx[0] > 0);
    }

    #[test]
    fn changepoint_count_shrinks_for_short_history() {
        assert_eq!(changepoint_indices(10, 25, 0.8).len(), 7);
        assert!(changepoint_indices(2, 25, 0.8).is_empty());
        assert!(changepoint_indices(0, 25, 0.8).is_empty());
    }

    #[test]
    fn trend_bends_at_changepoint() {
        let deltas = [1.0];
        let cps = [0.5];
        assert!((piecewise_linear(0.25, 2.0, 1.0, &deltas, &cps) - 1.5).abs() < 1e-12);
        // slope 2 until 0.5, then 3
        assert!((piecewise_linear(1.0, 2.0, 1.0, &deltas, &cps) - 3.5).abs() < 1e-12);
    }
}
