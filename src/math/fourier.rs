//! Fourier basis for periodic effects.
//!
//! A seasonality of period `P` (days) and order `N` contributes `2N` columns:
//!
//! - `sin(2π k t / P)`, `cos(2π k t / P)` for `k = 1..=N`
//!
//! where `t` is measured in days since the Unix epoch, so the phase of a
//! given calendar date does not depend on where the history starts.

use std::f64::consts::PI;

/// Fill `out` with the `2 * order` Fourier features at time `t_days`.
///
/// # Panics
/// Panics if `out.len() != 2 * order`.
pub fn fill_fourier_row(t_days: f64, period_days: f64, order: usize, out: &mut [f64]) {
    assert_eq!(out.len(), 2 * order, "fourier row width must be 2 * order");
    for k in 1..=order {
        let arg = 2.0 * PI * k as f64 * t_days / period_days;
        out[2 * (k - 1)] = arg.sin();
        out[2 * (k - 1) + 1] = arg.cos();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_repeat_after_one_period() {
        let mut a = vec![0.0; 6];
        let mut b = vec![0.0; 6];
        fill_fourier_row(3.25, 7.0, 3, &mut a);
        fill_fourier_row(10.25, 7.0, 3, &mut b);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn features_are_bounded() {
        let mut row = vec![0.0; 20];
        for day in [0.0, 17.5, 365.25, 19_000.0] {
            fill_fourier_row(day, 365.25, 10, &mut row);
            assert!(row.iter().all(|v| v.is_finite() && v.abs() <= 1.0 + 1e-12));
        }
    }
}
