//! Least-squares solver with optional ridge pseudo-rows.
//!
//! The forecaster solves one regression of the form:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2 + Σ_j (λ_j β_j)^2
//! ```
//!
//! The penalty is expressed as extra rows `λ_j e_j` with target `0` appended
//! to the design matrix, so a single SVD solve handles both the data and the
//! Gaussian priors on the coefficients.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve least squares with per-coefficient ridge weights.
///
/// `penalties[j] == 0.0` leaves coefficient `j` unpenalized.
///
/// # Panics
/// Panics if `penalties.len() != x.ncols()`.
pub fn solve_ridge(x: &DMatrix<f64>, y: &DVector<f64>, penalties: &[f64]) -> Option<DVector<f64>> {
    assert_eq!(penalties.len(), x.ncols(), "one penalty per design column");

    let n = x.nrows();
    let p = x.ncols();
    let active: Vec<(usize, f64)> = penalties
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, w)| *w > 0.0)
        .collect();

    let rows = n + active.len();
    let mut xa = DMatrix::<f64>::zeros(rows, p);
    let mut ya = DVector::<f64>::zeros(rows);

    xa.view_mut((0, 0), (n, p)).copy_from(x);
    ya.rows_mut(0, n).copy_from(y);
    for (k, (j, w)) in active.into_iter().enumerate() {
        xa[(n + k, j)] = w;
    }

    solve_least_squares(&xa, &ya)
}
