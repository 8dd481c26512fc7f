//! Simulation-based uncertainty intervals.
//!
//! Each simulated path:
//! - keeps the fitted trend over the history (`t <= 1`)
//! - adds new changepoints beyond the history at the historical rate, with
//!   Laplace-distributed slope changes scaled by the mean fitted change
//! - adds Gaussian observation noise with the fitted residual scale
//!
//! Interval bounds are empirical quantiles across paths. Paths are simulated
//! in parallel; each path owns an RNG seeded from `(seed, path index)`, so the
//! output is deterministic for a given seed.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Binomial, Normal};
use rayon::prelude::*;

use super::trend::piecewise_linear;
use crate::error::FitError;

/// Fitted trend parameters in scaled units.
#[derive(Debug, Clone)]
pub struct TrendParams<'a> {
    pub k: f64,
    pub m: f64,
    pub deltas: &'a [f64],
    pub changepoints: &'a [f64],
    /// Smallest positive gap between history time points (scaled).
    pub min_dt: f64,
}

/// Lower/upper bounds aligned with the evaluated time points.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Intervals {
    pub yhat: Band,
    pub trend: Band,
}

/// Simulation settings.
#[derive(Debug, Clone, Copy)]
pub struct SimulationSettings {
    pub samples: usize,
    pub interval_width: f64,
    pub sigma_obs: f64,
    pub seed: u64,
}

const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Simulate paths and return quantile bands (scaled units).
///
/// `trend` and `seasonal` hold the point estimates at `t`. With zero samples
/// the bands collapse to the point estimates.
pub fn simulate_intervals(
    params: &TrendParams<'_>,
    t: &[f64],
    trend: &[f64],
    seasonal: &[f64],
    settings: SimulationSettings,
) -> Result<Intervals, FitError> {
    let yhat: Vec<f64> = trend.iter().zip(seasonal).map(|(a, b)| a + b).collect();
    if settings.samples == 0 {
        return Ok(Intervals {
            yhat: Band {
                lower: yhat.clone(),
                upper: yhat,
            },
            trend: Band {
                lower: trend.to_vec(),
                upper: trend.to_vec(),
            },
        });
    }

    let noise = Normal::new(0.0, settings.sigma_obs.max(0.0))
        .map_err(|e| FitError::NonConvergent(format!("noise distribution error: {e}")))?;

    let paths: Vec<(Vec<f64>, Vec<f64>)> = (0..settings.samples)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(settings.seed ^ (i as u64).wrapping_mul(SEED_STRIDE));
            let trend_path = sample_trend(params, t, &mut rng)?;
            let y_path = trend_path
                .iter()
                .zip(seasonal)
                .map(|(g, s)| g + s + noise.sample(&mut rng))
                .collect();
            Ok((trend_path, y_path))
        })
        .collect::<Result<_, FitError>>()?;

    let width = settings.interval_width.clamp(0.0, 1.0);
    let q_lo = (1.0 - width) / 2.0;
    let q_hi = (1.0 + width) / 2.0;

    let trend_band = quantile_band(&paths, t.len(), q_lo, q_hi, |p| &p.0);
    let yhat_band = quantile_band(&paths, t.len(), q_lo, q_hi, |p| &p.1);

    Ok(Intervals {
        yhat: yhat_band,
        trend: trend_band,
    })
}

fn sample_trend(params: &TrendParams<'_>, t: &[f64], rng: &mut StdRng) -> Result<Vec<f64>, FitError> {
    let t_max = t.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut deltas = params.deltas.to_vec();
    let mut changepoints = params.changepoints.to_vec();

    if t_max > 1.0 && params.min_dt > 0.0 {
        let slots = ((t_max - 1.0) / params.min_dt).ceil() as u64;
        // historical rate: n_cp changepoints per unit of scaled time
        let rate = (params.changepoints.len() as f64 * (t_max - 1.0) / slots.max(1) as f64).min(1.0);
        let n_new = Binomial::new(slots, rate)
            .map_err(|e| FitError::NonConvergent(format!("changepoint distribution error: {e}")))?
            .sample(rng);

        let scale = mean_abs(params.deltas) + 1e-8;
        for _ in 0..n_new {
            changepoints.push(rng.gen_range(1.0..t_max));
            deltas.push(laplace(rng, scale));
        }
    }

    Ok(t
        .iter()
        .map(|&ti| piecewise_linear(ti, params.k, params.m, &deltas, &changepoints))
        .collect())
}

fn mean_abs(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64
}

/// Laplace(0, scale) by inverse CDF.
fn laplace(rng: &mut StdRng, scale: f64) -> f64 {
    let u: f64 = rng.gen_range(-0.5..0.5);
    -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
}

fn quantile_band<F>(paths: &[(Vec<f64>, Vec<f64>)], len: usize, q_lo: f64, q_hi: f64, pick: F) -> Band
where
    F: Fn(&(Vec<f64>, Vec<f64>)) -> &Vec<f64> + Sync,
{
    let (lower, upper): (Vec<f64>, Vec<f64>) = (0..len)
        .into_par_iter()
        .map(|j| {
            let mut column: Vec<f64> = paths.iter().map(|p| pick(p)[j]).collect();
            column.sort_by(f64::total_cmp);
            (quantile(&column, q_lo), quantile(&column, q_hi))
        })
        .unzip();
    Band { lower, upper }
}

/// Linear-interpolated quantile of sorted data.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
