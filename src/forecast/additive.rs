//! Additive trend + seasonality forecaster.
//!
//! The model is:
//!
//! ```text
//! y(t) = g(t) + Σ_s S_s(t) + ε
//! ```
//!
//! with `g` a piecewise-linear trend (see `trend`) and each `S_s` a Fourier
//! series (see `seasonality`). Coefficients are found in one regularized
//! least-squares solve: trend slope changes and seasonal coefficients carry
//! Gaussian priors expressed as ridge rows.
//!
//! Values are scaled by `max |y|` and time by the history span before the
//! solve; predictions are returned in original units.

use chrono::{Duration, NaiveDateTime};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::seasonality::{Seasonality, detect_seasonalities};
use super::trend::{changepoint_indices, piecewise_linear};
use super::uncertainty::{SimulationSettings, TrendParams, simulate_intervals};
use super::Forecaster;
use crate::domain::{ComponentSeries, Components, ForecastResult, ForecastRow};
use crate::error::FitError;
use crate::math::{solve_least_squares, solve_ridge};
use crate::series::TimeSeries;

const MIN_POINTS: usize = 2;
const SIGMA_FLOOR: f64 = 1e-4;

/// Forecaster settings.
#[derive(Debug, Clone)]
pub struct AdditiveForecaster {
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub interval_width: f64,
    pub uncertainty_samples: usize,
    pub seed: u64,
}

impl Default for AdditiveForecaster {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            interval_width: 0.80,
            uncertainty_samples: 1000,
            seed: 0,
        }
    }
}

impl AdditiveForecaster {
    pub fn with_interval_width(mut self, width: f64) -> Self {
        self.interval_width = width.clamp(0.0, 1.0);
        self
    }

    pub fn with_uncertainty_samples(mut self, samples: usize) -> Self {
        self.uncertainty_samples = samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_changepoints(mut self, n: usize, range: f64) -> Self {
        self.n_changepoints = n;
        self.changepoint_range = range.clamp(0.0, 1.0);
        self
    }
}

/// A fitted additive model.
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    /// Sorted history timestamps.
    pub history: Vec<NaiveDateTime>,
    pub start: NaiveDateTime,
    pub span_secs: f64,
    pub y_scale: f64,
    pub k: f64,
    pub m: f64,
    /// Changepoint locations in scaled time.
    pub changepoints: Vec<f64>,
    pub deltas: Vec<f64>,
    pub seasonalities: Vec<Seasonality>,
    /// Coefficients per seasonality, in the same order.
    pub seasonal_betas: Vec<Vec<f64>>,
    /// Residual standard deviation (scaled units).
    pub sigma_obs: f64,
    min_dt: f64,
}

impl AdditiveModel {
    fn scaled_time(&self, ds: NaiveDateTime) -> f64 {
        seconds_between(self.start, ds) / self.span_secs
    }

    fn seasonal_at(&self, ds: NaiveDateTime) -> Vec<f64> {
        self.seasonalities
            .iter()
            .zip(&self.seasonal_betas)
            .map(|(s, betas)| {
                let mut row = vec![0.0; s.width()];
                s.fill_row(ds, &mut row);
                row.iter().zip(betas).map(|(x, b)| x * b).sum()
            })
            .collect()
    }
}

impl Forecaster for AdditiveForecaster {
    type Model = AdditiveModel;

    fn fit(&self, series: &TimeSeries) -> Result<AdditiveModel, FitError> {
        let sorted = series.sorted();
        let points = sorted.points();
        let n = points.len();
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Err(FitError::InsufficientData {
                required: MIN_POINTS,
                got: n,
            });
        };
        let span_secs = seconds_between(first.ds, last.ds);
        if n < MIN_POINTS || span_secs <= 0.0 {
            return Err(FitError::InsufficientData {
                required: MIN_POINTS,
                got: n,
            });
        }

        let start = first.ds;
        let history: Vec<NaiveDateTime> = points.iter().map(|p| p.ds).collect();
        let y_scale = points.iter().map(|p| p.y.abs()).fold(0.0, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let t: Vec<f64> = history.iter().map(|ds| seconds_between(start, *ds) / span_secs).collect();
        let y = DVector::from_iterator(n, points.iter().map(|p| p.y / y_scale));

        let changepoints: Vec<f64> = changepoint_indices(n, self.n_changepoints, self.changepoint_range)
            .into_iter()
            .map(|i| t[i])
            .collect();
        let seasonalities = detect_seasonalities(&history);

        let n_cp = changepoints.len();
        let n_seasonal: usize = seasonalities.iter().map(Seasonality::width).sum();
        let p = 2 + n_cp + n_seasonal;

        debug!(
            points = n,
            changepoints = n_cp,
            seasonalities = ?seasonalities.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "fitting additive model"
        );

        let mut x = DMatrix::<f64>::zeros(n, p);
        for (i, (&ti, ds)) in t.iter().zip(&history).enumerate() {
            x[(i, 0)] = 1.0;
            x[(i, 1)] = ti;
            for (j, s) in changepoints.iter().enumerate() {
                x[(i, 2 + j)] = (ti - s).max(0.0);
            }
            let mut col = 2 + n_cp;
            for s in &seasonalities {
                let mut row = vec![0.0; s.width()];
                s.fill_row(*ds, &mut row);
                for v in row {
                    x[(i, col)] = v;
                    col += 1;
                }
            }
        }

        let sigma_ref = reference_sigma(&x, &y)?;
        let mut penalties = vec![0.0; p];
        for w in &mut penalties[2..2 + n_cp] {
            *w = sigma_ref / self.changepoint_prior_scale;
        }
        for w in &mut penalties[2 + n_cp..] {
            *w = sigma_ref / self.seasonality_prior_scale;
        }

        let beta = solve_ridge(&x, &y, &penalties)
            .ok_or_else(|| FitError::NonConvergent("least-squares solve failed".to_string()))?;
        if !beta.iter().all(|v| v.is_finite()) {
            return Err(FitError::NonConvergent("non-finite coefficients".to_string()));
        }

        let residuals = &y - &x * &beta;
        let sigma_obs = (residuals.norm_squared() / n as f64).sqrt();

        let mut seasonal_betas = Vec::with_capacity(seasonalities.len());
        let mut col = 2 + n_cp;
        for s in &seasonalities {
            seasonal_betas.push(beta.rows(col, s.width()).iter().copied().collect());
            col += s.width();
        }

        let min_dt = t
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|d| *d > 0.0)
            .fold(f64::INFINITY, f64::min);

        Ok(AdditiveModel {
            history,
            start,
            span_secs,
            y_scale,
            m: beta[0],
            k: beta[1],
            deltas: beta.rows(2, n_cp).iter().copied().collect(),
            changepoints,
            seasonalities,
            seasonal_betas,
            sigma_obs,
            min_dt: if min_dt.is_finite() { min_dt } else { 0.0 },
        })
    }

    fn predict(&self, model: &AdditiveModel, horizon_days: u32) -> Result<ForecastResult, FitError> {
        if horizon_days == 0 {
            return Err(FitError::InvalidHorizon(0));
        }
        let Some(&last) = model.history.last() else {
            return Err(FitError::InsufficientData {
                required: MIN_POINTS,
                got: 0,
            });
        };

        let mut frame = model.history.clone();
        for day in 1..=i64::from(horizon_days) {
            let ds = last
                .checked_add_signed(Duration::days(day))
                .ok_or(FitError::InvalidHorizon(i64::from(horizon_days)))?;
            frame.push(ds);
        }

        let t: Vec<f64> = frame.iter().map(|ds| model.scaled_time(*ds)).collect();
        let trend: Vec<f64> = t
            .iter()
            .map(|&ti| piecewise_linear(ti, model.k, model.m, &model.deltas, &model.changepoints))
            .collect();
        let per_row: Vec<Vec<f64>> = frame.iter().map(|ds| model.seasonal_at(*ds)).collect();
        let additive: Vec<f64> = per_row.iter().map(|r| r.iter().sum()).collect();

        let intervals = simulate_intervals(
            &TrendParams {
                k: model.k,
                m: model.m,
                deltas: &model.deltas,
                changepoints: &model.changepoints,
                min_dt: model.min_dt,
            },
            &t,
            &trend,
            &additive,
            SimulationSettings {
                samples: self.uncertainty_samples,
                interval_width: self.interval_width,
                sigma_obs: model.sigma_obs,
                seed: self.seed,
            },
        )?;

        let scale = model.y_scale;
        let extended_series: Vec<ForecastRow> = frame
            .iter()
            .enumerate()
            .map(|(i, ds)| ForecastRow {
                ds: *ds,
                yhat: (trend[i] + additive[i]) * scale,
                yhat_lower: intervals.yhat.lower[i] * scale,
                yhat_upper: intervals.yhat.upper[i] * scale,
            })
            .collect();

        if extended_series
            .iter()
            .any(|r| !(r.yhat.is_finite() && r.yhat_lower.is_finite() && r.yhat_upper.is_finite()))
        {
            return Err(FitError::NonConvergent("non-finite prediction".to_string()));
        }

        let seasonal = model
            .seasonalities
            .iter()
            .enumerate()
            .map(|(j, s)| ComponentSeries {
                name: s.name.clone(),
                values: per_row.iter().map(|r| r[j] * scale).collect(),
            })
            .collect();

        Ok(ForecastResult {
            history_len: model.history.len(),
            horizon_days,
            interval_width: self.interval_width.clamp(0.0, 1.0),
            extended_series,
            components: Components {
                trend: trend.iter().map(|v| v * scale).collect(),
                trend_lower: intervals.trend.lower.iter().map(|v| v * scale).collect(),
                trend_upper: intervals.trend.upper.iter().map(|v| v * scale).collect(),
                seasonal,
                additive_terms: additive.iter().map(|v| v * scale).collect(),
            },
        })
    }
}

fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Residual scale of an unpenalized `[1, t]` fit, used to size the priors.
fn reference_sigma(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<f64, FitError> {
    let base = x.columns(0, 2).into_owned();
    let beta = solve_least_squares(&base, y)
        .ok_or_else(|| FitError::NonConvergent("reference trend solve failed".to_string()))?;
    let residuals = y - &base * beta;
    let sigma = (residuals.norm_squared() / y.len() as f64).sqrt();
    Ok(sigma.max(SIGMA_FLOOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesPoint;
    use chrono::NaiveDate;

    fn day(i: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap() + Duration::days(i)
    }

    fn linear_series(n: i64) -> TimeSeries {
        TimeSeries::from_points(
            (0..n)
                .map(|i| SeriesPoint {
                    ds: day(i),
                    y: 100.0 + i as f64,
                })
                .collect(),
        )
    }

    fn wavy_series(n: i64) -> TimeSeries {
        TimeSeries::from_points(
            (0..n)
                .map(|i| SeriesPoint {
                    ds: day(i),
                    y: 50.0 + 0.2 * i as f64 + 3.0 * (i as f64 * 0.9).sin(),
                })
                .collect(),
        )
    }

    fn forecaster() -> AdditiveForecaster {
        AdditiveForecaster::default().with_uncertainty_samples(200).with_seed(11)
    }

    #[test]
    fn linear_history_is_recovered_and_extended() {
        let f = forecaster();
        let model = f.fit(&linear_series(100)).unwrap();
        let out = f.predict(&model, 30).unwrap();

        assert_eq!(out.len(), 130);
        assert_eq!(out.history_len, 100);
        for (i, row) in out.history().iter().enumerate() {
            assert!((row.yhat - (100.0 + i as f64)).abs() < 0.5, "row {i}: {}", row.yhat);
        }
        let end = out.extended_series.last().unwrap();
        assert_eq!(end.ds, day(99 + 30));
        assert!((end.yhat - 229.0).abs() < 2.0, "end {}", end.yhat);
    }

    #[test]
    fn bands_bracket_history_and_stay_ordered() {
        let f = forecaster();
        let model = f.fit(&wavy_series(120)).unwrap();
        let out = f.predict(&model, 60).unwrap();

        for row in &out.extended_series {
            assert!(row.yhat_lower <= row.yhat_upper);
        }
        for row in out.history() {
            assert!(row.yhat_lower <= row.yhat && row.yhat <= row.yhat_upper);
        }
        assert_eq!(out.components.seasonal.len(), 1);
        assert_eq!(out.components.seasonal[0].name, "weekly");
        assert_eq!(out.components.trend.len(), out.len());
    }

    #[test]
    fn same_seed_gives_identical_forecast() {
        let f = forecaster();
        let series = wavy_series(80);
        let a = f.predict(&f.fit(&series).unwrap(), 20).unwrap();
        let b = f.predict(&f.fit(&series).unwrap(), 20).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unsorted_history_is_sorted_without_dedup() {
        let mut points: Vec<SeriesPoint> = linear_series(20).points().to_vec();
        points.reverse();
        points.push(SeriesPoint { ds: day(5), y: 105.0 });
        let f = forecaster();
        let out = f.predict(&f.fit(&TimeSeries::from_points(points)).unwrap(), 3).unwrap();

        assert_eq!(out.len(), 21 + 3);
        assert!(out.extended_series.windows(2).all(|w| w[0].ds <= w[1].ds));
        assert_eq!(out.extended_series.last().unwrap().ds, day(19 + 3));
    }

    #[test]
    fn too_little_data_is_rejected() {
        let f = forecaster();
        assert_eq!(
            f.fit(&TimeSeries::default()).unwrap_err(),
            FitError::InsufficientData { required: 2, got: 0 }
        );
        let single = TimeSeries::from_points(vec![SeriesPoint { ds: day(0), y: 1.0 }]);
        assert_eq!(
            f.fit(&single).unwrap_err(),
            FitError::InsufficientData { required: 2, got: 1 }
        );
        let same_day = TimeSeries::from_points(vec![
            SeriesPoint { ds: day(0), y: 1.0 },
            SeriesPoint { ds: day(0), y: 2.0 },
        ]);
        assert!(matches!(
            f.fit(&same_day).unwrap_err(),
            FitError::InsufficientData { .. }
        ));
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let f = forecaster();
        let model = f.fit(&linear_series(10)).unwrap();
        assert_eq!(f.predict(&model, 0).unwrap_err(), FitError::InvalidHorizon(0));
    }
}
