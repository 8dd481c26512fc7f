//! Forecasting capability.
//!
//! The pipeline talks to the model through the `Forecaster` trait: fit on a
//! validated series, then predict a number of whole days past the last
//! observation. `AdditiveForecaster` is the concrete model (trend with
//! changepoints plus Fourier seasonalities, with simulated intervals).

pub mod additive;
pub mod seasonality;
pub mod trend;
pub mod uncertainty;

pub use additive::{AdditiveForecaster, AdditiveModel};
pub use seasonality::Seasonality;

use tracing::info;

use crate::domain::{ForecastRequest, ForecastResult};
use crate::error::FitError;
use crate::series::TimeSeries;

/// A model that can be fitted to a series and projected forward.
///
/// `predict` returns the history timestamps (sorted ascending, duplicates
/// kept) followed by one row per day for `horizon_days` days after the last
/// observation.
pub trait Forecaster {
    type Model;

    fn fit(&self, series: &TimeSeries) -> Result<Self::Model, FitError>;

    fn predict(&self, model: &Self::Model, horizon_days: u32) -> Result<ForecastResult, FitError>;
}

/// Fit `series` and project `horizon_days` days ahead.
pub fn forecast<F: Forecaster>(
    forecaster: &F,
    series: &TimeSeries,
    horizon_days: i64,
) -> Result<ForecastResult, FitError> {
    let request = ForecastRequest::new(series.clone(), horizon_days)?;
    forecast_request(forecaster, &request)
}

pub fn forecast_request<F: Forecaster>(
    forecaster: &F,
    request: &ForecastRequest,
) -> Result<ForecastResult, FitError> {
    let model = forecaster.fit(&request.series)?;
    let result = forecaster.predict(&model, request.horizon_days)?;
    info!(
        history = result.history_len,
        horizon_days = request.horizon_days,
        rows = result.len(),
        "forecast complete"
    );
    Ok(result)
}
