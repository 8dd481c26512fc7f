//! Read/write forecast JSON files.
//!
//! A forecast file carries the instrument, the requested date range, the
//! validated history and the full `ForecastResult`, so `plot` can re-render a
//! run without refetching or refitting. The schema is `domain::ForecastFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::ForecastFile;
use crate::error::AppError;

pub const TOOL_NAME: &str = "stockcast";

/// Write a forecast JSON file.
pub fn write_forecast_json(path: &Path, file: &ForecastFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create forecast JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::new(2, format!("Failed to write forecast JSON: {e}")))?;
    Ok(())
}

/// Read a forecast JSON file.
pub fn read_forecast_json(path: &Path) -> Result<ForecastFile, AppError> {
    let input = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open forecast JSON '{}': {e}", path.display())))?;
    let file: ForecastFile =
        serde_json::from_reader(input).map_err(|e| AppError::new(2, format!("Invalid forecast JSON: {e}")))?;
    if file.forecast.history_len > file.forecast.extended_series.len() {
        return Err(AppError::new(
            2,
            "Invalid forecast JSON: history length exceeds forecast length.",
        ));
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Instrument;
    use crate::forecast::{AdditiveForecaster, forecast};
    use crate::series::{SeriesPoint, TimeSeries};
    use chrono::{Duration, NaiveDate};

    #[test]
    fn saved_forecast_reloads_for_plotting() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let history = TimeSeries::from_points(
            (0..40)
                .map(|i| SeriesPoint {
                    ds: (start + Duration::days(i)).and_hms_opt(0, 0, 0).unwrap(),
                    y: 200.0 + (i as f64).sqrt(),
                })
                .collect(),
        );
        let f = AdditiveForecaster::default().with_uncertainty_samples(20);
        let result = forecast(&f, &history, 10).unwrap();

        let file = ForecastFile {
            tool: TOOL_NAME.to_string(),
            instrument: Instrument::new("TCS.NS").unwrap(),
            start,
            end: start + Duration::days(39),
            history,
            forecast: result,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.json");
        write_forecast_json(&path, &file).unwrap();
        let loaded = read_forecast_json(&path).unwrap();

        assert_eq!(loaded.instrument, file.instrument);
        assert_eq!(loaded.history.len(), 40);
        assert_eq!(loaded.forecast.len(), 50);
        assert_eq!(loaded.forecast.history_len, 40);
        assert_eq!(
            loaded.forecast.extended_series.last().map(|r| r.ds),
            file.forecast.extended_series.last().map(|r| r.ds)
        );
    }

    #[test]
    fn invalid_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = read_forecast_json(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().starts_with("Invalid forecast JSON"));
    }
}
