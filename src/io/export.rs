//! Export the extended forecast to CSV.
//!
//! One row per forecast timestamp:
//! `ds,yhat,yhat_lower,yhat_upper,trend,<one column per seasonality>`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::ForecastResult;
use crate::error::AppError;

/// Write the forecast to a CSV file.
pub fn write_forecast_csv(path: &Path, result: &ForecastResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_forecast(file, result)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV '{}': {e}", path.display())))
}

fn write_forecast<W: Write>(out: W, result: &ForecastResult) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["ds", "yhat", "yhat_lower", "yhat_upper", "trend"];
    header.extend(result.components.seasonal.iter().map(|c| c.name.as_str()));
    writer.write_record(&header)?;

    for (i, row) in result.extended_series.iter().enumerate() {
        let mut record = vec![
            row.ds.format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{:.6}", row.yhat),
            format!("{:.6}", row.yhat_lower),
            format!("{:.6}", row.yhat_upper),
            fmt_opt(result.components.trend.get(i)),
        ];
        record.extend(result.components.seasonal.iter().map(|c| fmt_opt(c.values.get(i))));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn fmt_opt(v: Option<&f64>) -> String {
    v.map(|v| format!("{v:.6}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComponentSeries, Components, ForecastRow};
    use chrono::NaiveDate;

    fn result() -> ForecastResult {
        let ds = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        ForecastResult {
            history_len: 1,
            horizon_days: 1,
            interval_width: 0.8,
            extended_series: vec![
                ForecastRow {
                    ds,
                    yhat: 10.0,
                    yhat_lower: 9.0,
                    yhat_upper: 11.0,
                },
                ForecastRow {
                    ds: ds + chrono::Duration::days(1),
                    yhat: 10.5,
                    yhat_lower: 9.25,
                    yhat_upper: 11.75,
                },
            ],
            components: Components {
                trend: vec![9.5, 10.0],
                trend_lower: vec![9.5, 9.8],
                trend_upper: vec![9.5, 10.2],
                seasonal: vec![ComponentSeries {
                    name: "weekly".to_string(),
                    values: vec![0.5, 0.5],
                }],
                additive_terms: vec![0.5, 0.5],
            },
        }
    }

    #[test]
    fn csv_has_component_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.csv");
        write_forecast_csv(&path, &result()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ds,yhat,yhat_lower,yhat_upper,trend,weekly");
        assert_eq!(
            lines[2],
            "2024-05-02 00:00:00,10.500000,9.250000,11.750000,10.000000,0.500000"
        );
        assert_eq!(lines.len(), 3);
    }
}
