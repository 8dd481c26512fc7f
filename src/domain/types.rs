//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::series::TimeSeries;

/// Instruments offered by the interactive picker.
pub const REFERENCE_INSTRUMENTS: [&str; 4] = ["RELIANCE.NS", "TCS.NS", "HDFCBANK.NS", "INFY.NS"];

/// Fixed historical anchor for downloads.
pub const DEFAULT_START: &str = "2015-01-01";

/// Days per forecast year (no leap correction).
pub const DAYS_PER_YEAR: u32 = 365;

/// An instrument identifier. Any non-empty string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instrument(String);

impl Instrument {
    pub fn new(symbol: impl Into<String>) -> Option<Self> {
        let symbol = symbol.into().trim().to_string();
        if symbol.is_empty() {
            None
        } else {
            Some(Self(symbol))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_reference(&self) -> bool {
        REFERENCE_INSTRUMENTS.contains(&self.0.as_str())
    }

    pub fn reference_list() -> Vec<Instrument> {
        REFERENCE_INSTRUMENTS
            .iter()
            .map(|s| Instrument(s.to_string()))
            .collect()
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Instrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Instrument::new(s).ok_or_else(|| "instrument identifier must not be empty".to_string())
    }
}

/// Forecast horizon in whole years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    pub years: u32,
}

impl Horizon {
    pub fn days(self) -> u32 {
        self.years * DAYS_PER_YEAR
    }
}

/// Where raw price rows come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Yahoo Finance chart API (network).
    Yahoo,
    /// Deterministic synthetic bars (offline).
    Sample,
    /// A local CSV file.
    Csv,
}

/// Which instrument-suffix rule the normalizer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SuffixRuleKind {
    /// Split on `_` and keep the first segment.
    FirstSegment,
    /// Only strip a trailing `_<symbol>` matching the selected instrument.
    KnownSuffix,
}

/// Stage reached by a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    Started,
    Loaded,
    Normalized,
    Validated,
    Forecasted,
    Failed(String),
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Forecasted | PipelineStage::Failed(_))
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Started => write!(f, "started"),
            PipelineStage::Loaded => write!(f, "loaded"),
            PipelineStage::Normalized => write!(f, "normalized"),
            PipelineStage::Validated => write!(f, "validated"),
            PipelineStage::Forecasted => write!(f, "forecasted"),
            PipelineStage::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// A validated series plus the number of days to project.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub series: TimeSeries,
    pub horizon_days: u32,
}

impl ForecastRequest {
    pub fn new(series: TimeSeries, horizon_days: i64) -> Result<Self, FitError> {
        let horizon_days = u32::try_from(horizon_days)
            .ok()
            .filter(|d| *d > 0)
            .ok_or(FitError::InvalidHorizon(horizon_days))?;
        Ok(Self {
            series,
            horizon_days,
        })
    }
}

/// One row of the extended (history + future) forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub ds: NaiveDateTime,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// A named additive component aligned with `ForecastResult::extended_series`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// Additive decomposition of the forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub trend: Vec<f64>,
    pub trend_lower: Vec<f64>,
    pub trend_upper: Vec<f64>,
    /// One entry per detected periodic effect (`yearly`, `weekly`, `daily`).
    pub seasonal: Vec<ComponentSeries>,
    /// Sum of all periodic effects.
    pub additive_terms: Vec<f64>,
}

/// Forecast output for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Number of leading rows that cover observed history.
    pub history_len: usize,
    pub horizon_days: u32,
    /// Coverage of the `[yhat_lower, yhat_upper]` interval.
    pub interval_width: f64,
    pub extended_series: Vec<ForecastRow>,
    pub components: Components,
}

impl ForecastResult {
    pub fn len(&self) -> usize {
        self.extended_series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extended_series.is_empty()
    }

    pub fn history(&self) -> &[ForecastRow] {
        &self.extended_series[..self.history_len.min(self.extended_series.len())]
    }

    pub fn future(&self) -> &[ForecastRow] {
        &self.extended_series[self.history_len.min(self.extended_series.len())..]
    }

    pub fn tail(&self, n: usize) -> &[ForecastRow] {
        let start = self.extended_series.len().saturating_sub(n);
        &self.extended_series[start..]
    }
}

/// A saved forecast file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastFile {
    pub tool: String,
    pub instrument: Instrument,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub history: TimeSeries,
    pub forecast: ForecastResult,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults and environment).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub instrument: Instrument,
    pub horizon: Horizon,
    pub source: SourceKind,
    pub csv_path: Option<PathBuf>,
    /// Header rows in the CSV input (2 for hierarchical labels).
    pub header_rows: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub suffix_rule: SuffixRuleKind,

    /// Rows shown in tail tables.
    pub tail: usize,
    pub interval_width: f64,
    pub uncertainty_samples: usize,
    pub seed: u64,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_years_convert_without_leap_days() {
        assert_eq!(Horizon { years: 1 }.days(), 365);
        assert_eq!(Horizon { years: 4 }.days(), 1460);
    }

    #[test]
    fn forecast_request_rejects_non_positive_horizon() {
        let series = TimeSeries::default();
        assert_eq!(
            ForecastRequest::new(series.clone(), 0).unwrap_err(),
            FitError::InvalidHorizon(0)
        );
        assert_eq!(
            ForecastRequest::new(series.clone(), -3).unwrap_err(),
            FitError::InvalidHorizon(-3)
        );
        assert_eq!(ForecastRequest::new(series, 30).unwrap().horizon_days, 30);
    }

    #[test]
    fn any_non_empty_identifier_is_an_instrument() {
        assert!(Instrument::new("AAPL").is_some());
        assert!(Instrument::new("  ").is_none());
        assert!(Instrument::new("INFY.NS").unwrap().is_reference());
        assert!(!Instrument::new("AAPL").unwrap().is_reference());
        assert_eq!(Instrument::reference_list().len(), 4);
    }
}
