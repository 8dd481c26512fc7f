//! The linear pipeline shared by the `run` and `data` commands.
//!
//! Stages advance strictly in order:
//!
//! started -> loaded -> normalized -> validated -> forecasted
//!
//! and any stage may end in `failed`. Each transition is logged. A run either
//! produces a complete `PipelineRun` or a single `PipelineError` naming the
//! stage that failed.

use std::sync::Arc;

use tracing::{error, info};

use crate::data::{FetchCache, FetchKey, PriceSource};
use crate::domain::{ForecastResult, PipelineStage};
use crate::error::PipelineError;
use crate::forecast::{Forecaster, forecast};
use crate::series::{Extraction, TIMESTAMP_FIELD, VALUE_FIELD, extract};
use crate::table::{NormalizedTable, RawTable, SuffixRule, normalize_with};

/// Normalized columns the series is read from.
pub const DATE_COLUMN: &str = "date";
pub const CLOSE_COLUMN: &str = "close";

/// Tracks and logs stage transitions.
#[derive(Debug)]
pub struct Pipeline {
    stage: PipelineStage,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        info!(stage = %PipelineStage::Started, "pipeline stage");
        Self {
            stage: PipelineStage::Started,
        }
    }

    pub fn stage(&self) -> &PipelineStage {
        &self.stage
    }

    fn advance(&mut self, next: PipelineStage) {
        info!(stage = %next, "pipeline stage");
        self.stage = next;
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        error!(from = %self.stage, error = %err, "pipeline failed");
        self.stage = PipelineStage::Failed(err.to_string());
        err
    }

    /// Fetch through the cache.
    pub fn load(
        &mut self,
        source: &dyn PriceSource,
        cache: &FetchCache,
        key: &FetchKey,
    ) -> Result<Arc<RawTable>, PipelineError> {
        match cache.get_or_fetch(key, |k| source.fetch(k)) {
            Ok(raw) => {
                info!(rows = raw.row_count(), columns = raw.column_count(), "raw table loaded");
                self.advance(PipelineStage::Loaded);
                Ok(raw)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    pub fn normalize(&mut self, raw: &RawTable, rule: &SuffixRule) -> NormalizedTable {
        let table = normalize_with(raw, rule);
        info!(columns = ?table.columns(), "labels normalized");
        self.advance(PipelineStage::Normalized);
        table
    }

    /// Extract `(date, close)`; an empty result is a validation failure.
    pub fn validate(&mut self, table: &NormalizedTable) -> Result<Extraction, PipelineError> {
        let extraction = match extract(table, DATE_COLUMN, CLOSE_COLUMN) {
            Ok(extraction) => extraction,
            Err(e) => return Err(self.fail(e.into())),
        };
        if extraction.series.is_empty() {
            let dropped = extraction.dropped();
            return Err(self.fail(PipelineError::ValidationEmpty { dropped }));
        }
        info!(
            rows = extraction.series.len(),
            dropped = extraction.dropped(),
            "series validated as ({TIMESTAMP_FIELD}, {VALUE_FIELD})"
        );
        self.advance(PipelineStage::Validated);
        Ok(extraction)
    }

    pub fn forecast<F: Forecaster>(
        &mut self,
        forecaster: &F,
        extraction: &Extraction,
        horizon_days: i64,
    ) -> Result<ForecastResult, PipelineError> {
        match forecast(forecaster, &extraction.series, horizon_days) {
            Ok(result) => {
                self.advance(PipelineStage::Forecasted);
                Ok(result)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }
}

/// Outputs of a full run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub table: NormalizedTable,
    pub extraction: Extraction,
    pub result: ForecastResult,
}

/// Normalize, validate and forecast an already loaded table.
pub fn run_forecast<F: Forecaster>(
    forecaster: &F,
    raw: &RawTable,
    rule: &SuffixRule,
    horizon_days: i64,
) -> Result<PipelineRun, PipelineError> {
    let mut pipeline = Pipeline::new();
    pipeline.advance(PipelineStage::Loaded);
    forecast_loaded(&mut pipeline, forecaster, raw, rule, horizon_days)
}

/// The full pipeline: fetch, normalize, validate, forecast.
pub fn run_pipeline<F: Forecaster>(
    source: &dyn PriceSource,
    cache: &FetchCache,
    key: &FetchKey,
    forecaster: &F,
    rule: &SuffixRule,
    horizon_days: i64,
) -> Result<PipelineRun, PipelineError> {
    let mut pipeline = Pipeline::new();
    let raw = pipeline.load(source, cache, key)?;
    forecast_loaded(&mut pipeline, forecaster, &raw, rule, horizon_days)
}

/// Fetch and normalize only.
pub fn run_data(
    source: &dyn PriceSource,
    cache: &FetchCache,
    key: &FetchKey,
    rule: &SuffixRule,
) -> Result<NormalizedTable, PipelineError> {
    let mut pipeline = Pipeline::new();
    let raw = pipeline.load(source, cache, key)?;
    Ok(pipeline.normalize(&raw, rule))
}

fn forecast_loaded<F: Forecaster>(
    pipeline: &mut Pipeline,
    forecaster: &F,
    raw: &RawTable,
    rule: &SuffixRule,
    horizon_days: i64,
) -> Result<PipelineRun, PipelineError> {
    let table = pipeline.normalize(raw, rule);
    let extraction = pipeline.validate(&table)?;
    let result = pipeline.forecast(forecaster, &extraction, horizon_days)?;
    Ok(PipelineRun {
        table,
        extraction,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SampleSource;
    use crate::domain::Instrument;
    use crate::error::{FetchError, FitError, SchemaError};
    use crate::forecast::AdditiveForecaster;
    use crate::table::{Cell, ColumnLabel};
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn day(i: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap() + Duration::days(i)
    }

    fn raw_prices(n: i64) -> RawTable {
        RawTable::from_rows(
            vec![
                ColumnLabel::pair("Date", ""),
                ColumnLabel::pair("Open", "XYZ"),
                ColumnLabel::pair("Close", "XYZ"),
            ],
            (0..n)
                .map(|i| {
                    vec![
                        Cell::DateTime(day(i)),
                        Cell::Number(99.0 + i as f64),
                        Cell::Number(100.0 + i as f64 + (i % 7) as f64 * 0.3),
                    ]
                })
                .collect(),
        )
    }

    fn forecaster() -> AdditiveForecaster {
        AdditiveForecaster::default().with_uncertainty_samples(100).with_seed(5)
    }

    #[test]
    fn one_year_forecast_end_to_end() {
        let run = run_forecast(&forecaster(), &raw_prices(100), &SuffixRule::FirstSegment, 365).unwrap();

        assert!(run.result.len() >= 465);
        for (i, row) in run.result.extended_series.iter().take(100).enumerate() {
            assert_eq!(row.ds, day(i as i64));
        }
        assert_eq!(run.result.extended_series.last().unwrap().ds, day(99 + 365));
        for row in &run.result.extended_series {
            assert!(row.yhat_lower <= row.yhat_upper);
        }
        assert_eq!(run.extraction.dropped(), 0);
    }

    #[test]
    fn missing_close_column_fails_schema() {
        let raw = RawTable::from_rows(
            vec![ColumnLabel::plain("Date"), ColumnLabel::plain("Open")],
            vec![vec![Cell::DateTime(day(0)), Cell::Number(1.0)]],
        );
        let err = run_forecast(&forecaster(), &raw, &SuffixRule::FirstSegment, 365).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Schema(SchemaError::MissingColumn { ref column, .. }) if column == "close"
        ));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn all_invalid_rows_fail_validation() {
        let raw = RawTable::from_rows(
            vec![ColumnLabel::plain("Date"), ColumnLabel::plain("Close")],
            vec![
                vec![Cell::Text("2024-01-01".into()), Cell::Text("n/a".into())],
                vec![Cell::Text("nope".into()), Cell::Number(3.0)],
            ],
        );
        let mut pipeline = Pipeline::new();
        let table = pipeline.normalize(&raw, &SuffixRule::FirstSegment);
        let err = pipeline.validate(&table).unwrap_err();
        assert!(matches!(err, PipelineError::ValidationEmpty { dropped: 2 }));
        assert!(matches!(pipeline.stage(), PipelineStage::Failed(_)));
    }

    #[test]
    fn single_row_fails_fit() {
        let err = run_forecast(&forecaster(), &raw_prices(1), &SuffixRule::FirstSegment, 365).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Fit(FitError::InsufficientData { required: 2, got: 1 })
        ));
        assert_eq!(err.exit_code(), 4);
    }

    struct Offline;

    impl PriceSource for Offline {
        fn fetch(&self, key: &FetchKey) -> Result<RawTable, FetchError> {
            Err(FetchError::Request {
                symbol: key.instrument.to_string(),
                message: "network unreachable".to_string(),
            })
        }
    }

    fn key() -> FetchKey {
        FetchKey::new(
            Instrument::new("RELIANCE.NS").unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        )
    }

    #[test]
    fn fetch_failure_is_reported_and_not_cached() {
        let cache = FetchCache::new();
        let err = run_data(&Offline, &cache, &key(), &SuffixRule::FirstSegment).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("network unreachable"));
        assert!(cache.is_empty());
    }

    #[test]
    fn sample_source_runs_full_pipeline() {
        let cache = FetchCache::new();
        let source = SampleSource::default();
        let run = run_pipeline(
            &source,
            &cache,
            &key(),
            &forecaster(),
            &SuffixRule::KnownSuffix(vec!["RELIANCE.NS".to_string()]),
            30,
        )
        .unwrap();

        assert!(run.table.has_column("adj_close"));
        let history = run.extraction.series.len();
        assert_eq!(run.result.len(), history + 30);
        assert_eq!(cache.len(), 1);

        // second run is served from the cache
        let table = run_data(&Offline, &cache, &key(), &SuffixRule::FirstSegment).unwrap();
        assert_eq!(table.row_count(), history);
    }
}
