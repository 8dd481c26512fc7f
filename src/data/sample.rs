//! Deterministic synthetic daily bars.
//!
//! Bars follow a geometric random walk over business days. The seed is derived
//! from the fetch key, so the same request always yields the same table.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use super::{FetchKey, PriceSource, price_labels};
use crate::error::FetchError;
use crate::table::{Cell, RawTable};

/// Exchange offset used for synthetic timestamps (IST).
const OFFSET_SECS: i32 = 5 * 3600 + 1800;

#[derive(Debug, Clone)]
pub struct SampleSource {
    pub daily_drift: f64,
    pub daily_vol: f64,
    /// Mixed into the key-derived seed.
    pub seed: u64,
}

impl Default for SampleSource {
    fn default() -> Self {
        Self {
            daily_drift: 0.0004,
            daily_vol: 0.015,
            seed: 0,
        }
    }
}

impl SampleSource {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn seed_for(&self, key: &FetchKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.instrument.as_str().hash(&mut hasher);
        key.start.hash(&mut hasher);
        key.end.hash(&mut hasher);
        self.seed.hash(&mut hasher);
        hasher.finish()
    }

    fn start_price(&self, key: &FetchKey) -> f64 {
        // 100..1100, stable per symbol
        let mut hasher = DefaultHasher::new();
        key.instrument.as_str().hash(&mut hasher);
        100.0 + (hasher.finish() % 1000) as f64
    }
}

impl PriceSource for SampleSource {
    fn fetch(&self, key: &FetchKey) -> Result<RawTable, FetchError> {
        let symbol = key.instrument.as_str();
        let offset = FixedOffset::east_opt(OFFSET_SECS)
            .ok_or_else(|| FetchError::Io("invalid sample offset".to_string()))?;
        let returns = Normal::new(self.daily_drift, self.daily_vol).map_err(|e| FetchError::Decode {
            symbol: symbol.to_string(),
            message: format!("return distribution error: {e}"),
        })?;

        let mut rng = StdRng::seed_from_u64(self.seed_for(key));
        let mut close = self.start_price(key);
        let mut table = RawTable::new(price_labels(symbol));

        for date in business_days(key.start, key.end) {
            let Some(stamp) = date.and_time(NaiveTime::MIN).and_local_timezone(offset).single() else {
                continue;
            };
            let open = close * (1.0 + 0.25 * returns.sample(&mut rng));
            close *= returns.sample(&mut rng).exp();
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(1_000_000.0..10_000_000.0_f64).round();

            table.push_row(vec![
                Cell::Zoned(stamp),
                Cell::Number(round2(open)),
                Cell::Number(round2(high)),
                Cell::Number(round2(low)),
                Cell::Number(round2(close)),
                Cell::Number(round2(close * 0.98)),
                Cell::Number(volume),
            ]);
        }

        if table.is_empty() {
            return Err(FetchError::Empty {
                symbol: symbol.to_string(),
            });
        }
        Ok(table)
    }
}

fn business_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let days = (end - start).num_days().max(-1) + 1;
    (0..days)
        .map(move |i| start + Duration::days(i))
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Instrument;

    fn key(symbol: &str) -> FetchKey {
        FetchKey::new(
            Instrument::new(symbol).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
    }

    #[test]
    fn sample_is_deterministic_per_key() {
        let source = SampleSource::default();
        let a = source.fetch(&key("TCS.NS")).unwrap();
        let b = source.fetch(&key("TCS.NS")).unwrap();
        let c = source.fetch(&key("INFY.NS")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn sample_skips_weekends() {
        let table = SampleSource::default().fetch(&key("TCS.NS")).unwrap();
        // Q1 2024 has 65 weekdays
        assert_eq!(table.row_count(), 65);
        for row in table.rows() {
            let Cell::Zoned(dt) = &row[0] else {
                panic!("expected zoned timestamp");
            };
            assert!(!matches!(dt.weekday(), Weekday::Sat | Weekday::Sun));
            assert_eq!(dt.offset().local_minus_utc(), OFFSET_SECS);
        }
    }

    #[test]
    fn inverted_range_is_empty() {
        let bad = FetchKey::new(
            Instrument::new("TCS.NS").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert!(matches!(
            SampleSource::default().fetch(&bad).unwrap_err(),
            FetchError::Empty { .. }
        ));
    }
}
