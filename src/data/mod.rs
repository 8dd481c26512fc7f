//! Price sources.
//!
//! A source turns an instrument and a date range into a `RawTable` shaped like
//! a multi-instrument download: a `("Date", "")` column followed by
//! `(field, symbol)` columns.

pub mod cache;
pub mod sample;
pub mod yahoo;

pub use cache::FetchCache;
pub use sample::SampleSource;
pub use yahoo::YahooClient;

use chrono::NaiveDate;

use crate::domain::Instrument;
use crate::error::FetchError;
use crate::table::{ColumnLabel, RawTable};

/// Fields emitted per instrument, in column order.
pub const PRICE_FIELDS: [&str; 6] = ["Open", "High", "Low", "Close", "Adj Close", "Volume"];

/// Identifies one download: instrument plus inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub instrument: Instrument,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchKey {
    pub fn new(instrument: Instrument, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            instrument,
            start,
            end,
        }
    }
}

/// Something that can retrieve a raw price table.
pub trait PriceSource {
    fn fetch(&self, key: &FetchKey) -> Result<RawTable, FetchError>;
}

/// Labels for a single-instrument download.
pub fn price_labels(symbol: &str) -> Vec<ColumnLabel> {
    let mut labels = vec![ColumnLabel::pair("Date", "")];
    labels.extend(PRICE_FIELDS.iter().map(|f| ColumnLabel::pair(*f, symbol)));
    labels
}
