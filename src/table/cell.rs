//! Table cells and the coercion rules applied to them.
//!
//! Raw tables arrive with loosely typed cells (CSV text, JSON numbers, zoned
//! exchange timestamps). Coercion never panics and never invents a value:
//! anything that cannot be read becomes `None`, and the caller decides whether
//! the owning row survives.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

/// A timestamp as parsed from a cell, before timezone stripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTimestamp {
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

impl ParsedTimestamp {
    /// Drop any attached offset, keeping the local wall-clock time.
    ///
    /// Applying this to an already naive timestamp returns it unchanged.
    pub fn strip_timezone(self) -> NaiveDateTime {
        match self {
            ParsedTimestamp::Naive(ts) => ts,
            ParsedTimestamp::Zoned(ts) => ts.naive_local(),
        }
    }
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const ZONED_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y"];

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Coerce to a finite number.
    pub fn to_number(&self) -> Option<f64> {
        let v = match self {
            Cell::Number(v) => *v,
            Cell::Text(raw) => raw.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        v.is_finite().then_some(v)
    }

    /// Coerce to a calendar timestamp.
    ///
    /// Integer numbers are read as Unix epoch seconds (UTC).
    pub fn to_timestamp(&self) -> Option<ParsedTimestamp> {
        match self {
            Cell::Date(d) => Some(ParsedTimestamp::Naive(d.and_time(NaiveTime::MIN))),
            Cell::DateTime(ts) => Some(ParsedTimestamp::Naive(*ts)),
            Cell::Zoned(ts) => Some(ParsedTimestamp::Zoned(*ts)),
            Cell::Number(v) => epoch_seconds(*v),
            Cell::Text(raw) => parse_timestamp_text(raw),
            Cell::Missing => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Missing => write!(f, "NaN"),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Date(d) => write!(f, "{d}"),
            Cell::DateTime(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Cell::Zoned(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%:z")),
        }
    }
}

fn epoch_seconds(v: f64) -> Option<ParsedTimestamp> {
    if !v.is_finite() || v.fract() != 0.0 {
        return None;
    }
    let secs = v as i64;
    let utc = DateTime::from_timestamp(secs, 0)?;
    Some(ParsedTimestamp::Zoned(utc.fixed_offset()))
}

fn parse_timestamp_text(raw: &str) -> Option<ParsedTimestamp> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ParsedTimestamp::Zoned(ts));
    }
    for fmt in ZONED_DATETIME_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, fmt) {
            return Some(ParsedTimestamp::Zoned(ts));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ParsedTimestamp::Naive(ts));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(ParsedTimestamp::Naive(d.and_time(NaiveTime::MIN)));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_time(NaiveTime::MIN)
    }

    #[test]
    fn numeric_coercion_accepts_numbers_and_numeric_text() {
        assert_eq!(Cell::Number(12.5).to_number(), Some(12.5));
        assert_eq!(Cell::Text(" 1432.10 ".to_string()).to_number(), Some(1432.10));
        assert_eq!(Cell::Text("n/a".to_string()).to_number(), None);
        assert_eq!(Cell::Text(String::new()).to_number(), None);
        assert_eq!(Cell::Missing.to_number(), None);
        assert_eq!(Cell::Number(f64::NAN).to_number(), None);
        assert_eq!(Cell::Number(f64::INFINITY).to_number(), None);
        assert_eq!(Cell::Text("inf".to_string()).to_number(), None);
    }

    #[test]
    fn timestamp_coercion_reads_common_text_formats() {
        let expected = midnight(2024, 3, 1);
        for raw in ["2024-03-01", "2024/03/01", "01-03-2024", "2024-03-01 00:00:00"] {
            let ts = Cell::Text(raw.to_string()).to_timestamp();
            assert_eq!(ts, Some(ParsedTimestamp::Naive(expected)), "format {raw}");
        }

        let zoned = Cell::Text("2024-03-01T00:00:00+05:30".to_string())
            .to_timestamp()
            .unwrap();
        assert!(matches!(zoned, ParsedTimestamp::Zoned(_)));
        assert_eq!(zoned.strip_timezone(), expected);

        assert_eq!(Cell::Text("not a date".to_string()).to_timestamp(), None);
        assert_eq!(Cell::Missing.to_timestamp(), None);
    }

    #[test]
    fn epoch_seconds_are_read_as_utc() {
        let ts = Cell::Number(1_704_067_200.0).to_timestamp().unwrap();
        assert_eq!(ts.strip_timezone(), midnight(2024, 1, 1));
        assert_eq!(Cell::Number(1.5).to_timestamp(), None);
    }

    #[test]
    fn stripping_keeps_local_wall_clock_time() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let zoned = ist.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let stripped = ParsedTimestamp::Zoned(zoned).strip_timezone();
        assert_eq!(stripped, midnight(2024, 5, 2));

        let again = ParsedTimestamp::Naive(stripped).strip_timezone();
        assert_eq!(again, stripped);
    }
}
