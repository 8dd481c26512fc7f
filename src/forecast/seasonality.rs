//! Periodic effects and their automatic detection.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::math::fill_fourier_row;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A Fourier seasonality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub name: String,
    pub period_days: f64,
    pub order: usize,
}

impl Seasonality {
    pub fn yearly() -> Self {
        Self {
            name: "yearly".to_string(),
            period_days: 365.25,
            order: 10,
        }
    }

    pub fn weekly() -> Self {
        Self {
            name: "weekly".to_string(),
            period_days: 7.0,
            order: 3,
        }
    }

    pub fn daily() -> Self {
        Self {
            name: "daily".to_string(),
            period_days: 1.0,
            order: 4,
        }
    }

    /// Number of design columns.
    pub fn width(&self) -> usize {
        2 * self.order
    }

    pub fn fill_row(&self, ds: NaiveDateTime, out: &mut [f64]) {
        fill_fourier_row(days_since_epoch(ds), self.period_days, self.order, out);
    }
}

pub fn days_since_epoch(ds: NaiveDateTime) -> f64 {
    let utc = ds.and_utc();
    utc.timestamp() as f64 / SECONDS_PER_DAY + f64::from(utc.timestamp_subsec_nanos()) / (SECONDS_PER_DAY * 1e9)
}

/// Choose seasonalities from the history's span and sampling interval.
///
/// - yearly: at least two years of history
/// - weekly: at least two weeks of history, sampled more often than weekly
/// - daily: at least two days of history, sampled more often than daily
///
/// `sorted` must be in ascending order.
pub fn detect_seasonalities(sorted: &[NaiveDateTime]) -> Vec<Seasonality> {
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    let span_days = (*last - *first).num_seconds() as f64 / SECONDS_PER_DAY;
    let min_spacing_days = sorted
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64 / SECONDS_PER_DAY)
        .filter(|d| *d > 0.0)
        .fold(f64::INFINITY, f64::min);

    let mut out = Vec::new();
    if span_days >= 730.0 {
        out.push(Seasonality::yearly());
    }
    if span_days >= 14.0 && min_spacing_days < 7.0 {
        out.push(Seasonality::weekly());
    }
    if span_days >= 2.0 && min_spacing_days < 1.0 {
        out.push(Seasonality::daily());
    }
    out
}
