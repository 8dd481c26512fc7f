//! The validated time series handed to the forecaster.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Name of the timestamp field in the forecaster's schema.
pub const TIMESTAMP_FIELD: &str = "ds";
/// Name of the value field in the forecaster's schema.
pub const VALUE_FIELD: &str = "y";

/// One observation: a timezone-naive timestamp and a finite value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub ds: NaiveDateTime,
    pub y: f64,
}

/// An ordered sequence of observations.
///
/// Every value is finite. Source order is preserved; nothing here sorts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

impl TimeSeries {
    /// Build a series, excluding any point whose value is not finite.
    pub fn from_points(points: Vec<SeriesPoint>) -> Self {
        Self {
            points: points.into_iter().filter(|p| p.y.is_finite()).collect(),
        }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// The first `n` points (diagnostics).
    pub fn head(&self, n: usize) -> &[SeriesPoint] {
        &self.points[..n.min(self.points.len())]
    }

    /// Latest timestamp regardless of ordering.
    pub fn max_timestamp(&self) -> Option<NaiveDateTime> {
        self.points.iter().map(|p| p.ds).max()
    }

    /// Return a copy sorted by timestamp (stable for equal timestamps).
    pub fn sorted(&self) -> TimeSeries {
        let mut points = self.points.clone();
        points.sort_by_key(|p| p.ds);
        TimeSeries { points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn non_finite_points_are_excluded() {
        let series = TimeSeries::from_points(vec![
            SeriesPoint { ds: at(1), y: 1.0 },
            SeriesPoint { ds: at(2), y: f64::NAN },
            SeriesPoint { ds: at(3), y: f64::NEG_INFINITY },
            SeriesPoint { ds: at(4), y: 4.0 },
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().ds, at(4));
    }

    #[test]
    fn sorted_is_stable_and_preserves_source() {
        let series = TimeSeries::from_points(vec![
            SeriesPoint { ds: at(3), y: 3.0 },
            SeriesPoint { ds: at(1), y: 1.0 },
            SeriesPoint { ds: at(3), y: 30.0 },
        ]);
        let sorted = series.sorted();
        let ys: Vec<f64> = sorted.points().iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![1.0, 3.0, 30.0]);
        assert_eq!(series.first().unwrap().ds, at(3));
        assert_eq!(series.max_timestamp(), Some(at(3)));
    }
}
