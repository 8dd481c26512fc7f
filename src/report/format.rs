//! Formatted terminal output.
//!
//! Formatting lives here so pipeline stages only return data and output
//! changes stay localized.

use crate::domain::{ForecastResult, Instrument, RunConfig};
use crate::series::Extraction;
use crate::table::NormalizedTable;

const CELL_WIDTH: usize = 20;

/// Run header: instrument, range, horizon and extraction counts.
pub fn format_run_summary(config: &RunConfig, extraction: &Extraction) -> String {
    let mut out = String::new();

    out.push_str("=== stockcast - Stock Forecast ===\n");
    out.push_str(&format!("Instrument: {}\n", config.instrument));
    out.push_str(&format!("Range: {} .. {}\n", config.start, config.end));
    out.push_str(&format!(
        "Horizon: {} year(s) = {} days\n",
        config.horizon.years,
        config.horizon.days()
    ));
    out.push_str(&format!(
        "Rows: input={} | valid={} | dropped value={} timestamp={}\n",
        extraction.input_rows,
        extraction.series.len(),
        extraction.dropped_invalid_value,
        extraction.dropped_invalid_timestamp,
    ));
    if let (Some(first), Some(last)) = (extraction.series.first(), extraction.series.last()) {
        out.push_str(&format!(
            "History: {} .. {}\n",
            first.ds.format("%Y-%m-%d"),
            last.ds.format("%Y-%m-%d")
        ));
    }
    out.push('\n');

    out
}

/// The last `n` rows of a normalized table.
pub fn format_table_tail(table: &NormalizedTable, n: usize) -> String {
    let tail = table.tail(n);
    let mut out = String::new();

    let header: Vec<String> = tail
        .columns()
        .iter()
        .map(|c| format!("{:<w$}", truncate(c, CELL_WIDTH), w = CELL_WIDTH))
        .collect();
    out.push_str(header.join(" ").trim_end());
    out.push('\n');

    let rule: Vec<String> = tail.columns().iter().map(|_| "-".repeat(CELL_WIDTH)).collect();
    out.push_str(&rule.join(" "));
    out.push('\n');

    for row in tail.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|c| format!("{:<w$}", truncate(&c.to_string(), CELL_WIDTH), w = CELL_WIDTH))
            .collect();
        out.push_str(cells.join(" ").trim_end());
        out.push('\n');
    }

    out
}

/// The last `n` rows of the extended forecast.
pub fn format_forecast_tail(result: &ForecastResult, n: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<20} {:>12} {:>12} {:>12}\n",
        "ds", "yhat", "yhat_lower", "yhat_upper"
    ));
    out.push_str(&format!("{:-<20} {:-<12} {:-<12} {:-<12}\n", "", "", "", ""));
    for row in result.tail(n) {
        out.push_str(&format!(
            "{:<20} {:>12.2} {:>12.2} {:>12.2}\n",
            row.ds.format("%Y-%m-%d %H:%M:%S"),
            row.yhat,
            row.yhat_lower,
            row.yhat_upper,
        ));
    }
    out
}

/// Min / max / last value of every additive component.
pub fn format_components_summary(result: &ForecastResult) -> String {
    let c = &result.components;
    let mut out = String::new();
    out.push_str(&format!(
        "Components (interval width {:.0}%):\n",
        result.interval_width * 100.0
    ));
    out.push_str(&format!("{:<16} {:>12} {:>12} {:>12}\n", "component", "min", "max", "last"));

    let mut rows: Vec<(&str, &[f64])> = vec![("trend", &c.trend)];
    rows.extend(c.seasonal.iter().map(|s| (s.name.as_str(), s.values.as_slice())));
    rows.push(("additive_terms", &c.additive_terms));

    for (name, values) in rows {
        let Some(&last) = values.last() else {
            continue;
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        out.push_str(&format!("{name:<16} {min:>12.2} {max:>12.2} {last:>12.2}\n"));
    }
    out
}

/// The reference instrument list.
pub fn format_symbols(instruments: &[Instrument]) -> String {
    let mut out = String::from("Reference instruments:\n");
    for (i, inst) in instruments.iter().enumerate() {
        out.push_str(&format!("  {}. {inst}\n", i + 1));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
