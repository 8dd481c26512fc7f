//! Debug bundle writer for inspecting intermediate pipeline state.
//!
//! The bundle is a markdown file with the run settings, the extraction
//! counts, the head of the `(ds, y)` projection before coercion, the head of
//! the validated series after timezone stripping, and the forecast tail.

use std::fmt::Write as _;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::{ForecastResult, RunConfig};
use crate::error::AppError;
use crate::series::{Extraction, SNAPSHOT_ROWS};

/// Write the bundle under `dir` and return its path.
pub fn write_debug_bundle(
    dir: &Path,
    config: &RunConfig,
    extraction: &Extraction,
    result: Option<&ForecastResult>,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(2, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "stockcast_debug_{}_{}y_{ts}.md",
        sanitize(config.instrument.as_str()),
        config.horizon.years
    ));

    let text = render_debug_bundle(config, extraction, result);
    std::fs::write(&path, text).map_err(|e| AppError::new(2, format!("Failed to write debug file: {e}")))?;
    Ok(path)
}

/// Markdown body of the bundle.
pub fn render_debug_bundle(config: &RunConfig, extraction: &Extraction, result: Option<&ForecastResult>) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "# stockcast debug bundle");
    let _ = writeln!(out, "- generated: {}", Local::now().to_rfc3339());
    let _ = writeln!(out, "- instrument: {}", config.instrument);
    let _ = writeln!(out, "- source: {:?}", config.source);
    let _ = writeln!(out, "- range: {} .. {}", config.start, config.end);
    let _ = writeln!(out, "- horizon_days: {}", config.horizon.days());
    let _ = writeln!(out, "- suffix_rule: {:?}", config.suffix_rule);
    let _ = writeln!(
        out,
        "- uncertainty: width={:.2}, samples={}, seed={}",
        config.interval_width, config.uncertainty_samples, config.seed
    );

    let _ = writeln!(out, "\n## Extraction");
    let _ = writeln!(out, "| input_rows | valid | dropped_value | dropped_timestamp |");
    let _ = writeln!(out, "| - | - | - | - |");
    let _ = writeln!(
        out,
        "| {} | {} | {} | {} |",
        extraction.input_rows,
        extraction.series.len(),
        extraction.dropped_invalid_value,
        extraction.dropped_invalid_timestamp
    );

    let _ = writeln!(out, "\n## Renamed (first {SNAPSHOT_ROWS} rows, before coercion)");
    let _ = writeln!(out, "| ds | y |");
    let _ = writeln!(out, "| - | - |");
    for (ds, y) in &extraction.renamed_head {
        let _ = writeln!(out, "| {ds} | {y} |");
    }

    let _ = writeln!(out, "\n## Validated (first {SNAPSHOT_ROWS} rows, timezone removed)");
    let _ = writeln!(out, "| ds | y |");
    let _ = writeln!(out, "| - | - |");
    for p in extraction.series.head(SNAPSHOT_ROWS) {
        let _ = writeln!(out, "| {} | {:.4} |", p.ds.format("%Y-%m-%d %H:%M:%S"), p.y);
    }

    if let Some(result) = result {
        let _ = writeln!(out, "\n## Forecast tail");
        let _ = writeln!(out, "| ds | yhat | yhat_lower | yhat_upper |");
        let _ = writeln!(out, "| - | - | - | - |");
        for r in result.tail(SNAPSHOT_ROWS) {
            let _ = writeln!(
                out,
                "| {} | {:.4} | {:.4} | {:.4} |",
                r.ds.format("%Y-%m-%d"),
                r.yhat,
                r.yhat_lower,
                r.yhat_upper
            );
        }
        let names: Vec<&str> = result.components.seasonal.iter().map(|s| s.name.as_str()).collect();
        let _ = writeln!(out, "\nSeasonalities: {}", if names.is_empty() { "none".to_string() } else { names.join(", ") });
    }

    out
}

fn sanitize(symbol: &str) -> String {
    symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
