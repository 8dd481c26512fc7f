//! Command-line parsing for the stock forecaster.
//!
//! Argument parsing and command dispatch stay separate from the table,
//! series and forecasting code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::domain::{DEFAULT_START, SourceKind, SuffixRuleKind};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "stockcast", version, about = "Stock price forecaster (trend + seasonality)")]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch prices, forecast, print tables/charts, and optionally export.
    Run(RunArgs),
    /// Fetch and normalize prices only (raw tail + open/close chart).
    Data(RunArgs),
    /// Plot a previously exported forecast JSON.
    Plot(PlotArgs),
    /// List the reference instruments offered by the picker.
    Symbols,
}

/// Options shared by `run` and `data`.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Instrument identifier (e.g. INFY.NS). Prompts when omitted.
    #[arg(short = 's', long)]
    pub symbol: Option<String>,

    /// Forecast horizon in years (1-4).
    #[arg(short = 'y', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=4))]
    pub years: u32,

    /// Where prices come from.
    #[arg(long, value_enum, default_value_t = SourceKind::Yahoo)]
    pub source: SourceKind,

    /// CSV file (implies `--source csv`).
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// Header rows in the CSV (2 = field row + instrument row).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub header_rows: u8,

    /// First date to download (YYYY-MM-DD).
    #[arg(long, default_value = DEFAULT_START)]
    pub start: NaiveDate,

    /// Last date to download (YYYY-MM-DD, default today).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// How instrument suffixes are removed from column labels.
    #[arg(long, value_enum, default_value_t = SuffixRuleKind::FirstSegment)]
    pub suffix_rule: SuffixRuleKind,

    /// Rows shown in the tail tables.
    #[arg(long, default_value_t = 5)]
    pub tail: usize,

    /// Coverage of the uncertainty interval (0-1).
    #[arg(long, default_value_t = 0.80)]
    pub interval_width: f64,

    /// Simulated paths used for the uncertainty interval (0 disables).
    #[arg(long, default_value_t = 1000)]
    pub uncertainty_samples: usize,

    /// Random seed for interval simulation and sample data.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Skip the ASCII charts.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the forecast to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export history + forecast to JSON (re-plot with `stockcast plot`).
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Write a markdown debug bundle under `debug/`.
    #[arg(long)]
    pub debug: bool,
}

/// Options for plotting a saved forecast.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Forecast JSON file produced by `stockcast run --export-json`.
    #[arg(long, value_name = "JSON")]
    pub forecast: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}
