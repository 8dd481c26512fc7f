//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves the instrument (flag or interactive picker)
//! - runs the fetch -> normalize -> validate -> forecast pipeline
//! - prints reports/charts
//! - writes optional exports and the debug bundle

use std::path::Path;

use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Command, PlotArgs, RunArgs};
use crate::data::{FetchCache, FetchKey, PriceSource, SampleSource, YahooClient};
use crate::domain::{ForecastFile, Horizon, Instrument, RunConfig, SourceKind, SuffixRuleKind};
use crate::error::AppError;
use crate::forecast::AdditiveForecaster;
use crate::io::{CsvSource, TOOL_NAME};
use crate::table::SuffixRule;

pub mod pipeline;

/// Entry point for the `stockcast` binary.
pub fn run() -> Result<(), AppError> {
    // `stockcast` and `stockcast -s TCS.NS` behave like `stockcast run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Data(args) => handle_data(args),
        Command::Plot(args) => handle_plot(args),
        Command::Symbols => {
            print!("{}", crate::report::format_symbols(&Instrument::reference_list()));
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "stockcast=debug" } else { "stockcast=info" };
    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .try_init();
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let source = build_source(&config)?;
    let cache = FetchCache::new();

    let forecaster = AdditiveForecaster::default()
        .with_interval_width(config.interval_width)
        .with_uncertainty_samples(config.uncertainty_samples)
        .with_seed(config.seed);

    let run = pipeline::run_pipeline(
        source.as_ref(),
        &cache,
        &fetch_key(&config),
        &forecaster,
        &suffix_rule(&config),
        i64::from(config.horizon.days()),
    )?;

    println!("{}", crate::report::format_run_summary(&config, &run.extraction));
    println!("Raw data (last {} rows):", config.tail);
    println!("{}", crate::report::format_table_tail(&run.table, config.tail));
    if config.plot {
        print_price_chart(&run.table, &config);
    }

    println!("Forecast (last {} rows):", config.tail);
    println!("{}", crate::report::format_forecast_tail(&run.result, config.tail));
    if config.plot {
        println!(
            "{}",
            crate::plot::render_forecast_chart(
                &run.extraction.series,
                &run.result,
                config.plot_width,
                config.plot_height
            )
        );
    }
    println!("{}", crate::report::format_components_summary(&run.result));

    if let Some(path) = &config.export_csv {
        crate::io::write_forecast_csv(path, &run.result)?;
        println!("Wrote forecast CSV: {}", path.display());
    }
    if let Some(path) = &config.export_json {
        let file = ForecastFile {
            tool: TOOL_NAME.to_string(),
            instrument: config.instrument.clone(),
            start: config.start,
            end: config.end,
            history: run.extraction.series.clone(),
            forecast: run.result.clone(),
        };
        crate::io::write_forecast_json(path, &file)?;
        println!("Wrote forecast JSON: {}", path.display());
    }
    if config.debug {
        let path = crate::debug::write_debug_bundle(
            Path::new("debug"),
            &config,
            &run.extraction,
            Some(&run.result),
        )?;
        println!("Wrote debug bundle: {}", path.display());
    }

    Ok(())
}

fn handle_data(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let source = build_source(&config)?;
    let cache = FetchCache::new();

    let table = pipeline::run_data(source.as_ref(), &cache, &fetch_key(&config), &suffix_rule(&config))?;

    println!("{} ({} rows)", config.instrument, table.row_count());
    println!("{}", crate::report::format_table_tail(&table, config.tail));
    if config.plot {
        print_price_chart(&table, &config);
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = crate::io::read_forecast_json(&args.forecast)?;
    println!(
        "{} forecast ({} .. {}, {} days ahead)",
        file.instrument, file.start, file.end, file.forecast.horizon_days
    );
    let plot = crate::plot::render_forecast_chart(&file.history, &file.forecast, args.width, args.height);
    println!("{plot}");
    Ok(())
}

fn print_price_chart(table: &crate::table::NormalizedTable, config: &RunConfig) {
    match table.chart_projection() {
        Ok(rows) => println!(
            "{}",
            crate::plot::render_price_chart(&rows, config.plot_width, config.plot_height)
        ),
        Err(e) => println!("Skipping price chart: {e}"),
    }
}

fn build_source(config: &RunConfig) -> Result<Box<dyn PriceSource>, AppError> {
    Ok(match config.source {
        SourceKind::Yahoo => Box::new(YahooClient::from_env().map_err(|e| AppError::new(2, e.to_string()))?),
        SourceKind::Sample => Box::new(SampleSource::default().with_seed(config.seed)),
        SourceKind::Csv => {
            let path = config
                .csv_path
                .clone()
                .ok_or_else(|| AppError::new(2, "`--source csv` needs `--csv <FILE>`."))?;
            Box::new(CsvSource::new(path, config.header_rows))
        }
    })
}

fn fetch_key(config: &RunConfig) -> FetchKey {
    FetchKey::new(config.instrument.clone(), config.start, config.end)
}

fn suffix_rule(config: &RunConfig) -> SuffixRule {
    match config.suffix_rule {
        SuffixRuleKind::FirstSegment => SuffixRule::FirstSegment,
        SuffixRuleKind::KnownSuffix => SuffixRule::KnownSuffix(vec![config.instrument.as_str().to_string()]),
    }
}

pub fn run_config_from_args(args: &RunArgs) -> Result<RunConfig, AppError> {
    let source = if args.csv.is_some() { SourceKind::Csv } else { args.source };

    if !(args.interval_width > 0.0 && args.interval_width < 1.0) {
        return Err(AppError::new(
            2,
            format!("Interval width must be between 0 and 1 (got {}).", args.interval_width),
        ));
    }

    let end = args.end.unwrap_or_else(|| Local::now().date_naive());
    if end < args.start {
        return Err(AppError::new(
            2,
            format!("End date {end} is before start date {}.", args.start),
        ));
    }

    let instrument = match (&args.symbol, source, &args.csv) {
        (Some(symbol), _, _) => Instrument::new(symbol.as_str())
            .ok_or_else(|| AppError::new(2, "Instrument identifier must not be empty."))?,
        (None, SourceKind::Csv, Some(path)) => path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(Instrument::new)
            .ok_or_else(|| AppError::new(2, "Provide an instrument with `--symbol`."))?,
        (None, _, _) => crate::cli::picker::prompt_for_instrument()?,
    };

    Ok(RunConfig {
        instrument,
        horizon: Horizon { years: args.years },
        source,
        csv_path: args.csv.clone(),
        header_rows: usize::from(args.header_rows),
        start: args.start,
        end,
        suffix_rule: args.suffix_rule,
        tail: args.tail,
        interval_width: args.interval_width,
        uncertainty_samples: args.uncertainty_samples,
        seed: args.seed,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_csv: args.export.clone(),
        export_json: args.export_json.clone(),
        debug: args.debug,
    })
}

/// Rewrite argv so `stockcast` defaults to `stockcast run`.
///
/// Rules:
/// - `stockcast`                      -> `stockcast run`
/// - `stockcast -s INFY.NS ...`       -> `stockcast run -s INFY.NS ...`
/// - `stockcast --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "data" | "plot" | "symbols");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}
