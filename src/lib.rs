//! `stockcast` library crate.
//!
//! The binary (`stockcast`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the table/series/forecast stages can be reused without the CLI
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod series;
pub mod table;
