//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration (`RunConfig`, `Horizon`, `SourceKind`, `SuffixRuleKind`)
//! - instrument identifiers (`Instrument`)
//! - forecast requests and outputs (`ForecastRequest`, `ForecastResult`, `Components`)
//! - the pipeline stage machine (`PipelineStage`)

pub mod types;

pub use types::*;
