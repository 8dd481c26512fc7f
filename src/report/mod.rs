//! Terminal reporting: table tails, forecast tail, component summaries.

pub mod format;

pub use format::*;
