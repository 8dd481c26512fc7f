//! Validated `(timestamp, value)` series and their extraction from tables.

pub mod extract;
pub mod types;

pub use extract::*;
pub use types::*;
