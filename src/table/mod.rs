//! Raw price tables and their normalization into canonical column names.

pub mod cell;
pub mod normalize;
pub mod raw;

pub use cell::*;
pub use normalize::*;
pub use raw::*;
