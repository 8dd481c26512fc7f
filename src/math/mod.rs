//! Numerical building blocks: least-squares solving and Fourier features.

pub mod fourier;
pub mod ols;

pub use fourier::*;
pub use ols::*;
