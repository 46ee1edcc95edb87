//! Streaming technical indicators.
//!
//! Indicators here are fed one close at a time and report `None` until their
//! warm-up window is full.

pub mod sma;

pub use sma::RollingSma;
