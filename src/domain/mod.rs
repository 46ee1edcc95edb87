//! Core domain types and logic.

pub mod bar;
pub mod intent;
pub mod interval;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod risk;
pub mod indicator;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod universe;
pub mod error;
