//! Adapter implementations for port traits.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod recording_sink;
pub mod tracing_sink;
