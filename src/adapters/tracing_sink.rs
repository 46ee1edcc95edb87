//! Diagnostic sink backed by `tracing`.

use crate::ports::diagnostic_port::{DiagnosticSink, Severity};

/// Forwards diagnostics as `tracing` events tagged with the run's symbol.
#[derive(Debug, Clone)]
pub struct TracingSink {
    run: String,
}

impl TracingSink {
    pub fn new(run: impl Into<String>) -> Self {
        Self { run: run.into() }
    }

    pub fn run(&self) -> &str {
        &self.run
    }
}

impl DiagnosticSink for TracingSink {
    fn record(&self, severity: Severity, component: &'static str, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!(run = %self.run, component, "{message}"),
            Severity::Info => tracing::info!(run = %self.run, component, "{message}"),
            Severity::Warn => tracing::warn!(run = %self.run, component, "{message}"),
        }
    }
}

/// Install the process-wide subscriber. Filter comes from `QTBACKTEST_LOG`,
/// falling back to `default_level`.
pub fn init_tracing(default_level: &str) -> Result<(), String> {
    let filter = std::env::var("QTBACKTEST_LOG").unwrap_or_else(|_| default_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| format!("failed to install tracing subscriber: {err}"))
}
