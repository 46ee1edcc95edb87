//! Diagnostic sink port.
//!
//! Every domain component receives a sink at construction time and reports
//! through it. Nothing in `domain` touches a global logger.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
        };
        f.write_str(s)
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn record(&self, severity: Severity, component: &'static str, message: &str);

    fn debug(&self, component: &'static str, message: &str) {
        self.record(Severity::Debug, component, message);
    }

    fn info(&self, component: &'static str, message: &str) {
        self.record(Severity::Info, component, message);
    }

    fn warn(&self, component: &'static str, message: &str) {
        self.record(Severity::Warn, component, message);
    }
}

pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _severity: Severity, _component: &'static str, _message: &str) {}
}

pub fn null_sink() -> SharedSink {
    Arc::new(NullSink)
}
