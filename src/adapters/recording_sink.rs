//! In-memory diagnostic sink, used by tests and by callers that want to
//! inspect what a run reported.

use std::sync::Mutex;

use crate::ports::diagnostic_port::{DiagnosticSink, Severity};

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEvent {
    pub severity: Severity,
    pub component: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.events()
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.message.contains(needle))
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, severity: Severity, component: &'static str, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(DiagnosticEvent {
                severity,
                component,
                message: message.to_string(),
            });
        }
    }
}
