//! Domain error types.

use chrono::{DateTime, Utc};

/// Top-level error type for qtbacktest.
///
/// Only fatal conditions live here. Ledger constraint violations and risk
/// rejections are ordinary outcomes (`FillOutcome`, `RiskDecision`) and never
/// surface as a `SimError`.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid trade intent: {reason}")]
    InvalidIntent { reason: String },

    #[error("strategy {strategy} failed: {reason}")]
    Strategy { strategy: String, reason: String },

    #[error("unsupported data source: {provider}")]
    UnsupportedDataSource { provider: String },

    #[error("data read error: {reason}")]
    DataRead { reason: String },

    #[error("bar stream for {symbol} is empty")]
    EmptyBarStream { symbol: String },

    #[error("bar for {symbol} at {timestamp} does not follow {previous}")]
    BarOutOfOrder {
        symbol: String,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    #[error("backtest run already completed")]
    AlreadyCompleted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SimError> for std::process::ExitCode {
    fn from(err: &SimError) -> Self {
        let code: u8 = match err {
            SimError::Io(_) | SimError::AlreadyCompleted => 1,
            SimError::ConfigParse { .. }
            | SimError::ConfigMissing { .. }
            | SimError::ConfigInvalid { .. } => 2,
            SimError::UnsupportedDataSource { .. }
            | SimError::DataRead { .. }
            | SimError::BarOutOfOrder { .. } => 3,
            SimError::InvalidIntent { .. } | SimError::Strategy { .. } => 4,
            SimError::EmptyBarStream { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
