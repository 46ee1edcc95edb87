//! Symbol universe for multi-symbol runs.
//!
//! Parses symbol lists from configuration and checks that each symbol has
//! bars in the requested window before any simulation starts.

use crate::domain::bar::Bar;
use crate::domain::error::SimError;
use crate::domain::interval::BarInterval;
use crate::ports::data_port::DataPort;
use crate::ports::diagnostic_port::SharedSink;
use chrono::NaiveDate;
use std::collections::HashSet;

const COMPONENT: &str = "universe";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// A symbol together with the bars fetched for it.
#[derive(Debug, Clone)]
pub struct LoadedSymbol {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    FetchFailed(String),
}

#[derive(Debug, Clone)]
pub struct Universe {
    pub loaded: Vec<LoadedSymbol>,
    pub skipped: Vec<SkippedSymbol>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.loaded.len()
    }
}

/// Fetch every symbol, skipping those without bars. Fails only when nothing
/// is left to run.
pub fn load_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
    interval: BarInterval,
    sink: &SharedSink,
) -> Result<Universe, SimError> {
    let mut loaded = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let reason = match data_port.fetch_bars(symbol, start_date, end_date, interval) {
            Ok(bars) if !bars.is_empty() => {
                sink.info(COMPONENT, &format!("{symbol}: {} bars", bars.len()));
                loaded.push(LoadedSymbol {
                    symbol: symbol.clone(),
                    bars,
                });
                continue;
            }
            Ok(_) => SkipReason::NoData,
            Err(e) => SkipReason::FetchFailed(e.to_string()),
        };

        let detail = match &reason {
            SkipReason::NoData => "no data found".to_string(),
            SkipReason::FetchFailed(e) => e.clone(),
        };
        sink.warn(COMPONENT, &format!("skipping {symbol} ({detail})"));
        skipped.push(SkippedSymbol {
            symbol: symbol.clone(),
            reason,
        });
    }

    if loaded.is_empty() {
        return Err(SimError::EmptyBarStream {
            symbol: symbols.join(","),
        });
    }

    if !skipped.is_empty() {
        sink.info(
            COMPONENT,
            &format!(
                "backtesting {} of {} symbols",
                loaded.len(),
                loaded.len() + skipped.len()
            ),
        );
    }

    Ok(Universe { loaded, skipped })
}
