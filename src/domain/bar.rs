//! OHLCV bar representation and an in-memory bar source.

use chrono::{DateTime, Utc};

use crate::domain::error::SimError;
use crate::ports::data_port::BarSource;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Replays a pre-fetched vector of bars in order.
#[derive(Debug, Clone)]
pub struct VecBarSource {
    symbol: String,
    bars: std::vec::IntoIter<Bar>,
}

impl VecBarSource {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars: bars.into_iter(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.bars.len()
    }
}

impl BarSource for VecBarSource {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn next_bar(&mut self) -> Result<Option<Bar>, SimError> {
        Ok(self.bars.next())
    }
}
