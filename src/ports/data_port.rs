//! Market data port traits.

use crate::domain::bar::Bar;
use crate::domain::error::SimError;
use crate::domain::interval::BarInterval;
use chrono::NaiveDate;

/// Provider-level access to historical bars for one symbol.
pub trait DataPort {
    /// Bars for `symbol` within `[start_date, end_date]`, sorted ascending.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        interval: BarInterval,
    ) -> Result<Vec<Bar>, SimError>;

    fn list_symbols(&self) -> Result<Vec<String>, SimError>;
}

/// Sequential "get next bar" access consumed by the backtest loop.
pub trait BarSource {
    fn symbol(&self) -> &str;

    /// `Ok(None)` once the stream is exhausted.
    fn next_bar(&mut self) -> Result<Option<Bar>, SimError>;
}
