//! Per-symbol position with average cost basis.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    /// Average per-unit entry cost of the open quantity, fees included.
    pub avg_entry_price: f64,
}

impl Position {
    pub fn flat(symbol: impl Into<String>) -> Self {
        Position {
            symbol: symbol.into(),
            quantity: 0,
            avg_entry_price: 0.0,
        }
    }

    /// Apply a signed fill at `unit_cost` (fee-adjusted per-unit price).
    ///
    /// A positive quantity adds to the holding at an averaged cost. A negative
    /// one reduces it and returns the closed quantity with its realized PnL;
    /// reductions never exceed the held quantity.
    pub fn apply_fill(&mut self, signed_qty: i64, unit_cost: f64) -> Option<(i64, f64)> {
        if signed_qty > 0 {
            let held = self.quantity as f64;
            let added = signed_qty as f64;
            self.avg_entry_price = (held * self.avg_entry_price + added * unit_cost) / (held + added);
            self.quantity += signed_qty;
            return None;
        }
        if signed_qty == 0 {
            return None;
        }

        let closed = signed_qty.unsigned_abs().min(self.quantity.unsigned_abs()) as i64;
        let realized = closed as f64 * (unit_cost - self.avg_entry_price);
        self.quantity -= closed;
        if self.quantity == 0 {
            self.avg_entry_price = 0.0;
        }
        Some((closed, realized))
    }
}

/// A position reduction with its realized result.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizedTrade {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub quantity: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
}
