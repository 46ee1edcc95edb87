//! Trade intents emitted by strategies.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::domain::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Buy,
    Sell,
    Short,
    Cover,
}

impl Action {
    /// Buy and Cover take inventory in and pay cash out.
    pub fn is_buy_side(&self) -> bool {
        matches!(self, Action::Buy | Action::Cover)
    }

    /// Signed quantity multiplier applied to the position.
    pub fn direction(&self) -> i64 {
        if self.is_buy_side() { 1 } else { -1 }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Short => "SHORT",
            Action::Cover => "COVER",
        };
        f.write_str(s)
    }
}

/// A request to trade, validated on construction.
///
/// Fields are private so that an intent with a non-positive price or quantity
/// cannot exist.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    timestamp: DateTime<Utc>,
    symbol: String,
    action: Action,
    price: f64,
    quantity: i64,
}

impl TradeIntent {
    pub fn new(
        timestamp: DateTime<Utc>,
        symbol: impl Into<String>,
        action: Action,
        price: f64,
        quantity: i64,
    ) -> Result<Self, SimError> {
        if quantity <= 0 {
            return Err(SimError::InvalidIntent {
                reason: format!("quantity must be positive, got {quantity}"),
            });
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(SimError::InvalidIntent {
                reason: format!("price must be positive, got {price}"),
            });
        }
        Ok(Self {
            timestamp,
            symbol: symbol.into(),
            action,
            price,
            quantity,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }
}

impl fmt::Display for TradeIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {:.4} ({})",
            self.action, self.quantity, self.symbol, self.price, self.timestamp
        )
    }
}
