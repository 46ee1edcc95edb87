//! Account snapshots and mark-to-market valuation.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Latest known market price per symbol.
pub type PriceMap = HashMap<String, f64>;

/// Point-in-time account state appended to the trade log.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub positions: BTreeMap<String, i64>,
    pub total_value: f64,
    /// Held symbols that had no market price and were valued at zero.
    pub unpriced: Vec<String>,
}

/// Valuation of `cash` plus signed holdings at `prices`.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub total_value: f64,
    pub unpriced: Vec<String>,
}

/// Value holdings at the supplied prices. A non-zero holding without a price
/// contributes zero and is reported in `unpriced`.
pub fn mark_to_market<'a, I>(cash: f64, holdings: I, prices: &PriceMap) -> Valuation
where
    I: IntoIterator<Item = (&'a String, &'a i64)>,
{
    let mut total_value = cash;
    let mut unpriced = Vec::new();

    for (symbol, &quantity) in holdings {
        if quantity == 0 {
            continue;
        }
        match prices.get(symbol) {
            Some(&price) => total_value += quantity as f64 * price,
            None => unpriced.push(symbol.clone()),
        }
    }

    Valuation {
        total_value,
        unpriced,
    }
}

pub fn single_price(symbol: &str, price: f64) -> PriceMap {
    let mut map = PriceMap::with_capacity(1);
    map.insert(symbol.to_string(), price);
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holdings(items: &[(&str, i64)]) -> BTreeMap<String, i64> {
        items.iter().map(|(s, q)| (s.to_string(), *q)).collect()
    }

    #[test]
    fn cash_only_values_to_cash() {
        let v = mark_to_market(1_000.0, &BTreeMap::new(), &PriceMap::new());
        assert_eq!(v.total_value, 1_000.0);
        assert!(v.unpriced.is_empty());
    }

    #[test]
    fn priced_holdings_add_market_value() {
        let h = holdings(&[("AAPL", 10), ("MSFT", -2)]);
        let mut prices = single_price("AAPL", 100.0);
        prices.insert("MSFT".into(), 50.0);
        let v = mark_to_market(500.0, &h, &prices);
        assert!((v.total_value - (500.0 + 1_000.0 - 100.0)).abs() < 1e-12);
        assert!(v.unpriced.is_empty());
    }

    #[test]
    fn missing_price_is_flagged_and_valued_at_zero() {
        let h = holdings(&[("AAPL", 10), ("MSFT", 3)]);
        let prices = single_price("AAPL", 100.0);
        let v = mark_to_market(0.0, &h, &prices);
        assert!((v.total_value - 1_000.0).abs() < 1e-12);
        assert_eq!(v.unpriced, vec!["MSFT".to_string()]);
    }

    #[test]
    fn flat_holdings_are_not_flagged() {
        let h = holdings(&[("MSFT", 0)]);
        let v = mark_to_market(10.0, &h, &PriceMap::new());
        assert!(v.unpriced.is_empty());
        assert_eq!(v.total_value, 10.0);
    }
}
