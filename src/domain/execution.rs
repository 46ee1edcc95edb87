//! Execution ledger: cash and position accounting with slippage and commission.
//!
//! The ledger is the only owner of cash and positions. Every mutation goes
//! through [`ExecutionLedger::execute`], which either fills the intent and
//! appends a snapshot, or records a [`RejectedEntry`] and leaves state alone.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::intent::TradeIntent;
use super::portfolio::{PriceMap, Snapshot, mark_to_market};
use super::position::{Position, RealizedTrade};
use crate::ports::diagnostic_port::SharedSink;

const COMPONENT: &str = "ledger";

/// Fill model and starting balance.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub initial_cash: f64,
    /// Fraction of notional charged per fill.
    pub commission_rate: f64,
    /// Fractional price concession applied against the trader.
    pub slippage_rate: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            initial_cash: 1_000_000.0,
            commission_rate: 0.0,
            slippage_rate: 0.0,
        }
    }
}

/// Buy/Cover pay up: market * (1 + slippage).
pub fn apply_slippage_buy(market_price: f64, slippage_rate: f64) -> f64 {
    market_price * (1.0 + slippage_rate)
}

/// Sell/Short receive less: market * (1 - slippage).
pub fn apply_slippage_sell(market_price: f64, slippage_rate: f64) -> f64 {
    market_price * (1.0 - slippage_rate)
}

pub fn calculate_commission(notional: f64, commission_rate: f64) -> f64 {
    notional * commission_rate
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RejectReason {
    #[error("insufficient cash: need {required:.4}, have {available:.4}")]
    InsufficientCash { required: f64, available: f64 },

    #[error("insufficient position in {symbol}: need {requested}, have {available}")]
    InsufficientPosition {
        symbol: String,
        requested: i64,
        available: i64,
    },

    #[error("no market price supplied for {symbol}")]
    MissingMarketPrice { symbol: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEntry {
    pub intent: TradeIntent,
    pub reason: RejectReason,
}

/// A successfully applied intent.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub intent: TradeIntent,
    pub market_price: f64,
    pub fill_price: f64,
    pub notional: f64,
    pub fee: f64,
    pub cash_after: f64,
    pub position_after: i64,
    pub realized_pnl: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    Filled(Fill),
    Rejected(RejectReason),
}

impl FillOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, FillOutcome::Filled(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSummary {
    pub cash: f64,
    pub positions: BTreeMap<String, i64>,
    pub total_trades: usize,
    pub rejected_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    pub realized_pnl: f64,
}

pub struct ExecutionLedger {
    config: LedgerConfig,
    cash: f64,
    positions: BTreeMap<String, Position>,
    trades: Vec<Fill>,
    realized: Vec<RealizedTrade>,
    trade_log: Vec<Snapshot>,
    rejected: Vec<RejectedEntry>,
    sink: SharedSink,
}

impl ExecutionLedger {
    pub fn new(config: LedgerConfig, sink: SharedSink) -> Self {
        ExecutionLedger {
            cash: config.initial_cash,
            config,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            realized: Vec::new(),
            trade_log: Vec::new(),
            rejected: Vec::new(),
            sink,
        }
    }

    pub fn initial_cash(&self) -> f64 {
        self.config.initial_cash
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Quantity held; 0 for unseen symbols.
    pub fn position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).map_or(0, |p| p.quantity)
    }

    pub fn positions(&self) -> BTreeMap<String, i64> {
        self.positions
            .iter()
            .map(|(symbol, pos)| (symbol.clone(), pos.quantity))
            .collect()
    }

    pub fn trades(&self) -> &[Fill] {
        &self.trades
    }

    pub fn trade_log(&self) -> &[Snapshot] {
        &self.trade_log
    }

    pub fn rejected(&self) -> &[RejectedEntry] {
        &self.rejected
    }

    /// Mark-to-market equity at `prices`; unpriced holdings count as zero.
    pub fn equity(&self, prices: &PriceMap) -> f64 {
        mark_to_market(self.cash, self.holdings(), prices).total_value
    }

    /// Append the run-start snapshot.
    pub fn record_start(&mut self, timestamp: DateTime<Utc>, prices: &PriceMap) {
        let snapshot = self.snapshot(timestamp, prices);
        self.trade_log.push(snapshot);
    }

    /// Apply `intent` at the market price for its symbol in `prices`.
    pub fn execute(&mut self, intent: &TradeIntent, prices: &PriceMap) -> FillOutcome {
        let Some(&market_price) = prices.get(intent.symbol()) else {
            return self.reject(
                intent,
                RejectReason::MissingMarketPrice {
                    symbol: intent.symbol().to_string(),
                },
            );
        };

        let action = intent.action();
        let quantity = intent.quantity();
        let fill_price = if action.is_buy_side() {
            apply_slippage_buy(market_price, self.config.slippage_rate)
        } else {
            apply_slippage_sell(market_price, self.config.slippage_rate)
        };
        let notional = fill_price * quantity as f64;
        let fee = calculate_commission(notional, self.config.commission_rate);
        let held = self.position(intent.symbol());

        if action.is_buy_side() {
            let required = notional + fee;
            if self.cash < required {
                return self.reject(
                    intent,
                    RejectReason::InsufficientCash {
                        required,
                        available: self.cash,
                    },
                );
            }
            self.cash -= required;
        } else {
            if held < quantity {
                return self.reject(
                    intent,
                    RejectReason::InsufficientPosition {
                        symbol: intent.symbol().to_string(),
                        requested: quantity,
                        available: held,
                    },
                );
            }
            self.cash += notional - fee;
        }

        let per_unit_fee = fee / quantity as f64;
        let unit_cost = if action.is_buy_side() {
            fill_price + per_unit_fee
        } else {
            fill_price - per_unit_fee
        };

        let position = self
            .positions
            .entry(intent.symbol().to_string())
            .or_insert_with(|| Position::flat(intent.symbol()));
        let entry_price = position.avg_entry_price;
        let realized = position.apply_fill(quantity * action.direction(), unit_cost);
        let position_after = position.quantity;

        let realized_pnl = realized.map(|(closed, pnl)| {
            self.realized.push(RealizedTrade {
                symbol: intent.symbol().to_string(),
                timestamp: intent.timestamp(),
                quantity: closed,
                entry_price,
                exit_price: unit_cost,
                pnl,
            });
            pnl
        });

        let fill = Fill {
            intent: intent.clone(),
            market_price,
            fill_price,
            notional,
            fee,
            cash_after: self.cash,
            position_after,
            realized_pnl,
        };
        self.trades.push(fill.clone());

        let snapshot = self.snapshot(intent.timestamp(), prices);
        self.trade_log.push(snapshot);

        self.sink.info(
            COMPONENT,
            &format!(
                "filled {} at {:.4} (fee {:.4}); cash {:.2}, position {}",
                intent, fill_price, fee, self.cash, position_after
            ),
        );

        FillOutcome::Filled(fill)
    }

    pub fn summary(&self) -> LedgerSummary {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut breakeven = 0usize;
        let mut realized_pnl = 0.0_f64;

        for trade in &self.realized {
            realized_pnl += trade.pnl;
            if trade.pnl > 0.0 {
                wins += 1;
            } else if trade.pnl < 0.0 {
                losses += 1;
            } else {
                breakeven += 1;
            }
        }

        LedgerSummary {
            cash: self.cash,
            positions: self.positions(),
            total_trades: self.trades.len(),
            rejected_trades: self.rejected.len(),
            wins,
            losses,
            breakeven,
            realized_pnl,
        }
    }

    fn holdings(&self) -> impl Iterator<Item = (&String, &i64)> {
        self.positions.iter().map(|(symbol, pos)| (symbol, &pos.quantity))
    }

    fn snapshot(&self, timestamp: DateTime<Utc>, prices: &PriceMap) -> Snapshot {
        let valuation = mark_to_market(self.cash, self.holdings(), prices);
        if !valuation.unpriced.is_empty() {
            self.sink.warn(
                COMPONENT,
                &format!(
                    "no market price for held {} at {}; valued at 0, equity understated",
                    valuation.unpriced.join(", "),
                    timestamp
                ),
            );
        }
        Snapshot {
            timestamp,
            cash: self.cash,
            positions: self.positions(),
            total_value: valuation.total_value,
            unpriced: valuation.unpriced,
        }
    }

    fn reject(&mut self, intent: &TradeIntent, reason: RejectReason) -> FillOutcome {
        self.sink
            .warn(COMPONENT, &format!("rejected {intent}: {reason}"));
        self.rejected.push(RejectedEntry {
            intent: intent.clone(),
            reason: reason.clone(),
        });
        FillOutcome::Rejected(reason)
    }
}
