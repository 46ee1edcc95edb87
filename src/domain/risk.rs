//! Risk gate: a stateful chain of checks every intent passes before it
//! reaches the ledger.
//!
//! Checks run in a fixed order and stop at the first rejection:
//! daily reset, position limit, drawdown, daily loss, daily trade count, then
//! the registered custom rules in registration order.

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use std::fmt;

use super::execution::ExecutionLedger;
use super::intent::{Action, TradeIntent};
use super::portfolio::{PriceMap, mark_to_market};
use crate::ports::diagnostic_port::SharedSink;

const COMPONENT: &str = "risk";

/// Limits supplied once at construction. `None` means no limit.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskLimits {
    pub max_position: i64,
    /// Fraction of peak equity, 0..=1.
    pub max_drawdown: f64,
    pub max_daily_loss: Option<f64>,
    pub max_daily_trades: Option<u32>,
}

impl Default for RiskLimits {
    fn default() -> Self {
        RiskLimits {
            max_position: 100,
            max_drawdown: 0.2,
            max_daily_loss: None,
            max_daily_trades: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RiskRejection {
    #[error("position limit for {symbol}: {current} + {requested} > {limit}")]
    PositionLimit {
        symbol: String,
        current: i64,
        requested: i64,
        limit: i64,
    },

    #[error("drawdown {drawdown:.4} exceeds limit {limit:.4}")]
    Drawdown { drawdown: f64, limit: f64 },

    #[error("daily loss {loss:.2} exceeds limit {limit:.2}")]
    DailyLoss { loss: f64, limit: f64 },

    #[error("daily trade count {count} exceeds limit {limit}")]
    DailyTrades { count: u32, limit: u32 },

    #[error("rule '{rule}' blocked: {reason}")]
    Custom { rule: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RiskDecision {
    Accepted,
    Rejected(RiskRejection),
}

impl RiskDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RiskDecision::Accepted)
    }
}

/// An externally registered check. `Err(reason)` rejects the intent.
pub trait RiskRule {
    fn name(&self) -> &str;

    fn evaluate(&self, intent: &TradeIntent, ledger: &ExecutionLedger) -> Result<(), String>;
}

/// Adapts a closure into a named [`RiskRule`].
pub struct FnRule<F> {
    name: String,
    check: F,
}

impl<F> FnRule<F>
where
    F: Fn(&TradeIntent, &ExecutionLedger) -> Result<(), String>,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> RiskRule for FnRule<F>
where
    F: Fn(&TradeIntent, &ExecutionLedger) -> Result<(), String>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, intent: &TradeIntent, ledger: &ExecutionLedger) -> Result<(), String> {
        (self.check)(intent, ledger)
    }
}

pub struct RiskGate {
    limits: RiskLimits,
    day_offset: FixedOffset,
    current_date: Option<NaiveDate>,
    peak_equity: f64,
    daily_loss: f64,
    daily_trades: u32,
    rules: Vec<Box<dyn RiskRule>>,
    sink: SharedSink,
}

impl fmt::Debug for RiskGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskGate")
            .field("limits", &self.limits)
            .field("day_offset", &self.day_offset)
            .field("current_date", &self.current_date)
            .field("peak_equity", &self.peak_equity)
            .field("daily_loss", &self.daily_loss)
            .field("daily_trades", &self.daily_trades)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl RiskGate {
    pub fn new(limits: RiskLimits, sink: SharedSink) -> Self {
        sink.info(COMPONENT, &format!("risk gate initialised with {limits:?}"));
        RiskGate {
            limits,
            day_offset: Utc.fix(),
            current_date: None,
            peak_equity: 0.0,
            daily_loss: 0.0,
            daily_trades: 0,
            rules: Vec::new(),
            sink,
        }
    }

    /// Trading days roll over at local midnight for `offset` instead of UTC.
    pub fn with_day_offset(mut self, offset: FixedOffset) -> Self {
        self.day_offset = offset;
        self
    }

    pub fn peak_equity(&self) -> f64 {
        self.peak_equity
    }

    pub fn daily_loss(&self) -> f64 {
        self.daily_loss
    }

    pub fn daily_trades(&self) -> u32 {
        self.daily_trades
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn register_rule(&mut self, rule: Box<dyn RiskRule>) {
        self.sink
            .debug(COMPONENT, &format!("custom rule registered: {}", rule.name()));
        self.rules.push(rule);
    }

    /// Register a closure rule.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn(&TradeIntent, &ExecutionLedger) -> Result<(), String> + 'static,
    {
        self.register_rule(Box::new(FnRule::new(name, check)));
    }

    pub fn check(
        &mut self,
        intent: &TradeIntent,
        prices: &PriceMap,
        ledger: &ExecutionLedger,
    ) -> RiskDecision {
        self.sink.debug(COMPONENT, &format!("validating {intent}"));

        match self.evaluate(intent, prices, ledger) {
            Ok(()) => RiskDecision::Accepted,
            Err(rejection) => {
                self.sink
                    .warn(COMPONENT, &format!("rejected {intent}: {rejection}"));
                RiskDecision::Rejected(rejection)
            }
        }
    }

    fn evaluate(
        &mut self,
        intent: &TradeIntent,
        prices: &PriceMap,
        ledger: &ExecutionLedger,
    ) -> Result<(), RiskRejection> {
        self.roll_day(intent);
        self.check_position(intent, ledger)?;
        self.check_drawdown(prices, ledger)?;
        self.check_daily_loss(intent)?;
        self.check_daily_trades()?;
        self.check_custom_rules(intent, ledger)
    }

    fn roll_day(&mut self, intent: &TradeIntent) {
        let date = intent
            .timestamp()
            .with_timezone(&self.day_offset)
            .date_naive();
        if self.current_date != Some(date) {
            self.current_date = Some(date);
            self.daily_loss = 0.0;
            self.daily_trades = 0;
            self.sink.debug(
                COMPONENT,
                &format!("trading day {date}: daily loss and trade count reset"),
            );
        }
    }

    fn check_position(
        &self,
        intent: &TradeIntent,
        ledger: &ExecutionLedger,
    ) -> Result<(), RiskRejection> {
        if intent.action() != Action::Buy {
            return Ok(());
        }
        let current = ledger.position(intent.symbol());
        if current + intent.quantity() > self.limits.max_position {
            return Err(RiskRejection::PositionLimit {
                symbol: intent.symbol().to_string(),
                current,
                requested: intent.quantity(),
                limit: self.limits.max_position,
            });
        }
        Ok(())
    }

    fn check_drawdown(
        &mut self,
        prices: &PriceMap,
        ledger: &ExecutionLedger,
    ) -> Result<(), RiskRejection> {
        let holdings = ledger.positions();
        let projected = mark_to_market(ledger.cash(), &holdings, prices).total_value;
        self.peak_equity = self.peak_equity.max(projected);

        if self.peak_equity <= 0.0 {
            return Ok(());
        }
        let drawdown = (self.peak_equity - projected) / self.peak_equity;
        if drawdown > self.limits.max_drawdown {
            return Err(RiskRejection::Drawdown {
                drawdown,
                limit: self.limits.max_drawdown,
            });
        }
        Ok(())
    }

    /// Accumulates a notional cash-flow estimate: buys count as outflow.
    fn check_daily_loss(&mut self, intent: &TradeIntent) -> Result<(), RiskRejection> {
        let flow = intent.price() * intent.quantity() as f64;
        self.daily_loss += if intent.action() == Action::Buy {
            -flow
        } else {
            flow
        };

        if let Some(limit) = self.limits.max_daily_loss
            && self.daily_loss.abs() > limit
        {
            return Err(RiskRejection::DailyLoss {
                loss: self.daily_loss.abs(),
                limit,
            });
        }
        Ok(())
    }

    fn check_daily_trades(&mut self) -> Result<(), RiskRejection> {
        self.daily_trades += 1;
        if let Some(limit) = self.limits.max_daily_trades
            && self.daily_trades > limit
        {
            return Err(RiskRejection::DailyTrades {
                count: self.daily_trades,
                limit,
            });
        }
        Ok(())
    }

    fn check_custom_rules(
        &self,
        intent: &TradeIntent,
        ledger: &ExecutionLedger,
    ) -> Result<(), RiskRejection> {
        for rule in &self.rules {
            rule.evaluate(intent, ledger)
                .map_err(|reason| RiskRejection::Custom {
                    rule: rule.name().to_string(),
                    reason,
                })?;
        }
        Ok(())
    }
}
