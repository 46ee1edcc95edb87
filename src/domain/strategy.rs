//! Strategy abstraction and the dual moving average reference strategy.

use super::bar::Bar;
use super::error::SimError;
use super::indicator::RollingSma;
use super::intent::{Action, TradeIntent};

/// Turns bars into trade intents. Called once per bar, in timestamp order.
pub trait Strategy {
    fn name(&self) -> &str;

    fn on_bar(&mut self, bar: &Bar) -> Result<Vec<TradeIntent>, SimError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DualMaConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub trade_size: i64,
}

impl Default for DualMaConfig {
    fn default() -> Self {
        DualMaConfig {
            short_window: 20,
            long_window: 50,
            trade_size: 1,
        }
    }
}

impl DualMaConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.short_window == 0 {
            return Err("short_window must be positive".into());
        }
        if self.short_window >= self.long_window {
            return Err(format!(
                "short_window ({}) must be less than long_window ({})",
                self.short_window, self.long_window
            ));
        }
        if self.trade_size <= 0 {
            return Err(format!("trade_size must be positive, got {}", self.trade_size));
        }
        Ok(())
    }
}

/// Which average is on top: +1 short above long, -1 below, 0 warming up or equal.
pub fn regime(short: Option<f64>, long: Option<f64>) -> i8 {
    match (short, long) {
        (Some(s), Some(l)) if s > l => 1,
        (Some(s), Some(l)) if s < l => -1,
        _ => 0,
    }
}

/// Buys `trade_size` when the short average crosses above the long one and
/// sells `trade_size` on the opposite cross.
#[derive(Debug, Clone)]
pub struct DualMaStrategy {
    name: String,
    config: DualMaConfig,
    short: RollingSma,
    long: RollingSma,
    regime: i8,
}

impl DualMaStrategy {
    pub fn new(name: impl Into<String>, config: DualMaConfig) -> Result<Self, SimError> {
        let name = name.into();
        config.validate().map_err(|reason| SimError::Strategy {
            strategy: name.clone(),
            reason,
        })?;
        Ok(DualMaStrategy {
            short: RollingSma::new(config.short_window),
            long: RollingSma::new(config.long_window),
            name,
            config,
            regime: 0,
        })
    }

    pub fn config(&self) -> &DualMaConfig {
        &self.config
    }

    pub fn regime(&self) -> i8 {
        self.regime
    }
}

impl Strategy for DualMaStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_bar(&mut self, bar: &Bar) -> Result<Vec<TradeIntent>, SimError> {
        let short = self.short.update(bar.close);
        let long = self.long.update(bar.close);
        let next = regime(short, long);
        let previous = std::mem::replace(&mut self.regime, next);

        let action = match (previous, next) {
            (-1, 1) => Action::Buy,
            (1, -1) => Action::Sell,
            _ => return Ok(Vec::new()),
        };

        let intent = TradeIntent::new(
            bar.timestamp,
            bar.symbol.clone(),
            action,
            bar.close,
            self.config.trade_size,
        )
        .map_err(|err| SimError::Strategy {
            strategy: self.name.clone(),
            reason: err.to_string(),
        })?;
        Ok(vec![intent])
    }
}
