//! Backtest run configuration and the bar-by-bar event loop.
//!
//! The loop drives Bar Source -> Strategy -> Risk Gate -> Ledger. It borrows
//! every collaborator mutably and owns none of them, so the caller can inspect
//! the ledger and risk gate after the run.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::path::PathBuf;

use super::error::SimError;
use super::execution::{ExecutionLedger, FillOutcome, LedgerConfig, LedgerSummary};
use super::interval::BarInterval;
use super::metrics::{AnalyzerConfig, PerformanceReport};
use super::portfolio::single_price;
use super::risk::{RiskDecision, RiskGate, RiskLimits};
use super::strategy::{DualMaConfig, Strategy};
use crate::ports::data_port::BarSource;
use crate::ports::diagnostic_port::SharedSink;

const COMPONENT: &str = "backtest";

/// Everything one invocation needs, built from the INI file.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub interval: BarInterval,
    pub provider: String,
    pub data_dir: PathBuf,
    pub ledger: LedgerConfig,
    pub risk: RiskLimits,
    pub day_offset: FixedOffset,
    pub strategy_name: String,
    pub strategy: DualMaConfig,
    pub analyzer: AnalyzerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub report: PerformanceReport,
    pub summary: LedgerSummary,
    pub bars_processed: usize,
    pub intents_emitted: usize,
    pub risk_rejections: usize,
    pub fill_rejections: usize,
}

pub struct Backtest<'a> {
    source: &'a mut dyn BarSource,
    strategy: &'a mut dyn Strategy,
    risk: &'a mut RiskGate,
    ledger: &'a mut ExecutionLedger,
    sink: SharedSink,
    state: RunState,
}

#[derive(Debug, Default)]
struct Counters {
    bars_processed: usize,
    intents_emitted: usize,
    risk_rejections: usize,
    fill_rejections: usize,
}

impl<'a> Backtest<'a> {
    pub fn new(
        source: &'a mut dyn BarSource,
        strategy: &'a mut dyn Strategy,
        risk: &'a mut RiskGate,
        ledger: &'a mut ExecutionLedger,
        sink: SharedSink,
    ) -> Self {
        Backtest {
            source,
            strategy,
            risk,
            ledger,
            sink,
            state: RunState::Running,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Consume the whole bar stream. A run can only happen once; any fatal
    /// error also leaves the backtest `Done`.
    pub fn run(&mut self, analyzer: &AnalyzerConfig) -> Result<BacktestResult, SimError> {
        if self.state == RunState::Done {
            return Err(SimError::AlreadyCompleted);
        }
        let outcome = self.drive(analyzer);
        self.state = RunState::Done;
        outcome
    }

    fn drive(&mut self, analyzer: &AnalyzerConfig) -> Result<BacktestResult, SimError> {
        let symbol = self.source.symbol().to_string();
        let Some(first) = self.source.next_bar()? else {
            return Err(SimError::EmptyBarStream { symbol });
        };

        self.sink.info(
            COMPONENT,
            &format!(
                "starting {} on {} from {} with cash {:.2}",
                self.strategy.name(),
                symbol,
                first.timestamp,
                self.ledger.cash()
            ),
        );
        self.ledger
            .record_start(first.timestamp, &single_price(&first.symbol, first.close));

        let mut counters = Counters::default();
        let mut price_index: Vec<DateTime<Utc>> = Vec::new();
        let mut next = Some(first);

        while let Some(bar) = next {
            if let Some(&previous) = price_index.last()
                && bar.timestamp <= previous
            {
                return Err(SimError::BarOutOfOrder {
                    symbol: bar.symbol,
                    timestamp: bar.timestamp,
                    previous,
                });
            }
            price_index.push(bar.timestamp);
            counters.bars_processed += 1;

            let intents = self.strategy.on_bar(&bar)?;
            let prices = single_price(&bar.symbol, bar.close);
            for intent in intents {
                counters.intents_emitted += 1;
                match self.risk.check(&intent, &prices, &*self.ledger) {
                    RiskDecision::Accepted => {
                        if let FillOutcome::Rejected(_) = self.ledger.execute(&intent, &prices) {
                            counters.fill_rejections += 1;
                        }
                    }
                    RiskDecision::Rejected(_) => counters.risk_rejections += 1,
                }
            }

            next = self.source.next_bar()?;
        }

        let report = PerformanceReport::from_ledger(&*self.ledger, Some(&price_index), analyzer);
        let summary = self.ledger.summary();
        self.sink.info(
            COMPONENT,
            &format!(
                "finished {}: {} bars, {} fills, total_return={:.2}% sharpe={:.2} max_drawdown={:.2}%",
                symbol,
                counters.bars_processed,
                summary.total_trades,
                report.total_return * 100.0,
                report.sharpe_ratio,
                report.max_drawdown * 100.0
            ),
        );

        Ok(BacktestResult {
            symbol,
            report,
            summary,
            bars_processed: counters.bars_processed,
            intents_emitted: counters.intents_emitted,
            risk_rejections: counters.risk_rejections,
            fill_rejections: counters.fill_rejections,
        })
    }
}
