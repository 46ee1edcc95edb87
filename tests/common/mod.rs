#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use qtbacktest::adapters::recording_sink::RecordingSink;
use qtbacktest::domain::bar::Bar;
use qtbacktest::domain::error::SimError;
use qtbacktest::domain::execution::{ExecutionLedger, LedgerConfig};
use qtbacktest::domain::intent::{Action, TradeIntent};
use qtbacktest::domain::interval::BarInterval;
use qtbacktest::domain::risk::{RiskGate, RiskLimits};
use qtbacktest::ports::data_port::DataPort;
use qtbacktest::ports::diagnostic_port::SharedSink;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        _interval: BarInterval,
    ) -> Result<Vec<Bar>, SimError> {
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| {
                        let d = b.timestamp.date_naive();
                        d >= start_date && d <= end_date
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, SimError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Midnight UTC on 2024-01-01 plus `offset` days.
pub fn day(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(offset)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(symbol: &str, offset: i64, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timestamp: day(offset),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

/// One daily bar per close, starting 2024-01-01.
pub fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(symbol, i as i64, close))
        .collect()
}

pub fn intent(offset: i64, symbol: &str, action: Action, price: f64, qty: i64) -> TradeIntent {
    TradeIntent::new(day(offset), symbol, action, price, qty).unwrap()
}

pub fn recording() -> (Arc<RecordingSink>, SharedSink) {
    let sink = Arc::new(RecordingSink::default());
    let shared: SharedSink = sink.clone();
    (sink, shared)
}

pub fn ledger(initial_cash: f64, commission_rate: f64, slippage_rate: f64) -> ExecutionLedger {
    ExecutionLedger::new(
        LedgerConfig {
            initial_cash,
            commission_rate,
            slippage_rate,
        },
        qtbacktest::ports::diagnostic_port::null_sink(),
    )
}

pub fn gate(max_position: i64, max_drawdown: f64) -> RiskGate {
    RiskGate::new(
        RiskLimits {
            max_position,
            max_drawdown,
            max_daily_loss: None,
            max_daily_trades: None,
        },
        qtbacktest::ports::diagnostic_port::null_sink(),
    )
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Write `<dir>/<symbol>.csv` with one daily bar per close from 2024-01-01.
pub fn write_csv(dir: &Path, symbol: &str, closes: &[f64]) {
    let mut content = String::from("timestamp,open,high,low,close,volume\n");
    for (i, close) in closes.iter().enumerate() {
        let d = day(i as i64).date_naive();
        content.push_str(&format!("{d},{close},{close},{close},{close},100\n"));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}

pub fn same_code(actual: ExitCode, expected: u8) -> bool {
    format!("{actual:?}") == format!("{:?}", ExitCode::from(expected))
}
