//! CSV file data adapter.
//!
//! One file per symbol at `<dir>/<SYMBOL>.csv` with the header
//! `timestamp,open,high,low,close,volume`. Columns are located by header name
//! (`date` is accepted for `timestamp`). Files are expected to already hold
//! bars at the requested interval.

use crate::domain::bar::Bar;
use crate::domain::error::SimError;
use crate::domain::interval::BarInterval;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, Utc};
use std::fs;
use std::path::PathBuf;

pub const PROVIDER_NAME: &str = "csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, SimError> {
        let find = |names: &[&str]| -> Result<usize, SimError> {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
                .ok_or_else(|| SimError::DataRead {
                    reason: format!("missing {} column", names[0]),
                })
        };
        Ok(Columns {
            timestamp: find(&["timestamp", "date"])?,
            open: find(&["open"])?,
            high: find(&["high"])?,
            low: find(&["low"])?,
            close: find(&["close"])?,
            volume: find(&["volume"])?,
        })
    }
}

/// RFC 3339 (`2024-01-02T15:30:00Z`) or a plain date at midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn parse_field(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<f64, SimError> {
    let raw = record.get(index).ok_or_else(|| SimError::DataRead {
        reason: format!("line {line}: missing {name} value"),
    })?;
    raw.trim().parse().map_err(|e| SimError::DataRead {
        reason: format!("line {line}: invalid {name} value '{raw}': {e}"),
    })
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        _interval: BarInterval,
    ) -> Result<Vec<Bar>, SimError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| SimError::DataRead {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| SimError::DataRead {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let columns = Columns::from_headers(headers)?;
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| SimError::DataRead {
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map_or(0, |p| p.line());

            let raw_ts = record.get(columns.timestamp).unwrap_or_default();
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| SimError::DataRead {
                reason: format!("line {line}: invalid timestamp '{raw_ts}'"),
            })?;

            let date = timestamp.date_naive();
            if date < start_date || date > end_date {
                continue;
            }

            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp,
                open: parse_field(&record, columns.open, "open", line)?,
                high: parse_field(&record, columns.high, "high", line)?,
                low: parse_field(&record, columns.low, "low", line)?,
                close: parse_field(&record, columns.close, "close", line)?,
                volume: parse_field(&record, columns.volume, "volume", line)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SimError::DataRead {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
