//! Configuration validation and typed run configuration.
//!
//! Every key is checked before any bar is fetched. `build_backtest_config`
//! validates first and then assembles the typed [`BacktestConfig`].

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::SimError;
use crate::domain::execution::LedgerConfig;
use crate::domain::interval::BarInterval;
use crate::domain::metrics::AnalyzerConfig;
use crate::domain::risk::RiskLimits;
use crate::domain::strategy::DualMaConfig;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::{FixedOffset, NaiveDate};
use std::path::PathBuf;
use std::str::FromStr;

pub const DUAL_MA_STRATEGY: &str = "dual_ma";
const DEFAULT_DATA_DIR: &str = "data";
const MAX_OFFSET_HOURS: i64 = 23;

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), SimError> {
    validate_backtest_section(config)?;
    validate_risk_section(config)?;
    validate_strategy_section(config)?;
    Ok(())
}

pub fn validate_backtest_section(config: &dyn ConfigPort) -> Result<(), SimError> {
    validate_symbols(config)?;
    validate_dates(config)?;
    validate_interval(config)?;
    validate_provider(config)?;
    validate_initial_cash(config)?;
    validate_rates(config)?;
    validate_periods_per_year(config)?;
    Ok(())
}

pub fn validate_risk_section(config: &dyn ConfigPort) -> Result<(), SimError> {
    let max_position: i64 = value_or(config, "risk", "max_position", 100)?;
    if max_position <= 0 {
        return Err(invalid("risk", "max_position", "max_position must be positive"));
    }

    let max_drawdown: f64 = value_or(config, "risk", "max_drawdown", 0.2)?;
    if !(0.0..=1.0).contains(&max_drawdown) {
        return Err(invalid("risk", "max_drawdown", "max_drawdown must be between 0 and 1"));
    }

    if let Some(loss) = optional_value::<f64>(config, "risk", "max_daily_loss")?
        && (!loss.is_finite() || loss <= 0.0)
    {
        return Err(invalid("risk", "max_daily_loss", "max_daily_loss must be positive"));
    }

    if let Some(trades) = optional_value::<i64>(config, "risk", "max_daily_trades")?
        && trades <= 0
    {
        return Err(invalid(
            "risk",
            "max_daily_trades",
            "max_daily_trades must be positive",
        ));
    }

    day_offset(config)?;
    Ok(())
}

pub fn validate_strategy_section(config: &dyn ConfigPort) -> Result<(), SimError> {
    let name = strategy_name(config);
    if name != DUAL_MA_STRATEGY {
        return Err(invalid(
            "strategy",
            "name",
            &format!("unknown strategy '{name}' (expected {DUAL_MA_STRATEGY})"),
        ));
    }
    let strategy = dual_ma_config(config)?;
    strategy
        .validate()
        .map_err(|reason| invalid("strategy", "short_window", &reason))
}

/// Validate and assemble the typed run configuration.
pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SimError> {
    validate_run_config(config)?;

    let interval = parse_interval(config)?;
    let risk_free_rate = value_or(config, "backtest", "risk_free_rate", 0.0)?;
    let mut analyzer = AnalyzerConfig::for_interval(interval, risk_free_rate);
    if let Some(periods) = optional_value::<f64>(config, "backtest", "periods_per_year")? {
        analyzer.periods_per_year = periods;
    }

    let max_daily_trades = optional_value::<i64>(config, "risk", "max_daily_trades")?
        .map(|n| {
            u32::try_from(n)
                .map_err(|_| invalid("risk", "max_daily_trades", "max_daily_trades is too large"))
        })
        .transpose()?;

    let ledger_defaults = LedgerConfig::default();
    Ok(BacktestConfig {
        symbols: symbols(config)?,
        start_date: parse_date(config, "start_date")?,
        end_date: parse_date(config, "end_date")?,
        interval,
        provider: provider(config)?,
        data_dir: config
            .get_string("data", "directory")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        ledger: LedgerConfig {
            initial_cash: value_or(config, "backtest", "initial_cash", ledger_defaults.initial_cash)?,
            commission_rate: value_or(config, "backtest", "commission_rate", 0.0)?,
            slippage_rate: value_or(config, "backtest", "slippage_rate", 0.0)?,
        },
        risk: RiskLimits {
            max_position: value_or(config, "risk", "max_position", 100)?,
            max_drawdown: value_or(config, "risk", "max_drawdown", 0.2)?,
            max_daily_loss: optional_value(config, "risk", "max_daily_loss")?,
            max_daily_trades,
        },
        day_offset: day_offset(config)?,
        strategy_name: strategy_name(config),
        strategy: dual_ma_config(config)?,
        analyzer,
    })
}

fn invalid(section: &str, key: &str, reason: &str) -> SimError {
    SimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn missing(section: &str, key: &str) -> SimError {
    SimError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

/// Parse a present key; `None` when absent, an error when unparseable.
fn optional_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, SimError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, &format!("'{raw}' is not a valid number"))),
    }
}

fn value_or<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, SimError> {
    Ok(optional_value(config, section, key)?.unwrap_or(default))
}

fn symbols(config: &dyn ConfigPort) -> Result<Vec<String>, SimError> {
    let raw = config
        .get_string("backtest", "symbols")
        .filter(|s| !s.trim().is_empty())
        .map(|s| ("symbols", s))
        .or_else(|| {
            config
                .get_string("backtest", "symbol")
                .filter(|s| !s.trim().is_empty())
                .map(|s| ("symbol", s))
        });

    match raw {
        Some((key, list)) => {
            parse_symbols(&list).map_err(|e| invalid("backtest", key, &e.to_string()))
        }
        None => Err(missing("backtest", "symbols")),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), SimError> {
    symbols(config).map(|_| ())
}

fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, SimError> {
    match config.get_string("backtest", field) {
        None => Err(missing("backtest", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                &format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SimError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date > end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn parse_interval(config: &dyn ConfigPort) -> Result<BarInterval, SimError> {
    match config.get_string("backtest", "interval") {
        None => Ok(BarInterval::default()),
        Some(s) => s
            .parse::<BarInterval>()
            .map_err(|e| invalid("backtest", "interval", &e.to_string())),
    }
}

fn validate_interval(config: &dyn ConfigPort) -> Result<(), SimError> {
    parse_interval(config).map(|_| ())
}

fn provider(config: &dyn ConfigPort) -> Result<String, SimError> {
    match config.get_string("backtest", "provider") {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_lowercase()),
        _ => Err(missing("backtest", "provider")),
    }
}

fn validate_provider(config: &dyn ConfigPort) -> Result<(), SimError> {
    provider(config).map(|_| ())
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), SimError> {
    let value: f64 = value_or(config, "backtest", "initial_cash", LedgerConfig::default().initial_cash)?;
    if value <= 0.0 || !value.is_finite() {
        return Err(invalid("backtest", "initial_cash", "initial_cash must be positive"));
    }
    Ok(())
}

fn validate_rates(config: &dyn ConfigPort) -> Result<(), SimError> {
    for key in ["commission_rate", "slippage_rate"] {
        let value: f64 = value_or(config, "backtest", key, 0.0)?;
        if !(0.0..1.0).contains(&value) {
            return Err(invalid(
                "backtest",
                key,
                &format!("{key} must be non-negative and below 1"),
            ));
        }
    }

    let rf: f64 = value_or(config, "backtest", "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&rf) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), SimError> {
    if let Some(periods) = optional_value::<f64>(config, "backtest", "periods_per_year")?
        && (periods <= 0.0 || !periods.is_finite())
    {
        return Err(invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

fn day_offset(config: &dyn ConfigPort) -> Result<FixedOffset, SimError> {
    let hours: i64 = value_or(config, "risk", "day_utc_offset_hours", 0)?;
    if !(-MAX_OFFSET_HOURS..=MAX_OFFSET_HOURS).contains(&hours) {
        return Err(invalid(
            "risk",
            "day_utc_offset_hours",
            "day_utc_offset_hours must be between -23 and 23",
        ));
    }
    // |hours| <= 23 always fits in i32 seconds.
    FixedOffset::east_opt((hours * 3600) as i32).ok_or_else(|| {
        invalid(
            "risk",
            "day_utc_offset_hours",
            "day_utc_offset_hours is out of range",
        )
    })
}

fn strategy_name(config: &dyn ConfigPort) -> String {
    config
        .get_string("strategy", "name")
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DUAL_MA_STRATEGY.to_string())
}

fn dual_ma_config(config: &dyn ConfigPort) -> Result<DualMaConfig, SimError> {
    let defaults = DualMaConfig::default();
    let window = |key: &str, default: usize| -> Result<usize, SimError> {
        let value: i64 = value_or(config, "strategy", key, default as i64)?;
        usize::try_from(value).map_err(|_| invalid("strategy", key, &format!("{key} must be positive")))
    };
    Ok(DualMaConfig {
        short_window: window("short_window", defaults.short_window)?,
        long_window: window("long_window", defaults.long_window)?,
        trade_size: value_or(config, "strategy", "trade_size", defaults.trade_size)?,
    })
}
