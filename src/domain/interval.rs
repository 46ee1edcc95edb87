//! Bar interval parsing and annualisation factors.

use std::fmt;
use std::str::FromStr;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const TRADING_HOURS_PER_DAY: f64 = 6.5;
const WEEKS_PER_YEAR: f64 = 52.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarInterval {
    Minutes(u32),
    Hours(u32),
    #[default]
    Daily,
    Weekly,
}

impl BarInterval {
    /// Number of bars of this interval in one trading year.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            BarInterval::Minutes(n) => {
                TRADING_DAYS_PER_YEAR * TRADING_HOURS_PER_DAY * 60.0 / *n as f64
            }
            BarInterval::Hours(n) => TRADING_DAYS_PER_YEAR * TRADING_HOURS_PER_DAY / *n as f64,
            BarInterval::Daily => TRADING_DAYS_PER_YEAR,
            BarInterval::Weekly => WEEKS_PER_YEAR,
        }
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarInterval::Minutes(n) => write!(f, "{n}m"),
            BarInterval::Hours(n) => write!(f, "{n}h"),
            BarInterval::Daily => write!(f, "1d"),
            BarInterval::Weekly => write!(f, "1wk"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown bar interval '{0}' (expected 1m, 5m, 15m, 30m, 1h, 1d or 1wk)")]
pub struct IntervalParseError(pub String);

impl FromStr for BarInterval {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(BarInterval::Minutes(1)),
            "5m" => Ok(BarInterval::Minutes(5)),
            "15m" => Ok(BarInterval::Minutes(15)),
            "30m" => Ok(BarInterval::Minutes(30)),
            "1h" | "60m" => Ok(BarInterval::Hours(1)),
            "1d" | "d" | "daily" => Ok(BarInterval::Daily),
            "1wk" | "1w" | "weekly" => Ok(BarInterval::Weekly),
            _ => Err(IntervalParseError(s.to_string())),
        }
    }
}
