//! Performance analysis of a finished run's trade log.
//!
//! All statistics degrade to `NaN` instead of failing: an empty or single-point
//! series, zero volatility, or a run with no drawdown leave the affected ratio
//! as `NaN`.

use chrono::{DateTime, Utc};

use super::execution::ExecutionLedger;
use super::interval::{BarInterval, TRADING_DAYS_PER_YEAR};
use super::portfolio::Snapshot;

const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Return periods per year used to annualise volatility.
    pub periods_per_year: f64,
    pub risk_free_rate: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            periods_per_year: TRADING_DAYS_PER_YEAR,
            risk_free_rate: 0.0,
        }
    }
}

impl AnalyzerConfig {
    pub fn for_interval(interval: BarInterval, risk_free_rate: f64) -> Self {
        AnalyzerConfig {
            periods_per_year: interval.periods_per_year(),
            risk_free_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub equity_curve: Vec<EquityPoint>,
    pub period_returns: Vec<ReturnPoint>,
    pub cumulative_returns: Vec<ReturnPoint>,
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    /// Deepest peak-to-trough decline as a fraction, <= 0.
    pub max_drawdown: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
}

impl PerformanceReport {
    pub fn from_ledger(
        ledger: &ExecutionLedger,
        price_index: Option<&[DateTime<Utc>]>,
        config: &AnalyzerConfig,
    ) -> Self {
        Self::from_trade_log(ledger.trade_log(), ledger.initial_cash(), price_index, config)
    }

    pub fn from_trade_log(
        trade_log: &[Snapshot],
        initial_cash: f64,
        price_index: Option<&[DateTime<Utc>]>,
        config: &AnalyzerConfig,
    ) -> Self {
        let equity_curve = build_equity_curve(trade_log, initial_cash, price_index);
        let period_returns = compute_period_returns(&equity_curve);
        let cumulative_returns = compute_cumulative_returns(&period_returns);

        let (total_return, annual_return) = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) => {
                let total = last.equity / first.equity - 1.0;
                let days = (last.timestamp - first.timestamp).num_days().max(1) as f64;
                let annual = (1.0 + total).powf(CALENDAR_DAYS_PER_YEAR / days) - 1.0;
                (total, annual)
            }
            _ => (f64::NAN, f64::NAN),
        };

        let returns: Vec<f64> = period_returns.iter().map(|p| p.value).collect();
        let annualiser = config.periods_per_year.sqrt();
        let annual_volatility = sample_stddev(&returns) * annualiser;
        let excess = annual_return - config.risk_free_rate;
        let sharpe_ratio = ratio_or_nan(excess, annual_volatility);

        let downside: Vec<f64> = returns.iter().map(|&r| r.min(0.0)).collect();
        let downside_volatility = sample_stddev(&downside) * annualiser;
        let sortino_ratio = ratio_or_nan(excess, downside_volatility);

        let max_drawdown = compute_max_drawdown(&equity_curve);
        let calmar_ratio = ratio_or_nan(annual_return, max_drawdown.abs());

        PerformanceReport {
            equity_curve,
            period_returns,
            cumulative_returns,
            total_return,
            annual_return,
            annual_volatility,
            sharpe_ratio,
            max_drawdown,
            sortino_ratio,
            calmar_ratio,
        }
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.last().map(|p| p.equity)
    }
}

/// Snapshot values sorted by time, last snapshot winning on equal timestamps,
/// anchored at `initial_cash` and aligned to `price_index` when given.
fn build_equity_curve(
    trade_log: &[Snapshot],
    initial_cash: f64,
    price_index: Option<&[DateTime<Utc>]>,
) -> Vec<EquityPoint> {
    let mut points: Vec<EquityPoint> = trade_log
        .iter()
        .map(|s| EquityPoint {
            timestamp: s.timestamp,
            equity: s.total_value,
        })
        .collect();
    // Stable sort keeps insertion order among equal timestamps.
    points.sort_by_key(|p| p.timestamp);
    let mut curve: Vec<EquityPoint> = Vec::with_capacity(points.len() + 1);
    for point in points {
        match curve.last_mut() {
            Some(last) if last.timestamp == point.timestamp => *last = point,
            _ => curve.push(point),
        }
    }

    let start = price_index
        .and_then(|index| index.first().copied())
        .or_else(|| curve.first().map(|p| p.timestamp));
    if let Some(start) = start
        && !curve.iter().any(|p| p.timestamp == start)
    {
        let at = curve.partition_point(|p| p.timestamp < start);
        curve.insert(
            at,
            EquityPoint {
                timestamp: start,
                equity: initial_cash,
            },
        );
    }

    match price_index {
        Some(index) => reindex_forward_fill(&curve, index),
        None => curve,
    }
}

/// Exact-match reindex; gaps take the previous reindexed value, leading gaps
/// are dropped.
fn reindex_forward_fill(curve: &[EquityPoint], index: &[DateTime<Utc>]) -> Vec<EquityPoint> {
    let mut out = Vec::with_capacity(index.len());
    let mut carried: Option<f64> = None;
    for &timestamp in index {
        if let Ok(pos) = curve.binary_search_by_key(&timestamp, |p| p.timestamp) {
            carried = Some(curve[pos].equity);
        }
        if let Some(equity) = carried {
            out.push(EquityPoint { timestamp, equity });
        }
    }
    out
}

fn compute_period_returns(curve: &[EquityPoint]) -> Vec<ReturnPoint> {
    curve
        .windows(2)
        .map(|w| ReturnPoint {
            timestamp: w[1].timestamp,
            value: w[1].equity / w[0].equity - 1.0,
        })
        .filter(|r| !r.value.is_nan())
        .collect()
}

fn compute_cumulative_returns(returns: &[ReturnPoint]) -> Vec<ReturnPoint> {
    let mut growth = 1.0_f64;
    returns
        .iter()
        .map(|r| {
            growth *= 1.0 + r.value;
            ReturnPoint {
                timestamp: r.timestamp,
                value: growth - 1.0,
            }
        })
        .collect()
}

fn compute_max_drawdown(curve: &[EquityPoint]) -> f64 {
    let Some(first) = curve.first() else {
        return f64::NAN;
    };
    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    for point in curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            max_dd = max_dd.min((point.equity - peak) / peak);
        }
    }
    max_dd
}

/// Sample standard deviation (n - 1); `NaN` for fewer than two values.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

fn ratio_or_nan(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || denominator.is_nan() {
        f64::NAN
    } else {
        numerator / denominator
    }
}
