//! Simple Moving Average over a fixed trailing window.
//!
//! SMA(n)[i] = (C[i-n+1] + ... + C[i]) / n
//! Warmup: the first (n-1) closes produce no value.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingSma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl RollingSma {
    /// `period` must be at least 1; a zero period never becomes ready.
    pub fn new(period: usize) -> Self {
        RollingSma {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.period > 0 && self.window.len() == self.period
    }

    /// Push the next close and return the average once the window is full.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        self.window.push_back(close);
        self.sum += close;
        if self.window.len() > self.period
            && let Some(dropped) = self.window.pop_front()
        {
            self.sum -= dropped;
        }
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        self.is_ready().then(|| self.sum / self.period as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_warmup() {
        let mut sma = RollingSma::new(3);
        assert_eq!(sma.update(10.0), None);
        assert_eq!(sma.update(20.0), None);
        assert!(!sma.is_ready());
        assert_eq!(sma.update(30.0), Some(20.0));
        assert!(sma.is_ready());
    }

    #[test]
    fn sma_slides() {
        let mut sma = RollingSma::new(3);
        let values: Vec<Option<f64>> = [10.0, 20.0, 30.0, 40.0, 50.0]
            .iter()
            .map(|&c| sma.update(c))
            .collect();
        assert_eq!(values[3], Some(30.0));
        assert_eq!(values[4], Some(40.0));
    }

    #[test]
    fn sma_period_1() {
        let mut sma = RollingSma::new(1);
        assert_eq!(sma.update(7.5), Some(7.5));
        assert_eq!(sma.update(2.5), Some(2.5));
    }

    #[test]
    fn sma_period_0_never_ready() {
        let mut sma = RollingSma::new(0);
        assert_eq!(sma.update(1.0), None);
        assert_eq!(sma.value(), None);
    }

    #[test]
    fn sma_tracks_long_series_without_drift() {
        let mut sma = RollingSma::new(4);
        let mut last = None;
        for i in 0..10_000 {
            last = sma.update(100.0 + (i % 7) as f64 * 0.1);
        }
        let expected = (9_996..10_000)
            .map(|i| 100.0 + (i % 7) as f64 * 0.1)
            .sum::<f64>()
            / 4.0;
        assert!((last.unwrap() - expected).abs() < 1e-6);
    }
}
