#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use sigalloc::domain::covariance::CovarianceMatrix;
use sigalloc::domain::error::SigallocError;
pub use sigalloc::domain::ohlcv::PriceBar;
use sigalloc::domain::signal::{AggregatedSignals, Signal};
use sigalloc::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, SigallocError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SigallocError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| start_date.is_none_or(|s| b.timestamp >= s))
                    .filter(|b| end_date.is_none_or(|e| b.timestamp <= e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_tickers(&self) -> Result<Vec<String>, SigallocError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

pub fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

pub fn make_bar(ticker: &str, date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        ticker: ticker.to_string(),
        timestamp: date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000,
    }
}

/// One bar per consecutive day starting at [`base_date`].
pub fn make_bars(ticker: &str, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(ticker, base_date() + Days::new(i as u64), c))
        .collect()
}

pub fn tickers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// The two-agent, two-ticker signal set used across scenarios:
/// A scores 1.4, B scores -1.4.
pub fn sample_signals() -> AggregatedSignals {
    AggregatedSignals::new()
        .with_signal("fundamentals", "A", Signal::bullish(60.0))
        .with_signal("sentiment", "A", Signal::bullish(80.0))
        .with_signal("fundamentals", "B", Signal::bearish(60.0))
        .with_signal("sentiment", "B", Signal::bearish(80.0))
}

pub fn sample_covariance() -> CovarianceMatrix {
    CovarianceMatrix::new(
        tickers(&["A", "B"]),
        vec![vec![0.1, 0.05], vec![0.05, 0.2]],
    )
    .unwrap()
}

/// Closes whose returns are [-0.05, 0.0737, -0.1176, 0.0444, 0.0213].
pub const SCENARIO_CLOSES: [f64; 6] = [100.0, 95.0, 102.0, 90.0, 94.0, 96.0];
