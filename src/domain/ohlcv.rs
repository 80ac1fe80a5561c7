//! Daily price bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceBar {
    pub ticker: String,
    pub timestamp: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Close prices in bar order.
pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Close of the most recent bar, if any.
pub fn last_close(bars: &[PriceBar]) -> Option<f64> {
    bars.last().map(|b| b.close)
}

/// True when timestamps are strictly ascending.
pub fn is_ascending(bars: &[PriceBar]) -> bool {
    bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}
