//! Market data access port trait.

use crate::domain::error::SigallocError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::risk_analysis::PriceHistory;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `ticker` within `[start_date, end_date]`, ascending by date.
    /// Open bounds mean no filtering on that side.
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, SigallocError>;

    fn list_tickers(&self) -> Result<Vec<String>, SigallocError>;

    /// Fetches every ticker in `tickers`, keeping each failure next to its
    /// ticker so the risk pass can report why it was skipped.
    fn fetch_all(
        &self,
        tickers: &[String],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> PriceHistory {
        tickers
            .iter()
            .map(|t| {
                let bars = self.fetch_prices(t, start_date, end_date);
                if let Err(e) = &bars {
                    tracing::warn!(ticker = %t, error = %e, "price fetch failed");
                }
                (t.clone(), bars)
            })
            .collect()
    }
}
