//! Per-ticker risk analysis handed to the execution collaborator.
//!
//! Each ticker is evaluated independently from its own price history, so the
//! portfolio pass runs on the rayon pool. The only shared input is the account
//! value, computed once up front from every ticker's latest close.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::error::SigallocError;
use crate::domain::ohlcv::{closes, is_ascending, last_close, PriceBar};
use crate::domain::portfolio::Portfolio;
use crate::domain::position::Position;
use crate::domain::position_limit::{volatility_adjusted_fraction, PositionLimit, RiskConfig};
use crate::domain::tail_risk::RiskMetrics;
use crate::domain::volatility::{daily_returns, VolatilityMetrics};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StopLossMetrics {
    pub stop_loss_price: f64,
    pub potential_loss: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RiskAnalysis {
    pub ticker: String,
    pub current_price: f64,
    pub volatility: VolatilityMetrics,
    pub risk_metrics: RiskMetrics,
    pub stop_loss_metrics: StopLossMetrics,
    pub volatility_adjusted_fraction: f64,
    pub position_limit: f64,
    pub remaining_position_limit: f64,
}

impl RiskAnalysis {
    pub fn compute(
        ticker: &str,
        bars: &[PriceBar],
        position: &Position,
        total_account_value: f64,
        config: &RiskConfig,
    ) -> Result<Self, SigallocError> {
        if !is_ascending(bars) {
            return Err(SigallocError::Data {
                reason: format!("price bars for {ticker} are not in ascending time order"),
            });
        }
        let closes = closes(bars);
        let returns = daily_returns(ticker, &closes)?;
        let volatility = VolatilityMetrics::from_returns(&returns);
        let risk_metrics = RiskMetrics::from_returns(ticker, &returns)?;

        // daily_returns guarantees at least two closes.
        let current_price = closes[closes.len() - 1];
        let fraction = volatility_adjusted_fraction(volatility.annualized_volatility, config);
        let limit = PositionLimit::compute(position, current_price, total_account_value, fraction);

        Ok(Self {
            ticker: ticker.to_string(),
            current_price,
            volatility,
            risk_metrics,
            stop_loss_metrics: StopLossMetrics {
                stop_loss_price: limit.stop_loss_price,
                potential_loss: limit.potential_loss,
            },
            volatility_adjusted_fraction: fraction,
            position_limit: limit.position_limit,
            remaining_position_limit: limit.remaining_position_limit,
        })
    }
}

/// Per-ticker fetch outcome, as returned by `DataPort::fetch_all`.
pub type PriceHistory = HashMap<String, Result<Vec<PriceBar>, SigallocError>>;

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientHistory { points: usize },
    InvalidData { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskReport {
    pub analyses: BTreeMap<String, RiskAnalysis>,
    pub skipped: Vec<SkippedTicker>,
}

impl RiskReport {
    pub fn get(&self, ticker: &str) -> Option<&RiskAnalysis> {
        self.analyses.get(ticker)
    }
}

/// Latest close for every ticker that has price history.
pub fn current_prices(prices: &PriceHistory) -> HashMap<String, f64> {
    prices
        .iter()
        .filter_map(|(ticker, bars)| {
            let bars = bars.as_ref().ok()?;
            last_close(bars).map(|p| (ticker.clone(), p))
        })
        .collect()
}

/// Runs [`RiskAnalysis::compute`] for every ticker in `tickers`.
///
/// Tickers without usable history are reported in `skipped` instead of
/// failing the pass. A failed fetch keeps its error text.
pub fn analyze_portfolio(
    tickers: &[String],
    prices: &PriceHistory,
    portfolio: &Portfolio,
    config: &RiskConfig,
) -> RiskReport {
    let price_map = current_prices(prices);
    for ticker in portfolio.positions.keys() {
        if !price_map.contains_key(ticker) {
            warn!(%ticker, "held position has no price; excluded from account value");
        }
    }
    let total_account_value = portfolio.total_account_value(&price_map);
    debug!(total_account_value, tickers = tickers.len(), "starting risk pass");

    let results: Vec<(String, Result<RiskAnalysis, SkipReason>)> = tickers
        .par_iter()
        .map(|ticker| {
            let outcome = match prices.get(ticker) {
                None => Err(SkipReason::NoData),
                Some(Err(e)) => Err(SkipReason::InvalidData {
                    reason: e.to_string(),
                }),
                Some(Ok(bars)) if bars.is_empty() => Err(SkipReason::NoData),
                Some(Ok(bars)) => {
                    let position =
                        portfolio.position_or_flat(ticker, config.default_stop_loss_pct);
                    RiskAnalysis::compute(ticker, bars, &position, total_account_value, config)
                        .map_err(|e| skip_reason(&e))
                }
            };
            (ticker.clone(), outcome)
        })
        .collect();

    let mut report = RiskReport::default();
    for (ticker, outcome) in results {
        match outcome {
            Ok(analysis) => {
                debug!(
                    %ticker,
                    var_95 = analysis.risk_metrics.var_95,
                    remaining = analysis.remaining_position_limit,
                    "analysed"
                );
                report.analyses.insert(ticker, analysis);
            }
            Err(reason) => {
                warn!(%ticker, ?reason, "skipping ticker");
                report.skipped.push(SkippedTicker { ticker, reason });
            }
        }
    }
    report
}

fn skip_reason(err: &SigallocError) -> SkipReason {
    match err {
        SigallocError::InsufficientHistory { points, .. } => {
            SkipReason::InsufficientHistory { points: *points }
        }
        other => SkipReason::InvalidData {
            reason: other.to_string(),
        },
    }
}
