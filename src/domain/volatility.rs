//! Realised volatility from a close-price series.
//!
//! Daily volatility is the sample (N-1) standard deviation of the
//! period-over-period percentage changes; annualised volatility scales it by
//! `sqrt(TRADING_DAYS_PER_YEAR)`.

use crate::domain::error::SigallocError;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Fewest prices that produce a return series.
pub const MIN_PRICE_POINTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolatilityMetrics {
    pub daily_volatility: f64,
    pub annualized_volatility: f64,
}

/// Percentage change between consecutive prices; `N` prices give `N - 1`
/// returns.
pub fn daily_returns(ticker: &str, closes: &[f64]) -> Result<Vec<f64>, SigallocError> {
    if closes.len() < MIN_PRICE_POINTS {
        return Err(SigallocError::InsufficientHistory {
            ticker: ticker.to_string(),
            points: closes.len(),
            minimum: MIN_PRICE_POINTS,
        });
    }
    if let Some((index, &price)) = closes
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
        return Err(SigallocError::InvalidPrice { index, price });
    }
    Ok(closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect())
}

/// Sample standard deviation. A single observation has no dispersion and
/// yields 0.
pub fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

impl VolatilityMetrics {
    pub fn from_returns(returns: &[f64]) -> Self {
        let daily_volatility = sample_stddev(returns);
        Self {
            daily_volatility,
            annualized_volatility: daily_volatility * TRADING_DAYS_PER_YEAR.sqrt(),
        }
    }

    pub fn compute(ticker: &str, closes: &[f64]) -> Result<Self, SigallocError> {
        let returns = daily_returns(ticker, closes)?;
        Ok(Self::from_returns(&returns))
    }
}
