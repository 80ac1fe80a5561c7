//! Historical Value-at-Risk and Conditional VaR.

use crate::domain::error::SigallocError;

/// Tail probability for the 95% measures.
pub const TAIL_PROBABILITY: f64 = 0.05;

/// 95% VaR and CVaR as non-negative loss fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RiskMetrics {
    pub var_95: f64,
    pub cvar_95: f64,
}

/// Percentile with linear interpolation between closest ranks.
///
/// `q` is in `[0, 1]`; `sorted` must be ascending and non-empty.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

impl RiskMetrics {
    /// VaR is the negated 5th percentile of `returns`; CVaR is the negated
    /// mean of returns at or below it. A series with no losses in its tail
    /// reports zero for both.
    pub fn from_returns(ticker: &str, returns: &[f64]) -> Result<Self, SigallocError> {
        if returns.is_empty() {
            return Err(SigallocError::InsufficientHistory {
                ticker: ticker.to_string(),
                points: 1,
                minimum: 2,
            });
        }
        let mut sorted = returns.to_vec();
        sorted.sort_by(f64::total_cmp);

        let threshold = percentile(&sorted, TAIL_PROBABILITY);
        let tail: Vec<f64> = sorted.iter().copied().take_while(|&r| r <= threshold).collect();
        // Interpolation never lands below the minimum, so the tail holds at
        // least one value.
        let tail_mean = tail.iter().sum::<f64>() / tail.len().max(1) as f64;

        Ok(Self {
            var_95: (-threshold).max(0.0),
            cvar_95: (-tail_mean).max(0.0),
        })
    }
}
