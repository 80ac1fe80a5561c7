//! Volatility- and stop-loss-bounded capacity for a single position.
//!
//! For a long leg:
//!
//! ```text
//! stop_loss_price          = long_cost_basis * (1 - stop_loss_pct)
//! current_exposure         = current_price * long_qty
//! potential_loss           = max(0, current_price - stop_loss_price) * long_qty
//! position_limit           = total_account_value * volatility_adjusted_fraction
//! remaining_position_limit = max(0, position_limit - current_exposure - potential_loss)
//! ```
//!
//! A short leg mirrors this with `short_cost_basis * (1 + stop_loss_pct)` and
//! the loss measured as `max(0, stop_loss_price - current_price)`.

use crate::domain::position::{Position, Side};

/// Parameters of the volatility-to-capacity mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RiskConfig {
    /// Fraction of account value allowed in one position at zero volatility.
    pub max_position_fraction: f64,
    /// Annualised volatility at which the allowed fraction falls by a factor of e.
    pub volatility_decay: f64,
    /// Stop-loss applied to tickers with no held position.
    pub default_stop_loss_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_fraction: 0.25,
            volatility_decay: 1.0,
            default_stop_loss_pct: 0.10,
        }
    }
}

/// Fraction of account value one position may use:
/// `max_position_fraction * exp(-annualized_volatility / volatility_decay)`.
///
/// Strictly decreasing in volatility and bounded in
/// `(0, max_position_fraction]`. Negative or non-finite volatility is read as
/// zero.
pub fn volatility_adjusted_fraction(annualized_volatility: f64, config: &RiskConfig) -> f64 {
    let vol = if annualized_volatility.is_finite() {
        annualized_volatility.max(0.0)
    } else {
        0.0
    };
    let fraction = config.max_position_fraction * (-vol / config.volatility_decay).exp();
    // exp underflows to 0 for extreme volatility; keep the lower bound open.
    fraction.max(f64::MIN_POSITIVE)
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionLimit {
    pub stop_loss_price: f64,
    pub potential_loss: f64,
    pub position_limit: f64,
    pub remaining_position_limit: f64,
}

impl PositionLimit {
    /// Capacity left for `position` at `current_price`.
    ///
    /// Exposure and potential loss are summed over both legs; the reported
    /// stop price belongs to the dominant leg.
    pub fn compute(
        position: &Position,
        current_price: f64,
        total_account_value: f64,
        volatility_adjusted_fraction: f64,
    ) -> Self {
        let long_stop = position.long_stop_price();
        let short_stop = position.short_stop_price();

        let long_loss = (current_price - long_stop).max(0.0) * position.long_qty;
        let short_loss = (short_stop - current_price).max(0.0) * position.short_qty;
        let potential_loss = long_loss + short_loss;

        let current_exposure = position.gross_exposure(current_price);
        let position_limit = total_account_value * volatility_adjusted_fraction;
        let remaining = position_limit - current_exposure - potential_loss;

        let stop_loss_price = match position.dominant_side() {
            Side::Long => long_stop,
            Side::Short => short_stop,
        };

        Self {
            stop_loss_price,
            potential_loss,
            position_limit,
            remaining_position_limit: remaining.max(0.0),
        }
    }
}
