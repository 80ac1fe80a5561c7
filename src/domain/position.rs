//! Held position as reported by the portfolio-state collaborator.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub ticker: String,
    pub long_qty: f64,
    pub short_qty: f64,
    pub long_cost_basis: f64,
    pub short_cost_basis: f64,
    pub stop_loss_pct: f64,
}

impl Position {
    /// A position with no holdings.
    pub fn flat(ticker: &str, stop_loss_pct: f64) -> Self {
        Self {
            ticker: ticker.to_string(),
            long_qty: 0.0,
            short_qty: 0.0,
            long_cost_basis: 0.0,
            short_cost_basis: 0.0,
            stop_loss_pct,
        }
    }

    pub fn long(ticker: &str, qty: f64, cost_basis: f64, stop_loss_pct: f64) -> Self {
        Self {
            long_qty: qty,
            long_cost_basis: cost_basis,
            ..Self::flat(ticker, stop_loss_pct)
        }
    }

    pub fn short(ticker: &str, qty: f64, cost_basis: f64, stop_loss_pct: f64) -> Self {
        Self {
            short_qty: qty,
            short_cost_basis: cost_basis,
            ..Self::flat(ticker, stop_loss_pct)
        }
    }

    pub fn is_flat(&self) -> bool {
        self.long_qty == 0.0 && self.short_qty == 0.0
    }

    /// The side carrying the larger quantity; ties (including flat) are long.
    pub fn dominant_side(&self) -> Side {
        if self.short_qty > self.long_qty {
            Side::Short
        } else {
            Side::Long
        }
    }

    pub fn long_exposure(&self, price: f64) -> f64 {
        self.long_qty * price
    }

    pub fn short_exposure(&self, price: f64) -> f64 {
        self.short_qty * price
    }

    /// Gross market value of both legs.
    pub fn gross_exposure(&self, price: f64) -> f64 {
        self.long_exposure(price) + self.short_exposure(price)
    }

    pub fn long_stop_price(&self) -> f64 {
        self.long_cost_basis * (1.0 - self.stop_loss_pct)
    }

    pub fn short_stop_price(&self) -> f64 {
        self.short_cost_basis * (1.0 + self.stop_loss_pct)
    }
}
