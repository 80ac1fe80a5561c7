//! Account state read from the portfolio-state collaborator.

use std::collections::HashMap;

use super::position::Position;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Portfolio {
    pub cash: f64,
    /// Carried through for the execution collaborator. Position limits and
    /// account value are computed from cash and exposure only.
    pub margin_requirement: f64,
    /// Carried through like `margin_requirement`.
    pub margin_used: f64,
    pub positions: HashMap<String, Position>,
}

impl Portfolio {
    pub fn new(cash: f64) -> Self {
        Portfolio {
            cash,
            margin_requirement: 0.0,
            margin_used: 0.0,
            positions: HashMap::new(),
        }
    }

    pub fn add_position(&mut self, position: Position) {
        self.positions.insert(position.ticker.clone(), position);
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.add_position(position);
        self
    }

    pub fn get_position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    /// The held position for `ticker`, or a flat one carrying
    /// `default_stop_loss_pct`.
    pub fn position_or_flat(&self, ticker: &str, default_stop_loss_pct: f64) -> Position {
        self.positions
            .get(ticker)
            .cloned()
            .unwrap_or_else(|| Position::flat(ticker, default_stop_loss_pct))
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Cash plus gross exposure of every position with a known price.
    /// Positions missing from `price_map` are left out.
    pub fn total_account_value(&self, price_map: &HashMap<String, f64>) -> f64 {
        let exposure: f64 = self
            .positions
            .values()
            .filter_map(|pos| {
                price_map
                    .get(&pos.ticker)
                    .map(|&price| pos.gross_exposure(price))
            })
            .sum();
        self.cash + exposure
    }
}
