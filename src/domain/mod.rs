//! Core domain types and logic.

pub mod signal;
pub mod linalg;
pub mod covariance;
pub mod optimizer;
pub mod ohlcv;
pub mod volatility;
pub mod tail_risk;
pub mod position;
pub mod portfolio;
pub mod position_limit;
pub mod risk_analysis;
pub mod universe;
pub mod config_validation;
pub mod error;
