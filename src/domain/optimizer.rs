//! Portfolio optimizers driven by aggregated analyst signals.
//!
//! Mean-variance maximises `mu'w - lambda * w'Sigma w` subject to `1'w = 1`
//! in closed form:
//!
//! ```text
//! A     = 1' Sigma+ 1
//! B     = 1' Sigma+ mu
//! gamma = (B - 2 lambda) / A
//! w     = Sigma+ (mu - gamma 1) / (2 lambda)
//! ```
//!
//! `Sigma+` is the Moore-Penrose pseudo-inverse, so a singular covariance
//! still yields weights. Risk parity weights by inverse volatility and signs
//! each weight by the direction of its expected return.

use nalgebra::DVector;

use crate::domain::covariance::CovarianceMatrix;
use crate::domain::error::SigallocError;
use crate::domain::linalg::{pseudo_inverse, PINV_RCOND};
use crate::domain::signal::AggregatedSignals;

/// Signed weight per ticker, in ticker order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioWeights {
    tickers: Vec<String>,
    weights: Vec<f64>,
}

impl PortfolioWeights {
    pub fn new(tickers: Vec<String>, weights: Vec<f64>) -> Result<Self, SigallocError> {
        if tickers.len() != weights.len() {
            return Err(SigallocError::DimensionMismatch {
                what: "weights".into(),
                expected: tickers.len(),
                actual: weights.len(),
            });
        }
        Ok(Self { tickers, weights })
    }

    pub fn zeros(tickers: &[String]) -> Self {
        Self {
            tickers: tickers.to_vec(),
            weights: vec![0.0; tickers.len()],
        }
    }

    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.weights[i])
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.tickers
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn gross(&self) -> f64 {
        self.weights.iter().map(|w| w.abs()).sum()
    }

    pub fn is_flat(&self) -> bool {
        self.weights.iter().all(|&w| w == 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "method", rename_all = "snake_case"))]
pub enum AllocationMethod {
    MeanVariance { risk_aversion: f64 },
    RiskParity,
}

impl AllocationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            AllocationMethod::MeanVariance { .. } => "mean_variance",
            AllocationMethod::RiskParity => "risk_parity",
        }
    }
}

/// Aggregates `signals` over `tickers` and allocates with `method`.
pub fn optimize(
    signals: &AggregatedSignals,
    covariance: &CovarianceMatrix,
    tickers: &[String],
    method: AllocationMethod,
) -> Result<PortfolioWeights, SigallocError> {
    let mu = signals.expected_returns(tickers);
    let cov = covariance.aligned_to(tickers)?;
    match method {
        AllocationMethod::MeanVariance { risk_aversion } => {
            mean_variance_weights(&mu, &cov, tickers, risk_aversion)
        }
        AllocationMethod::RiskParity => risk_parity_weights(&mu, &cov, tickers),
    }
}

fn check_dimensions(
    mu: &[f64],
    covariance: &CovarianceMatrix,
    tickers: &[String],
) -> Result<(), SigallocError> {
    if mu.len() != tickers.len() {
        return Err(SigallocError::DimensionMismatch {
            what: "expected returns".into(),
            expected: tickers.len(),
            actual: mu.len(),
        });
    }
    if covariance.dim() != tickers.len() {
        return Err(SigallocError::DimensionMismatch {
            what: "covariance".into(),
            expected: tickers.len(),
            actual: covariance.dim(),
        });
    }
    Ok(())
}

/// Closed-form mean-variance weights summing to one.
///
/// A zero `mu` means no conviction and returns all-zero weights.
pub fn mean_variance_weights(
    mu: &[f64],
    covariance: &CovarianceMatrix,
    tickers: &[String],
    risk_aversion: f64,
) -> Result<PortfolioWeights, SigallocError> {
    if !risk_aversion.is_finite() || risk_aversion <= 0.0 {
        return Err(SigallocError::InvalidRiskAversion {
            value: risk_aversion,
        });
    }
    check_dimensions(mu, covariance, tickers)?;

    if mu.iter().all(|&m| m == 0.0) {
        return Ok(PortfolioWeights::zeros(tickers));
    }

    let inv = pseudo_inverse(covariance.matrix())?;
    let inv_ones = inv.column_sum();
    let inv_mu = &inv * DVector::from_column_slice(mu);

    let a = inv_ones.sum();
    let b = inv_mu.sum();
    // Sigma+ annihilates the budget direction; the constraint cannot bind.
    let magnitude = inv.iter().map(|x| x.abs()).sum::<f64>();
    if a == 0.0 || a.abs() <= PINV_RCOND * magnitude {
        return Err(SigallocError::InvalidCovariance {
            reason: "pseudo-inverse has no component along the budget constraint".into(),
        });
    }
    let gamma = (b - 2.0 * risk_aversion) / a;

    let scale = 1.0 / (2.0 * risk_aversion);
    let weights = inv_mu
        .iter()
        .zip(inv_ones.iter())
        .map(|(im, io)| scale * (im - gamma * io))
        .collect();

    PortfolioWeights::new(tickers.to_vec(), weights)
}

/// Inverse-volatility weights signed by expected-return direction, with
/// absolute values summing to one. All-zero `mu` yields all-zero weights.
pub fn risk_parity_weights(
    mu: &[f64],
    covariance: &CovarianceMatrix,
    tickers: &[String],
) -> Result<PortfolioWeights, SigallocError> {
    check_dimensions(mu, covariance, tickers)?;

    let mut base = Vec::with_capacity(tickers.len());
    for (ticker, variance) in tickers.iter().zip(covariance.diagonal()) {
        if variance <= 0.0 {
            return Err(SigallocError::InvalidCovariance {
                reason: format!("non-positive variance {variance} for {ticker}"),
            });
        }
        base.push(1.0 / variance.sqrt());
    }
    let base_total: f64 = base.iter().sum();

    let mut weights: Vec<f64> = base
        .iter()
        .zip(mu)
        .map(|(b, &m)| b / base_total * sign(m))
        .collect();

    let gross: f64 = weights.iter().map(|w| w.abs()).sum();
    if gross > 0.0 {
        for w in &mut weights {
            *w /= gross;
        }
    }

    PortfolioWeights::new(tickers.to_vec(), weights)
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Signal;
    use approx::assert_abs_diff_eq;

    fn tickers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sample_cov() -> CovarianceMatrix {
        CovarianceMatrix::new(
            tickers(&["A", "B"]),
            vec![vec![0.1, 0.05], vec![0.05, 0.2]],
        )
        .unwrap()
    }

    fn sample_signals() -> AggregatedSignals {
        AggregatedSignals::new()
            .with_signal("agent1", "A", Signal::bullish(60.0))
            .with_signal("agent1", "B", Signal::bearish(60.0))
            .with_signal("agent2", "A", Signal::bullish(80.0))
            .with_signal("agent2", "B", Signal::bearish(80.0))
    }

    #[test]
    fn mean_variance_closed_form_two_assets() {
        // Sigma^-1 = [[80/7, -20/7], [-20/7, 40/7]], mu = [1.4, -1.4]
        // A = 80/7, B = 8, gamma = 0.525, w = [7.75, -6.75]
        let w = mean_variance_weights(&[1.4, -1.4], &sample_cov(), &tickers(&["A", "B"]), 1.0)
            .unwrap();
        assert_abs_diff_eq!(w.weights()[0], 7.75, epsilon = 1e-9);
        assert_abs_diff_eq!(w.weights()[1], -6.75, epsilon = 1e-9);
        assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn mean_variance_zero_mu_is_flat() {
        let w = mean_variance_weights(&[0.0, 0.0], &sample_cov(), &tickers(&["A", "B"]), 1.0)
            .unwrap();
        assert!(w.is_flat());
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn mean_variance_rejects_zero_risk_aversion() {
        let err = mean_variance_weights(&[1.0, 0.0], &sample_cov(), &tickers(&["A", "B"]), 0.0)
            .unwrap_err();
        assert!(matches!(err, SigallocError::InvalidRiskAversion { .. }));
    }

    #[test]
    fn mean_variance_rejects_negative_risk_aversion() {
        let err = mean_variance_weights(&[1.0, 0.0], &sample_cov(), &tickers(&["A", "B"]), -2.0)
            .unwrap_err();
        assert!(matches!(err, SigallocError::InvalidRiskAversion { .. }));
    }

    #[test]
    fn mean_variance_rejects_mismatched_mu() {
        let err = mean_variance_weights(&[1.0], &sample_cov(), &tickers(&["A", "B"]), 1.0)
            .unwrap_err();
        assert!(matches!(
            err,
            SigallocError::DimensionMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn mean_variance_rejects_mismatched_covariance() {
        let err = mean_variance_weights(
            &[1.0, 0.5, 0.2],
            &sample_cov(),
            &tickers(&["A", "B", "C"]),
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, SigallocError::DimensionMismatch { .. }));
    }

    #[test]
    fn mean_variance_singular_covariance_still_sums_to_one() {
        let cov = CovarianceMatrix::new(
            tickers(&["A", "B", "C"]),
            vec![
                vec![0.04, 0.04, 0.01],
                vec![0.04, 0.04, 0.01],
                vec![0.01, 0.01, 0.09],
            ],
        )
        .unwrap();
        let w = mean_variance_weights(&[0.5, 0.5, -0.3], &cov, &tickers(&["A", "B", "C"]), 2.0)
            .unwrap();
        assert!(w.weights().iter().all(|x| x.is_finite()));
        assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn mean_variance_accepts_large_scale_covariance() {
        // Variances in price units; Sigma+ entries are around 1e-17.
        let cov = CovarianceMatrix::new(
            tickers(&["A", "B"]),
            vec![vec![1e17, 0.0], vec![0.0, 2e17]],
        )
        .unwrap();
        let w = mean_variance_weights(&[1.4, -1.4], &cov, &tickers(&["A", "B"]), 1.0).unwrap();
        assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(w.weights()[0], 2.0 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(w.weights()[1], 1.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn mean_variance_rejects_zero_covariance() {
        let cov = CovarianceMatrix::new(tickers(&["A", "B"]), vec![vec![0.0; 2]; 2]).unwrap();
        let err = mean_variance_weights(&[1.0, -1.0], &cov, &tickers(&["A", "B"]), 1.0)
            .unwrap_err();
        assert!(matches!(err, SigallocError::InvalidCovariance { .. }));
    }

    #[test]
    fn mean_variance_higher_risk_aversion_shrinks_tilt() {
        let t = tickers(&["A", "B"]);
        let low = mean_variance_weights(&[1.4, -1.4], &sample_cov(), &t, 1.0).unwrap();
        let high = mean_variance_weights(&[1.4, -1.4], &sample_cov(), &t, 10.0).unwrap();
        assert!(high.gross() < low.gross());
    }

    #[test]
    fn risk_parity_inverse_volatility() {
        let w = risk_parity_weights(&[1.4, -1.4], &sample_cov(), &tickers(&["A", "B"])).unwrap();
        let a = 1.0 / 0.1_f64.sqrt();
        let b = 1.0 / 0.2_f64.sqrt();
        assert_abs_diff_eq!(w.weights()[0], a / (a + b), epsilon = 1e-12);
        assert_abs_diff_eq!(w.weights()[1], -b / (a + b), epsilon = 1e-12);
        assert_abs_diff_eq!(w.gross(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn risk_parity_zero_sign_drops_ticker_and_renormalises() {
        let w = risk_parity_weights(&[0.5, 0.0], &sample_cov(), &tickers(&["A", "B"])).unwrap();
        assert_abs_diff_eq!(w.weights()[0], 1.0, epsilon = 1e-12);
        assert_eq!(w.weights()[1], 0.0);
    }

    #[test]
    fn risk_parity_all_zero_is_flat() {
        let w = risk_parity_weights(&[0.0, 0.0], &sample_cov(), &tickers(&["A", "B"])).unwrap();
        assert!(w.is_flat());
    }

    #[test]
    fn risk_parity_rejects_zero_variance() {
        let cov = CovarianceMatrix::new(
            tickers(&["A", "B"]),
            vec![vec![0.1, 0.0], vec![0.0, 0.0]],
        )
        .unwrap();
        let err = risk_parity_weights(&[1.0, 1.0], &cov, &tickers(&["A", "B"])).unwrap_err();
        assert!(matches!(err, SigallocError::InvalidCovariance { .. }));
    }

    #[test]
    fn optimize_dispatches_and_reorders_covariance() {
        let order = tickers(&["B", "A"]);
        let w = optimize(
            &sample_signals(),
            &sample_cov(),
            &order,
            AllocationMethod::RiskParity,
        )
        .unwrap();
        assert_eq!(w.tickers(), &order[..]);
        assert!(w.get("A").unwrap() > 0.0);
        assert!(w.get("B").unwrap() < 0.0);
    }

    #[test]
    fn optimize_mean_variance_signs() {
        let w = optimize(
            &sample_signals(),
            &sample_cov(),
            &tickers(&["A", "B"]),
            AllocationMethod::MeanVariance { risk_aversion: 1.0 },
        )
        .unwrap();
        assert!(w.get("A").unwrap() > 0.0);
        assert!(w.get("B").unwrap() < 0.0);
        assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn weights_lookup_and_iter() {
        let w = PortfolioWeights::new(tickers(&["X", "Y"]), vec![0.3, 0.7]).unwrap();
        assert_eq!(w.get("Y"), Some(0.7));
        assert_eq!(w.get("Z"), None);
        let collected: Vec<(&str, f64)> = w.iter().collect();
        assert_eq!(collected, vec![("X", 0.3), ("Y", 0.7)]);
    }

    #[test]
    fn weights_new_rejects_length_mismatch() {
        assert!(PortfolioWeights::new(tickers(&["X"]), vec![0.3, 0.7]).is_err());
    }

    #[test]
    fn method_names() {
        assert_eq!(AllocationMethod::RiskParity.name(), "risk_parity");
        assert_eq!(
            AllocationMethod::MeanVariance { risk_aversion: 1.0 }.name(),
            "mean_variance"
        );
    }
}
