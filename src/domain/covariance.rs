//! Ticker-ordered covariance matrix of returns.
//!
//! The matrix is supplied by a market-data collaborator (or estimated here
//! from return series). It must be square, finite and symmetric; it may be
//! singular.

use nalgebra::DMatrix;

use crate::domain::error::SigallocError;

/// Symmetry tolerance, relative to the larger entry once it exceeds 1.
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CovarianceMatrix {
    tickers: Vec<String>,
    #[cfg_attr(feature = "serde", serde(with = "rows"))]
    matrix: DMatrix<f64>,
}

impl CovarianceMatrix {
    /// Validates `rows` against `tickers` and wraps them.
    pub fn new(tickers: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, SigallocError> {
        if rows.len() != tickers.len() {
            return Err(SigallocError::DimensionMismatch {
                what: "covariance rows".into(),
                expected: tickers.len(),
                actual: rows.len(),
            });
        }
        for row in &rows {
            if row.len() != tickers.len() {
                return Err(SigallocError::DimensionMismatch {
                    what: "covariance columns".into(),
                    expected: tickers.len(),
                    actual: row.len(),
                });
            }
        }
        let n = tickers.len();
        let matrix = DMatrix::from_fn(n, n, |i, j| rows[i][j]);

        for i in 0..n {
            for j in 0..n {
                let v = matrix[(i, j)];
                if !v.is_finite() {
                    return Err(SigallocError::InvalidCovariance {
                        reason: format!("non-finite entry at ({i}, {j})"),
                    });
                }
                let mirror = matrix[(j, i)];
                let scale = v.abs().max(mirror.abs()).max(1.0);
                if j > i && (v - mirror).abs() > SYMMETRY_TOLERANCE * scale {
                    return Err(SigallocError::InvalidCovariance {
                        reason: format!(
                            "matrix is not symmetric: ({i}, {j}) = {v}, ({j}, {i}) = {mirror}"
                        ),
                    });
                }
            }
        }

        Ok(Self { tickers, matrix })
    }

    /// Sample covariance (N-1 denominator) of per-ticker return series.
    ///
    /// Series of different lengths are aligned on their common trailing
    /// window, so the most recent observations line up.
    pub fn from_returns(
        tickers: Vec<String>,
        returns: &[Vec<f64>],
    ) -> Result<Self, SigallocError> {
        if returns.len() != tickers.len() {
            return Err(SigallocError::DimensionMismatch {
                what: "return series".into(),
                expected: tickers.len(),
                actual: returns.len(),
            });
        }

        let len = returns.iter().map(Vec::len).min().unwrap_or(0);
        if len < 2 {
            let ticker = tickers
                .iter()
                .zip(returns)
                .find(|(_, r)| r.len() == len)
                .map(|(t, _)| t.clone())
                .unwrap_or_default();
            return Err(SigallocError::InsufficientHistory {
                ticker,
                points: len + 1,
                minimum: 3,
            });
        }

        let aligned: Vec<&[f64]> = returns.iter().map(|r| &r[r.len() - len..]).collect();
        let means: Vec<f64> = aligned
            .iter()
            .map(|r| r.iter().sum::<f64>() / len as f64)
            .collect();

        let n = tickers.len();
        let mut rows = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i..n {
                let cov = aligned[i]
                    .iter()
                    .zip(aligned[j])
                    .map(|(a, b)| (a - means[i]) * (b - means[j]))
                    .sum::<f64>()
                    / (len - 1) as f64;
                rows[i][j] = cov;
                rows[j][i] = cov;
            }
        }

        Self::new(tickers, rows)
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dim(&self) -> usize {
        self.tickers.len()
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix[(row, col)]
    }

    pub fn diagonal(&self) -> Vec<f64> {
        self.matrix.diagonal().iter().copied().collect()
    }

    /// Returns a copy whose rows and columns follow `order`.
    pub fn reordered(&self, order: &[String]) -> Result<Self, SigallocError> {
        if order.len() != self.dim() {
            return Err(SigallocError::DimensionMismatch {
                what: "ticker list".into(),
                expected: self.dim(),
                actual: order.len(),
            });
        }
        let mut index = Vec::with_capacity(order.len());
        for ticker in order {
            let pos = self
                .tickers
                .iter()
                .position(|t| t == ticker)
                .ok_or_else(|| SigallocError::InvalidCovariance {
                    reason: format!("no covariance entry for ticker {ticker}"),
                })?;
            index.push(pos);
        }
        let rows = index
            .iter()
            .map(|&i| index.iter().map(|&j| self.matrix[(i, j)]).collect())
            .collect();
        Self::new(order.to_vec(), rows)
    }

    /// Checks that this matrix lines up with `tickers`, reordering it when it
    /// holds the same tickers in a different order.
    pub fn aligned_to(&self, tickers: &[String]) -> Result<Self, SigallocError> {
        if self.tickers == tickers {
            return Ok(self.clone());
        }
        self.reordered(tickers)
    }
}

#[cfg(feature = "serde")]
mod rows {
    use nalgebra::DMatrix;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(m: &DMatrix<f64>, s: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<Vec<f64>> = m
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();
        rows.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DMatrix<f64>, D::Error> {
        let rows = Vec::<Vec<f64>>::deserialize(d)?;
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return Err(serde::de::Error::custom("covariance rows must form a square matrix"));
        }
        Ok(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
    }
}
