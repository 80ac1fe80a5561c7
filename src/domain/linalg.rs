//! Moore-Penrose pseudo-inverse on top of nalgebra's SVD.
//!
//! Singular values at or below `PINV_RCOND * max(sigma)` are treated as
//! zero, which keeps a singular or near-singular covariance from blowing up
//! while staying independent of the matrix scale.

use nalgebra::{DMatrix, SVD};

use crate::domain::error::SigallocError;

/// Relative cutoff for small singular values.
pub const PINV_RCOND: f64 = 1e-12;

const MAX_SVD_ITERATIONS: usize = 1_000;

/// Pseudo-inverse of `matrix`. Directions whose singular value falls under
/// the cutoff are dropped instead of inverted, so a zero matrix maps to zero.
pub fn pseudo_inverse(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>, SigallocError> {
    if matrix.is_empty() {
        return Ok(matrix.transpose());
    }
    let svd = SVD::try_new(
        matrix.clone(),
        true,
        true,
        f64::EPSILON,
        MAX_SVD_ITERATIONS,
    )
    .ok_or_else(|| SigallocError::InvalidCovariance {
        reason: "singular value decomposition did not converge".into(),
    })?;

    let cutoff = PINV_RCOND * svd.singular_values.max();
    svd.pseudo_inverse(cutoff)
        .map_err(|reason| SigallocError::InvalidCovariance {
            reason: reason.to_string(),
        })
}
