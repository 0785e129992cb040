//! # Covariance matrix calculations
//!
//! Linearized parameter covariance from the Jacobian at a least-squares
//! solution:
//!
//! ```text
//! covar = redchi · (JᵀJ)⁻¹
//! ```
//!
//! where `redchi` is the reduced chi-square. The binding parameters differ by
//! several orders of magnitude, so `JᵀJ` is inverted after scaling it to unit
//! diagonal.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use crate::error::{BindingError, Result};
use crate::utils::matrix_convert::{nalgebra_to_ndarray, ndarray_to_nalgebra};

/// Smallest accepted ratio of extreme eigenvalues of the scaled `JᵀJ`.
const MIN_RCOND: f64 = 1e-12;

/// Calculate the covariance matrix from a Jacobian and the reduced chi-square.
///
/// Fails if `JᵀJ` is singular, for example when a parameter has no influence
/// on the residuals.
pub fn calculate_covariance(jacobian: &Array2<f64>, redchi: f64) -> Result<Array2<f64>> {
    let jtj = jacobian.t().dot(jacobian);
    let n = jtj.nrows();

    let scale: Vec<f64> = (0..n).map(|i| jtj[[i, i]].sqrt()).collect();
    if let Some(i) = scale.iter().position(|&s| !(s > 0.0 && s.is_finite())) {
        return Err(BindingError::LinearAlgebraError(format!(
            "parameter {} has no effect on the residuals",
            i
        )));
    }

    let raw = ndarray_to_nalgebra(&jtj);
    let scaled = DMatrix::from_fn(n, n, |i, j| raw[(i, j)] / (scale[i] * scale[j]));
    let eigenvalues = scaled.clone().symmetric_eigen().eigenvalues;
    if !(eigenvalues.min() > MIN_RCOND * eigenvalues.max()) {
        return Err(BindingError::LinearAlgebraError(format!(
            "JᵀJ is singular to working precision (eigenvalues {:e}..{:e})",
            eigenvalues.min(),
            eigenvalues.max()
        )));
    }

    let inverse = scaled
        .cholesky()
        .map(|c| c.inverse())
        .ok_or_else(|| BindingError::LinearAlgebraError("JᵀJ is singular".to_string()))?;

    let inverse = nalgebra_to_ndarray(&inverse);
    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        redchi * inverse[[i, j]] / (scale[i] * scale[j])
    }))
}

/// Correlation matrix: `correl[i, j] = covar[i, j] / sqrt(covar[i, i] · covar[j, j])`.
///
/// Entries involving a parameter with zero variance are 0 off the diagonal.
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            return 1.0;
        }
        let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
        if denom > 0.0 {
            covar[[i, j]] / denom
        } else {
            0.0
        }
    })
}

/// Standard errors: square roots of the covariance diagonal.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar.diag().mapv(|v| if v > 0.0 { v.sqrt() } else { 0.0 })
}
