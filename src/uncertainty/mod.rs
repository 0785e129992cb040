//! # Uncertainty calculation
//!
//! Linearized uncertainties of fitted parameters: covariance, standard
//! errors and correlations from the Jacobian at the solution, scaled by the
//! reduced chi-square `SSR / (m - n)`. These are asymptotic estimates; the
//! bootstrap in [`crate::resampling`] gives an empirical alternative.

mod covariance;

pub use covariance::{calculate_correlation, calculate_covariance, standard_errors_from_covariance};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};
use crate::fit::{BindingProblem, FitResult};
use crate::parameters::ParamIndex;
use crate::problem::Problem;
use crate::utils::finite_difference;

/// Linearized uncertainty of a least-squares solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyResult {
    /// Parameters the uncertainty was evaluated at
    pub params: Array1<f64>,
    /// Covariance matrix for the parameters
    pub covariance: Array2<f64>,
    /// Standard errors for each parameter
    pub standard_errors: Array1<f64>,
    /// Correlation matrix derived from covariance
    pub correlation: Array2<f64>,
    /// Sum of squared residuals at the solution
    pub chisqr: f64,
    /// Reduced chi-square (chisqr / nfree)
    pub redchi: f64,
    /// Degrees of freedom (residuals - parameters)
    pub nfree: usize,
}

impl UncertaintyResult {
    /// Standard error of one binding parameter.
    pub fn standard_error(&self, index: ParamIndex) -> f64 {
        self.standard_errors[index.index()]
    }

    /// Correlation between two binding parameters.
    pub fn correlation_between(&self, a: ParamIndex, b: ParamIndex) -> f64 {
        self.correlation[[a.index(), b.index()]]
    }

    /// `value ± sigma · standard error` for one binding parameter.
    pub fn interval(&self, index: ParamIndex, sigma: f64) -> (f64, f64) {
        let value = self.params[index.index()];
        let half = sigma * self.standard_error(index);
        (value - half, value + half)
    }
}

/// Linearized uncertainty of any problem at `params`.
///
/// The Jacobian is a forward difference with relative step `diff_step`.
/// Fails if there are no more residuals than parameters or `JᵀJ` is singular.
pub fn uncertainty_at<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    diff_step: Option<f64>,
) -> Result<UncertaintyResult> {
    let n_params = problem.parameter_count();
    let n_residuals = problem.residual_count();
    if n_residuals <= n_params {
        return Err(BindingError::InvalidInput(format!(
            "{} residuals leave no degrees of freedom for {} parameters",
            n_residuals, n_params
        )));
    }

    let residuals = problem.eval(params)?;
    let jacobian = finite_difference::jacobian_at(problem, params, &residuals, diff_step)?;

    let nfree = n_residuals - n_params;
    let chisqr: f64 = residuals.iter().map(|r| r * r).sum();
    let redchi = chisqr / nfree as f64;

    let covariance = calculate_covariance(&jacobian, redchi)?;
    Ok(UncertaintyResult {
        params: params.clone(),
        standard_errors: standard_errors_from_covariance(&covariance),
        correlation: calculate_correlation(&covariance),
        covariance,
        chisqr,
        redchi,
        nfree,
    })
}

/// Linearized uncertainty of a binding fit.
pub fn fit_uncertainty(problem: &BindingProblem<'_>, fit: &FitResult) -> Result<UncertaintyResult> {
    uncertainty_at(problem, &fit.params.to_array(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// y = a·x + b against fixed data
    struct Line {
        x: Array1<f64>,
        y: Array1<f64>,
    }

    impl Problem for Line {
        fn eval(&self, p: &Array1<f64>) -> Result<Array1<f64>> {
            Ok(self.x.mapv(|x| p[0] * x + p[1]) - &self.y)
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            self.x.len()
        }
    }

    #[test]
    fn test_linear_regression_standard_errors() {
        let line = Line {
            x: array![1.0, 2.0, 3.0, 4.0, 5.0],
            y: array![5.1, 7.0, 8.9, 11.2, 13.0],
        };
        // Ordinary least squares solution
        let result = uncertainty_at(&line, &array![2.0, 3.04], None).unwrap();

        let sxx = 10.0; // Σ(x - x̄)²
        let s2 = result.redchi;
        assert_eq!(result.nfree, 3);
        assert_relative_eq!(result.standard_errors[0], (s2 / sxx).sqrt(), max_relative = 1e-5);
        assert_relative_eq!(
            result.standard_errors[1],
            (s2 * (1.0 / 5.0 + 9.0 / sxx)).sqrt(),
            max_relative = 1e-5
        );
        assert!(result.correlation[[0, 1]] < 0.0);
        assert_eq!(result.correlation[[1, 1]], 1.0);
        assert_relative_eq!(result.chisqr, 0.052, max_relative = 1e-9);
    }

    #[test]
    fn test_needs_degrees_of_freedom() {
        let line = Line {
            x: array![1.0, 2.0],
            y: array![1.0, 2.0],
        };
        let err = uncertainty_at(&line, &array![1.0, 0.0], None).unwrap_err();
        assert!(matches!(err, BindingError::InvalidInput(_)));
    }
}
