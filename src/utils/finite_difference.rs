//! Finite difference methods for numerical differentiation.
//!
//! The binding model has no closed-form derivative with respect to `Kd` or
//! `Kx` (the free receptor count comes out of a root finder), so every Jacobian
//! in this crate is a finite-difference approximation. Steps are relative to
//! the parameter magnitude because the fitted values span many decades.

use ndarray::{Array1, Array2};

use crate::error::{BindingError, Result};
use crate::problem::Problem;

/// Default relative step size for finite differences.
pub const DEFAULT_EPSILON: f64 = 1e-8;

fn step_size(param: f64, eps: f64) -> f64 {
    if param.abs() > eps {
        param.abs() * eps
    } else {
        eps
    }
}

fn check_len(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(BindingError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            expected, got
        )));
    }
    Ok(())
}

/// Compute the Jacobian matrix using forward finite differences.
///
/// `J[i, j] = ∂residual[i] / ∂param[j]`, one extra evaluation per parameter.
pub fn jacobian<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let residuals = problem.eval(params)?;
    jacobian_at(problem, params, &residuals, epsilon)
}

/// Forward-difference Jacobian reusing residuals already evaluated at `params`.
pub fn jacobian_at<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n_params = params.len();
    let n_residuals = problem.residual_count();
    check_len(n_residuals, residuals.len())?;

    let mut jac = Array2::zeros((n_residuals, n_params));

    for j in 0..n_params {
        let h = step_size(params[j], eps);
        let mut perturbed = params.clone();
        perturbed[j] += h;
        // Use the step actually representable in floating point.
        let h = perturbed[j] - params[j];

        let residuals_perturbed = problem.eval(&perturbed)?;
        check_len(n_residuals, residuals_perturbed.len())?;

        for i in 0..n_residuals {
            jac[[i, j]] = (residuals_perturbed[i] - residuals[i]) / h;
        }
    }

    Ok(jac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// r_i = a * exp(b * x_i) - y_i
    struct Exponential {
        x: Array1<f64>,
    }

    impl Problem for Exponential {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            Ok(self.x.mapv(|x| params[0] * (params[1] * x).exp()))
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            self.x.len()
        }
    }

    #[test]
    fn test_forward_matches_analytic() {
        let problem = Exponential {
            x: array![0.0, 0.5, 1.0],
        };
        let params = array![2.0, -1.5];

        let forward = jacobian(&problem, &params, None).unwrap();

        for (i, &x) in problem.x.iter().enumerate() {
            let d_a = (params[1] * x).exp();
            let d_b = params[0] * x * (params[1] * x).exp();
            assert_relative_eq!(forward[[i, 0]], d_a, epsilon = 1e-6);
            assert_relative_eq!(forward[[i, 1]], d_b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_relative_step_on_small_parameters() {
        let problem = Exponential { x: array![1.0] };
        // d/da at a tiny amplitude is still exp(b)
        let jac = jacobian(&problem, &array![1e-7, 0.3], None).unwrap();
        assert_relative_eq!(jac[[0, 0]], 0.3f64.exp(), max_relative = 1e-6);
    }

    #[test]
    fn test_residual_length_checked() {
        let problem = Exponential { x: array![1.0, 2.0] };
        let err = jacobian_at(&problem, &array![1.0, 1.0], &array![0.0], None).unwrap_err();
        assert!(matches!(err, BindingError::DimensionMismatch(_)));
    }
}
