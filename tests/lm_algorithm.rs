//! Integration tests for the Levenberg-Marquardt optimizer on generic problems.

mod common;

use approx::assert_relative_eq;
use ndarray::{array, Array1, Array2};
use stonefit_rs::lm::{ConvergenceStatus, LevenbergMarquardt, LmConfig};
use stonefit_rs::parameters::Bounds;
use stonefit_rs::problem::{BoundedProblem, PinnedProblem};
use stonefit_rs::{BindingError, Problem, Result};

/// f(x) = a*x + b, with an analytic Jacobian
struct LinearProblem {
    x_data: Array1<f64>,
    y_data: Array1<f64>,
}

impl Problem for LinearProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != 2 {
            return Err(BindingError::DimensionMismatch(format!(
                "Expected 2 parameters, got {}",
                params.len()
            )));
        }
        Ok(self.x_data.mapv(|x| params[0] * x + params[1]) - &self.y_data)
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        self.x_data.len()
    }

    fn jacobian(&self, _params: &Array1<f64>) -> Result<Array2<f64>> {
        let n = self.x_data.len();
        Ok(Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                self.x_data[i]
            } else {
                1.0
            }
        }))
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}

/// (1 - x)² + 100(y - x²)² as two residuals
struct RosenbrockProblem;

impl Problem for RosenbrockProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let (x, y) = (params[0], params[1]);
        Ok(array![1.0 - x, 10.0 * (y - x.powi(2))])
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        2
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        Ok(array![[-1.0, 0.0], [-20.0 * params[0], 10.0]])
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}

/// a * exp(-b * x), finite-difference Jacobian
struct ExponentialProblem {
    x_data: Array1<f64>,
    y_data: Array1<f64>,
}

impl Problem for ExponentialProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(self.x_data.mapv(|x| params[0] * (-params[1] * x).exp()) - &self.y_data)
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        self.x_data.len()
    }
}

#[test]
fn test_linear_fitting() {
    common::init_logging();
    let problem = LinearProblem {
        x_data: array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        y_data: array![2.1, 4.9, 8.05, 10.8, 14.1, 17.0],
    };

    let result = LevenbergMarquardt::new().minimize(&problem, array![1.0, 1.0]).unwrap();

    assert!(result.success, "{}", result);
    assert_relative_eq!(result.params[0], 3.0, epsilon = 0.1);
    assert_relative_eq!(result.params[1], 2.0, epsilon = 0.1);
    assert!(result.cost < 0.1);
    assert_relative_eq!(result.sum_squares(), 2.0 * result.cost);
}

#[test]
fn test_rosenbrock_optimization() {
    let lm = LevenbergMarquardt::new().with_max_iterations(200);
    let result = lm.minimize(&RosenbrockProblem, array![-1.2, 1.0]).unwrap();

    assert!(result.success, "{}", result);
    assert_relative_eq!(result.params[0], 1.0, epsilon = 1e-4);
    assert_relative_eq!(result.params[1], 1.0, epsilon = 1e-4);
    assert!(result.cost < 1e-8);
}

#[test]
fn test_exponential_fitting() {
    let problem = ExponentialProblem {
        x_data: array![0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0],
        y_data: array![2.02, 1.67, 1.21, 0.98, 0.81, 0.62, 0.45, 0.39, 0.29],
    };

    let result = LevenbergMarquardt::new().minimize(&problem, array![1.0, 0.1]).unwrap();

    assert!(result.success, "{}", result);
    assert_relative_eq!(result.params[0], 2.0, epsilon = 0.1);
    assert_relative_eq!(result.params[1], 0.5, epsilon = 0.1);
    assert!(result.cost < 0.01);
}

#[test]
fn test_bad_initial_guess() {
    let problem = LinearProblem {
        x_data: array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        y_data: array![2.0, 5.0, 8.0, 11.0, 14.0, 17.0],
    };

    let result = LevenbergMarquardt::new().minimize(&problem, array![100.0, -50.0]).unwrap();

    assert!(result.success, "{}", result);
    assert_relative_eq!(result.params[0], 3.0, epsilon = 1e-8);
    assert_relative_eq!(result.params[1], 2.0, epsilon = 1e-8);
}

#[test]
fn test_custom_config() {
    let problem = LinearProblem {
        x_data: array![0.0, 1.0, 2.0, 3.0, 4.0],
        y_data: array![1.0, 3.0, 5.0, 7.0, 9.0],
    };
    let config = LmConfig {
        max_iterations: 10,
        ftol: 1e-2,
        xtol: 1e-2,
        gtol: 1e-2,
        initial_lambda: 1.0,
        ..LmConfig::default()
    };

    let result = LevenbergMarquardt::with_config(config)
        .minimize(&problem, array![1.0, 0.0])
        .unwrap();

    assert!(result.success, "{}", result);
    assert!(result.iterations <= 10);
    assert_relative_eq!(result.params[0], 2.0, epsilon = 0.2);
    assert_relative_eq!(result.params[1], 1.0, epsilon = 0.2);
}

#[test]
fn test_bounded_problem_with_interior_optimum() {
    let problem = LinearProblem {
        x_data: array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        y_data: array![2.0, 5.0, 8.0, 11.0, 14.0, 17.0],
    };
    let bounds = [Bounds::new(0.0, 10.0).unwrap(), Bounds::unbounded()];
    let bounded = BoundedProblem::new(&problem, &bounds).unwrap();

    let start = bounded.to_internal(&array![1.0, 0.0]).unwrap();
    let result = LevenbergMarquardt::new().minimize(&bounded, start).unwrap();
    let params = bounded.to_external(&result.params);

    assert!(result.success, "{}", result);
    assert_relative_eq!(params[0], 3.0, epsilon = 1e-8);
    assert_relative_eq!(params[1], 2.0, epsilon = 1e-8);
}

#[test]
fn test_pinned_problem_optimizes_the_rest() {
    let problem = LinearProblem {
        x_data: array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        y_data: array![2.0, 5.0, 8.0, 11.0, 14.0, 17.0],
    };
    let pinned = PinnedProblem::new(&problem, 1, 0.0).unwrap();

    let result = LevenbergMarquardt::new().minimize(&pinned, array![1.0]).unwrap();
    let full = pinned.expand(&result.params);

    assert_eq!(full[1], 0.0);
    // Least-squares slope through the origin: Σxy / Σx²
    assert_relative_eq!(full[0], 195.0 / 55.0, max_relative = 1e-8);
    assert!(matches!(
        result.status,
        ConvergenceStatus::ParameterConvergence
            | ConvergenceStatus::FunctionValueConvergence
            | ConvergenceStatus::GradientConvergence
    ));
}
