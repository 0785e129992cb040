//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! Each iteration solves the damped normal equations
//!
//! ```text
//! (JᵀJ + λ · diag(JᵀJ)) δ = -Jᵀr
//! ```
//!
//! with Marquardt's diagonal scaling, which makes the damping independent of
//! the units of each parameter. A step is accepted only if it lowers the sum of
//! squares; a trial point where the model cannot be evaluated counts as a
//! rejected step. A rejected step already below `xtol` ends the fit as
//! converged, since rounding in the sum of squares can hide a real decrease.

use log::{debug, trace};
use nalgebra::DVector;
use ndarray::{Array1, Array2};
use std::fmt;

use crate::error::{BindingError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference;
use crate::utils::matrix_convert::{nalgebra_vec_to_ndarray, ndarray_to_nalgebra};

use super::config::LmConfig;
use super::convergence::{scaled_gradient_norm, ConvergenceStatus};

/// Floor for diagonal scaling entries of parameters with a zero Jacobian column.
const MIN_DIAGONAL: f64 = 1e-300;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Half the sum of squared residuals
    pub cost: f64,

    /// Number of accepted steps
    pub iterations: usize,

    /// Number of function evaluations
    pub func_evals: usize,

    /// Why the optimizer stopped
    pub status: ConvergenceStatus,

    /// Whether the optimization converged
    pub success: bool,

    /// A message describing the result
    pub message: String,

    /// The Jacobian matrix at the solution (if requested)
    pub jacobian: Option<Array2<f64>>,
}

impl LmResult {
    /// Sum of squared residuals at the solution.
    pub fn sum_squares(&self) -> f64 {
        2.0 * self.cost
    }
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// Outcome of the inner damping loop.
enum Trial {
    /// A step that lowered the sum of squares: params, residuals, SSR, step.
    Accepted(Array1<f64>, Array1<f64>, f64, Array1<f64>),
    /// No acceptable step; the outer loop ends with this status.
    Stalled(ConvergenceStatus),
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for relative cost decrease.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for relative change in parameter values.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for the scaled gradient.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set whether to calculate and return the Jacobian at the solution.
    pub fn with_calc_jacobian(mut self, calc_jacobian: bool) -> Self {
        self.config.calc_jacobian = calc_jacobian;
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// Failure to evaluate the problem at `initial_params` is returned as an
    /// error. Running out of iterations or damping is not an error: it is
    /// reported through [`LmResult::status`] and [`LmResult::success`].
    pub fn minimize<P: Problem + ?Sized>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(BindingError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let criteria = self.config.criteria();
        let mut params = initial_params;
        let mut residuals = self.residuals(problem, &params)?;
        let mut ssr = sum_squares(&residuals);
        let mut func_evals = 1;
        if !ssr.is_finite() {
            return Err(BindingError::InvalidComputation(
                "Non-finite sum of squares at the initial parameters".to_string(),
            ));
        }

        let mut lambda = self.config.initial_lambda;
        let mut iterations = 0;

        let status = loop {
            if ssr == 0.0 {
                break ConvergenceStatus::ExactFit;
            }

            let jacobian = self.jacobian(problem, &params, &residuals)?;
            if !problem.has_custom_jacobian() {
                func_evals += n_params;
            }
            if jacobian.iter().any(|v| !v.is_finite()) {
                break ConvergenceStatus::NumericalError;
            }

            let jt = jacobian.t();
            let jtj = jt.dot(&jacobian);
            let gradient = jt.dot(&residuals);

            // No parameter moves the residuals, so there is nothing to fit.
            if jtj.diag().iter().all(|&d| d == 0.0) {
                break ConvergenceStatus::Degenerate;
            }

            let gradient_norm = scaled_gradient_norm(&jtj, &gradient, ssr);
            trace!(
                "LM iteration {}: sum of squares {:.6e}, scaled gradient {:.3e}, lambda {:.1e}",
                iterations,
                ssr,
                gradient_norm,
                lambda
            );
            if criteria.gradient_converged(gradient_norm) {
                break ConvergenceStatus::GradientConvergence;
            }

            // Raise the damping until a step lowers the cost.
            let outcome = loop {
                if let Some(step) = self.calculate_step(&jtj, &gradient, lambda) {
                    let trial = &params + &step;
                    func_evals += 1;
                    match problem.eval(&trial) {
                        Ok(trial_residuals) => {
                            if trial_residuals.len() != residuals.len() {
                                return Err(BindingError::DimensionMismatch(format!(
                                    "Expected {} residuals, got {}",
                                    residuals.len(),
                                    trial_residuals.len()
                                )));
                            }
                            let trial_ssr = sum_squares(&trial_residuals);
                            if trial_ssr < ssr {
                                break Trial::Accepted(trial, trial_residuals, trial_ssr, step);
                            }
                            if criteria.step_converged(&params, &step) {
                                break Trial::Stalled(ConvergenceStatus::ParameterConvergence);
                            }
                        }
                        Err(e) if e.is_evaluation_failure() => {
                            trace!("Rejected trial point {:?}: {}", trial, e);
                        }
                        Err(e) => return Err(e),
                    }
                }

                lambda *= self.config.lambda_up_factor;
                if lambda > self.config.max_lambda {
                    break Trial::Stalled(ConvergenceStatus::DampingExhausted);
                }
            };

            let (new_params, new_residuals, new_ssr, step) = match outcome {
                Trial::Accepted(p, r, s, step) => (p, r, s, step),
                Trial::Stalled(status) => break status,
            };

            iterations += 1;
            let status = criteria.check(&params, &step, ssr, new_ssr, iterations);

            params = new_params;
            residuals = new_residuals;
            ssr = new_ssr;
            lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);

            if status.is_terminated() {
                break status;
            }
        };

        debug!(
            "LM finished after {} iterations ({} evaluations): {}, sum of squares {:.6e}",
            iterations,
            func_evals,
            status.description(),
            ssr
        );

        let jacobian = if self.config.calc_jacobian {
            Some(self.jacobian(problem, &params, &residuals)?)
        } else {
            None
        };

        Ok(LmResult {
            params,
            residuals,
            cost: 0.5 * ssr,
            iterations,
            func_evals,
            status,
            success: status.is_converged(),
            message: status.description().to_string(),
            jacobian,
        })
    }

    fn residuals<P: Problem + ?Sized>(&self, problem: &P, params: &Array1<f64>) -> Result<Array1<f64>> {
        let residuals = problem.eval(params)?;
        if residuals.len() != problem.residual_count() {
            return Err(BindingError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                problem.residual_count(),
                residuals.len()
            )));
        }
        Ok(residuals)
    }

    fn jacobian<P: Problem + ?Sized>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
    ) -> Result<Array2<f64>> {
        if problem.has_custom_jacobian() {
            problem.jacobian(params)
        } else {
            finite_difference::jacobian_at(problem, params, residuals, Some(self.config.diff_step))
        }
    }

    /// Calculate the Levenberg-Marquardt step.
    ///
    /// Solves `(JᵀJ + λ·D) δ = -Jᵀr` with `D = diag(JᵀJ)`, by Cholesky when the
    /// damped matrix is positive definite and by SVD otherwise. Returns `None`
    /// if neither yields a finite step.
    fn calculate_step(&self, jtj: &Array2<f64>, gradient: &Array1<f64>, lambda: f64) -> Option<Array1<f64>> {
        let mut damped = ndarray_to_nalgebra(jtj);
        for i in 0..damped.nrows() {
            damped[(i, i)] += lambda * jtj[[i, i]].max(MIN_DIAGONAL);
        }
        let rhs = DVector::from_iterator(gradient.len(), gradient.iter().map(|g| -g));

        let step = match damped.clone().cholesky() {
            Some(cholesky) => cholesky.solve(&rhs),
            None => damped.svd(true, true).solve(&rhs, f64::EPSILON).ok()?,
        };

        let step = nalgebra_vec_to_ndarray(&step);
        step.iter().all(|v| v.is_finite()).then_some(step)
    }
}

fn sum_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}
