//! Convergence criteria for the optimizer.
//!
//! The fitted parameters differ by many orders of magnitude, so every test
//! here is scale-free: parameter changes are relative to the parameter, cost
//! changes relative to the cost, and the gradient is measured as a cosine.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Possible convergence states for an optimization algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// The algorithm has converged due to a small parameter change.
    ParameterConvergence,

    /// The algorithm has converged due to a small function value change.
    FunctionValueConvergence,

    /// The algorithm has converged due to a small gradient.
    GradientConvergence,

    /// The residuals are exactly zero.
    ExactFit,

    /// The algorithm has terminated due to reaching the maximum number of iterations.
    MaxIterationsReached,

    /// No damping up to the configured maximum produced a cost decrease.
    DampingExhausted,

    /// The residuals do not depend on any parameter (`JᵀJ` has a zero diagonal).
    Degenerate,

    /// The algorithm has terminated due to a numerical error.
    NumericalError,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has terminated (either converged or failed).
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
                | ConvergenceStatus::ExactFit
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::Running => "Optimization is still running",
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small function value change",
            ConvergenceStatus::GradientConvergence => "Converged: small gradient",
            ConvergenceStatus::ExactFit => "Converged: residuals are zero",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::DampingExhausted => {
                "Terminated: no cost decrease at maximum damping"
            }
            ConvergenceStatus::Degenerate => {
                "Terminated: residuals do not depend on the parameters"
            }
            ConvergenceStatus::NumericalError => "Terminated: numerical error",
        }
    }
}

/// Criteria for determining when an optimization algorithm has converged.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Tolerance for relative change in parameter values.
    pub xtol: f64,

    /// Tolerance for relative change in function value.
    pub ftol: f64,

    /// Tolerance for the scaled gradient.
    pub gtol: f64,

    /// Maximum number of iterations.
    pub max_iterations: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            xtol: 1e-10,
            ftol: 1e-12,
            gtol: 1e-10,
            max_iterations: 200,
        }
    }
}

impl ConvergenceCriteria {
    /// Creates a new set of convergence criteria with the given tolerances.
    pub fn new(xtol: f64, ftol: f64, gtol: f64, max_iterations: usize) -> Self {
        Self {
            xtol,
            ftol,
            gtol,
            max_iterations,
        }
    }

    /// Whether the scaled gradient is small enough to stop before stepping.
    pub fn gradient_converged(&self, scaled_gradient: f64) -> bool {
        scaled_gradient < self.gtol
    }

    /// Whether a step is too small, relative to the parameters, to matter.
    ///
    /// Applies to rejected trial steps as well: once the damped step shrinks
    /// below `xtol` the current point is as good as the optimizer can resolve.
    pub fn step_converged(&self, params: &Array1<f64>, step: &Array1<f64>) -> bool {
        relative_step(params, step) < self.xtol
    }

    /// Classify an accepted step.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values before the step
    /// * `step` - The accepted step
    /// * `cost` - The sum of squares before the step
    /// * `new_cost` - The sum of squares after the step
    /// * `iterations` - The number of accepted steps so far, this one included
    pub fn check(
        &self,
        params: &Array1<f64>,
        step: &Array1<f64>,
        cost: f64,
        new_cost: f64,
        iterations: usize,
    ) -> ConvergenceStatus {
        if self.step_converged(params, step) {
            return ConvergenceStatus::ParameterConvergence;
        }

        let cost_change = (cost - new_cost).abs() / cost.max(f64::MIN_POSITIVE);
        if cost_change < self.ftol {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        if iterations >= self.max_iterations {
            return ConvergenceStatus::MaxIterationsReached;
        }

        ConvergenceStatus::Running
    }
}

/// Largest step component relative to its parameter.
pub fn relative_step(params: &Array1<f64>, step: &Array1<f64>) -> f64 {
    params
        .iter()
        .zip(step.iter())
        .map(|(x, d)| d.abs() / x.abs().max(f64::MIN_POSITIVE))
        .fold(0.0, f64::max)
}

/// Largest cosine between the residual vector and a Jacobian column.
///
/// Computed from the normal matrix `JᵀJ`, the gradient `Jᵀr` and the sum of
/// squares `rᵀr`, so it is invariant to rescaling parameters or residuals.
pub fn scaled_gradient_norm(jtj: &Array2<f64>, gradient: &Array1<f64>, sum_squares: f64) -> f64 {
    let residual_norm = sum_squares.sqrt();
    if residual_norm == 0.0 {
        return 0.0;
    }
    gradient
        .iter()
        .enumerate()
        .map(|(j, g)| {
            let column_norm = jtj[[j, j]].sqrt();
            if column_norm > 0.0 {
                g.abs() / (column_norm * residual_norm)
            } else {
                0.0
            }
        })
        .fold(0.0, f64::max)
}
