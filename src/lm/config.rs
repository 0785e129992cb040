//! Configuration options for the Levenberg-Marquardt algorithm.
//!
//! This module defines the tolerances, damping schedule and differentiation
//! settings of the optimizer.

use serde::{Deserialize, Serialize};

use super::convergence::ConvergenceCriteria;

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of accepted steps. Default: 200
    pub max_iterations: usize,

    /// Tolerance for relative decrease of the sum of squares. Default: 1e-12
    pub ftol: f64,

    /// Tolerance for relative change in parameter values. Default: 1e-10
    pub xtol: f64,

    /// Tolerance for the scaled gradient (cosine between the residual vector
    /// and the Jacobian columns). Default: 1e-10
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda; exceeding it ends the fit. Default: 1e12
    pub max_lambda: f64,

    /// Relative step for the forward-difference Jacobian. Default: 1e-8
    pub diff_step: f64,

    /// Whether to calculate and return the Jacobian at the solution. Default: false
    pub calc_jacobian: bool,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-12,
            xtol: 1e-10,
            gtol: 1e-10,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
            diff_step: 1e-8,
            calc_jacobian: false,
        }
    }
}

impl LmConfig {
    /// The convergence criteria implied by this configuration.
    pub fn criteria(&self) -> ConvergenceCriteria {
        ConvergenceCriteria::new(self.xtol, self.ftol, self.gtol, self.max_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LmConfig = serde_json::from_str(r#"{"max_iterations": 50, "xtol": 1e-6}"#).unwrap();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.xtol, 1e-6);
        assert_eq!(config.ftol, LmConfig::default().ftol);
        assert!(!config.calc_jacobian);
    }
}
