//! # Fit driver
//!
//! Nonlinear least-squares estimation of `[Kd, Kx, scale]` from a dataset.
//! [`BindingFitter::fit`] minimizes the sum of squared residuals with the
//! Levenberg-Marquardt optimizer; when any coordinate has a finite bound the
//! optimizer works on Minuit-transformed internal coordinates so it stays
//! unconstrained.
//!
//! [`BindingFitter::fit_pinned`] holds one coordinate at a forced value and
//! re-optimizes the other two. This is the building block of profile scans.
//!
//! Non-convergence is never an error: it is reported through
//! [`FitResult::status`] and callers decide what to do with it.

pub mod residual;

use std::fmt;

use log::{debug, warn};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::binding::BindingModel;
use crate::data::Dataset;
use crate::error::{BindingError, Result};
use crate::lm::{ConvergenceStatus, LevenbergMarquardt, LmConfig, LmResult};
use crate::parameters::{Bounds, ModelParams, ParamBounds, ParamIndex};
use crate::problem::{BoundedProblem, PinnedProblem, Problem};

pub use residual::BindingProblem;

/// How a pinned fit holds its coordinate fixed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinStrategy {
    /// Remove the coordinate from the free vector.
    #[default]
    Exact,

    /// Confine the coordinate to `[v - ε, v + ε]` with
    /// `ε = relative_width · |v|` and let the optimizer see it.
    EpsilonBounds { relative_width: f64 },
}

impl PinStrategy {
    /// A near-zero-width interval, `ε = 1e-8 · |v|`.
    pub fn epsilon_bounds() -> Self {
        PinStrategy::EpsilonBounds {
            relative_width: 1e-8,
        }
    }
}

/// Optimizer settings and parameter bounds for a fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Levenberg-Marquardt settings
    pub lm: LmConfig,

    /// Box constraints on `[Kd, Kx, scale]`
    pub bounds: ParamBounds,
}

/// Outcome of a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Best parameters found
    pub params: ModelParams,

    /// Half the sum of squared residuals at `params`
    pub cost: f64,

    /// Predicted minus measured responses at `params`
    pub residuals: Array1<f64>,

    /// Why the optimizer stopped
    pub status: ConvergenceStatus,

    /// Number of accepted optimizer steps
    pub iterations: usize,

    /// Number of residual evaluations
    pub func_evals: usize,

    /// Human-readable termination message
    pub message: String,
}

impl FitResult {
    /// Whether the optimizer met one of its convergence tests.
    pub fn is_converged(&self) -> bool {
        self.status.is_converged()
    }

    /// Sum of squared residuals at the solution.
    pub fn sum_squares(&self) -> f64 {
        2.0 * self.cost
    }

    fn from_lm(result: LmResult, params: ModelParams) -> Self {
        Self {
            params,
            cost: result.cost,
            residuals: result.residuals,
            status: result.status,
            iterations: result.iterations,
            func_evals: result.func_evals,
            message: result.message,
        }
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Result:")?;
        writeln!(f, "  Status: {}", self.status.description())?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Parameters: {}", self.params)?;
        Ok(())
    }
}

/// Fits the binding model to one dataset.
#[derive(Debug, Clone)]
pub struct BindingFitter<'a> {
    problem: BindingProblem<'a>,
    options: FitOptions,
}

impl<'a> BindingFitter<'a> {
    /// Create a fitter with default options and no bounds.
    pub fn new(dataset: &'a Dataset, model: BindingModel) -> Self {
        Self {
            problem: BindingProblem::new(dataset, model),
            options: FitOptions::default(),
        }
    }

    /// Replace all fit options.
    pub fn with_options(mut self, options: FitOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the optimizer settings.
    pub fn with_lm_config(mut self, config: LmConfig) -> Self {
        self.options.lm = config;
        self
    }

    /// Replace the parameter bounds.
    pub fn with_bounds(mut self, bounds: ParamBounds) -> Self {
        self.options.bounds = bounds;
        self
    }

    /// A fitter with the same model and options for another dataset.
    pub fn for_dataset<'b>(&self, dataset: &'b Dataset) -> BindingFitter<'b> {
        BindingFitter::new(dataset, *self.problem.model()).with_options(self.options.clone())
    }

    /// The active options.
    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// The residual problem being minimized.
    pub fn problem(&self) -> &BindingProblem<'a> {
        &self.problem
    }

    /// Minimize the sum of squared residuals starting from `initial`.
    ///
    /// Fails if `initial` lies outside the bounds or the model cannot be
    /// evaluated there. A fit that stops without converging is returned with
    /// a non-converged status.
    pub fn fit(&self, initial: ModelParams) -> Result<FitResult> {
        debug!("Fitting {} observations from {}", self.problem.residual_count(), initial);

        let bounds = self.options.bounds.to_vec();
        let (result, params) = self.minimize(&self.problem, &bounds, initial.to_array())?;
        let fit = FitResult::from_lm(result, ModelParams::from_array(&params)?);
        self.report(&fit);
        Ok(fit)
    }

    /// Minimize with coordinate `index` held at `value`.
    ///
    /// The other two coordinates start from `initial` and keep their bounds;
    /// the bounds of the pinned coordinate are ignored.
    pub fn fit_pinned(
        &self,
        initial: ModelParams,
        index: ParamIndex,
        value: f64,
        strategy: PinStrategy,
    ) -> Result<FitResult> {
        debug!("Fitting with {} pinned at {:e} ({:?})", index, value, strategy);

        let start = initial.with_value(index, value);
        let fit = match strategy {
            PinStrategy::Exact => {
                let pinned = PinnedProblem::new(&self.problem, index.index(), value)?;
                let bounds = pinned.reduce_bounds(&self.options.bounds.to_vec());
                let (result, reduced) = self.minimize(&pinned, &bounds, pinned.reduce(&start.to_array()))?;
                let params = ModelParams::from_array(&pinned.expand(&reduced))?;
                FitResult::from_lm(result, params)
            }
            PinStrategy::EpsilonBounds { relative_width } => {
                if !(relative_width.is_finite() && relative_width >= 0.0) {
                    return Err(BindingError::InvalidInput(format!(
                        "pin width must be finite and non-negative, got {}",
                        relative_width
                    )));
                }
                let half_width = if value == 0.0 {
                    relative_width
                } else {
                    relative_width * value.abs()
                };
                let bounds = self
                    .options
                    .bounds
                    .with(index, Bounds::around(value, half_width)?)
                    .to_vec();
                let (result, params) = self.minimize(&self.problem, &bounds, start.to_array())?;
                FitResult::from_lm(result, ModelParams::from_array(&params)?)
            }
        };

        self.report(&fit);
        Ok(fit)
    }

    /// Run the optimizer on `problem`, through the bounds transform when any
    /// bound is finite. Returns the raw result and the external parameters.
    fn minimize<P: Problem + ?Sized>(
        &self,
        problem: &P,
        bounds: &[Bounds],
        initial: Array1<f64>,
    ) -> Result<(LmResult, Array1<f64>)> {
        let optimizer = LevenbergMarquardt::with_config(self.options.lm.clone());

        if bounds.iter().any(Bounds::is_bounded) {
            let bounded = BoundedProblem::new(problem, bounds)?;
            let internal = bounded.to_internal(&initial)?;
            let result = optimizer.minimize(&bounded, internal)?;
            let external = bounded.to_external(&result.params);
            Ok((result, external))
        } else {
            let result = optimizer.minimize(problem, initial)?;
            let params = result.params.clone();
            Ok((result, params))
        }
    }

    fn report(&self, fit: &FitResult) {
        if fit.is_converged() {
            debug!(
                "Fit finished after {} iterations: {}, cost {:.6e}",
                fit.iterations,
                fit.status.description(),
                fit.cost
            );
        } else {
            warn!(
                "Fit did not converge after {} iterations: {} ({})",
                fit.iterations, fit.message, fit.params
            );
        }
    }
}
