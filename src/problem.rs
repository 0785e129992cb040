//! Problem definition trait and adapters.
//!
//! This module defines the `Problem` trait, which represents a nonlinear
//! least squares problem to be solved with the Levenberg-Marquardt algorithm,
//! and two adapters that change the coordinates the optimizer sees:
//!
//! * [`BoundedProblem`] maps unbounded internal coordinates onto box-bounded
//!   external ones through [`BoundsTransform`].
//! * [`PinnedProblem`] removes one coordinate from the free vector and holds it
//!   at a fixed value.

use ndarray::{Array1, Array2};

use crate::error::{BindingError, Result};
use crate::parameters::{Bounds, BoundsTransform};

/// A trait representing a nonlinear least squares problem.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values at which to evaluate the residuals
    ///
    /// # Returns
    ///
    /// * A vector of residuals, or an error if the evaluation fails
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian matrix at the given parameters.
    ///
    /// The default implementation uses forward finite differences.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Check if this problem provides a custom Jacobian implementation.
    ///
    /// If this returns false, the optimizer computes finite differences itself
    /// with its configured step size.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

/// A problem whose coordinates are box-bounded.
///
/// The optimizer works on unbounded internal values; every evaluation maps them
/// to external values inside the bounds before calling the wrapped problem.
pub struct BoundedProblem<'a, P: Problem + ?Sized> {
    inner: &'a P,
    transforms: Vec<BoundsTransform>,
}

impl<'a, P: Problem + ?Sized> BoundedProblem<'a, P> {
    /// Wrap `inner` with one bounds entry per parameter.
    pub fn new(inner: &'a P, bounds: &[Bounds]) -> Result<Self> {
        if bounds.len() != inner.parameter_count() {
            return Err(BindingError::DimensionMismatch(format!(
                "{} bounds for {} parameters",
                bounds.len(),
                inner.parameter_count()
            )));
        }
        Ok(Self {
            inner,
            transforms: bounds.iter().map(|&b| BoundsTransform::new(b)).collect(),
        })
    }

    /// Map internal coordinates to external (bounded) values.
    pub fn to_external(&self, internal: &Array1<f64>) -> Array1<f64> {
        internal
            .iter()
            .zip(self.transforms.iter())
            .map(|(&x, t)| t.to_external(x))
            .collect()
    }

    /// Map external values to internal coordinates.
    ///
    /// Fails if a value is outside its bounds.
    pub fn to_internal(&self, external: &Array1<f64>) -> Result<Array1<f64>> {
        external
            .iter()
            .zip(self.transforms.iter())
            .map(|(&x, t)| t.to_internal(x).map_err(BindingError::from))
            .collect()
    }
}

impl<P: Problem + ?Sized> Problem for BoundedProblem<'_, P> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.inner.eval(&self.to_external(params))
    }

    fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }

    fn residual_count(&self) -> usize {
        self.inner.residual_count()
    }
}

/// A problem with one coordinate held at a fixed value.
///
/// The optimizer sees the remaining `n - 1` coordinates in their original order.
pub struct PinnedProblem<'a, P: Problem + ?Sized> {
    inner: &'a P,
    index: usize,
    value: f64,
}

impl<'a, P: Problem + ?Sized> PinnedProblem<'a, P> {
    /// Pin coordinate `index` of `inner` to `value`.
    pub fn new(inner: &'a P, index: usize, value: f64) -> Result<Self> {
        if index >= inner.parameter_count() {
            return Err(BindingError::InvalidInput(format!(
                "cannot pin parameter {} of {}",
                index,
                inner.parameter_count()
            )));
        }
        if !value.is_finite() {
            return Err(BindingError::InvalidInput(format!(
                "pinned value must be finite, got {}",
                value
            )));
        }
        Ok(Self {
            inner,
            index,
            value,
        })
    }

    /// Insert the pinned value into a reduced vector.
    pub fn expand(&self, reduced: &Array1<f64>) -> Array1<f64> {
        let mut full = Vec::with_capacity(reduced.len() + 1);
        full.extend(reduced.iter().take(self.index));
        full.push(self.value);
        full.extend(reduced.iter().skip(self.index));
        Array1::from_vec(full)
    }

    /// Drop the pinned coordinate from a full vector.
    pub fn reduce(&self, full: &Array1<f64>) -> Array1<f64> {
        full.iter()
            .enumerate()
            .filter(|&(i, _)| i != self.index)
            .map(|(_, &x)| x)
            .collect()
    }

    /// Drop the pinned coordinate's entry from per-parameter bounds.
    pub fn reduce_bounds(&self, bounds: &[Bounds]) -> Vec<Bounds> {
        bounds
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != self.index)
            .map(|(_, &b)| b)
            .collect()
    }
}

impl<P: Problem + ?Sized> Problem for PinnedProblem<'_, P> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() + 1 != self.inner.parameter_count() {
            return Err(BindingError::DimensionMismatch(format!(
                "Expected {} free parameters, got {}",
                self.inner.parameter_count() - 1,
                params.len()
            )));
        }
        self.inner.eval(&self.expand(params))
    }

    fn parameter_count(&self) -> usize {
        self.inner.parameter_count() - 1
    }

    fn residual_count(&self) -> usize {
        self.inner.residual_count()
    }
}
