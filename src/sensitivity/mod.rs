//! # Sensitivity scans
//!
//! Two views of how the fit cost responds to each parameter, both over the
//! same log-spaced multiplier grid around the best fit:
//!
//! * [`LocalScan`] scales one coordinate and holds the others at their fitted
//!   values. It measures the curvature of the cost along each axis.
//! * [`ProfileScan`] pins one coordinate at the scaled value and re-optimizes
//!   the other two, which reveals codependency between parameters.
//!
//! Costs in both scans are sums of squared residuals. Grid points are
//! independent, so the outer loops run on the rayon thread pool unless
//! [`ScanConfig::parallel`] is off; results do not depend on scheduling.

pub mod local;
pub mod profile;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};
use crate::fit::PinStrategy;
use crate::utils::logspace;

pub use local::LocalScan;
pub use profile::{ProfileCurve, ProfilePoint, ProfileScan};

/// Grid and execution settings shared by the local and profile scans.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Smallest multiplier applied to the fitted value
    pub min_multiplier: f64,

    /// Largest multiplier applied to the fitted value
    pub max_multiplier: f64,

    /// Number of log-spaced grid points
    pub points: usize,

    /// Evaluate grid points on the rayon thread pool
    pub parallel: bool,

    /// How profile fits hold the scanned coordinate
    pub pin: PinStrategy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_multiplier: 0.1,
            max_multiplier: 10.0,
            points: 41,
            parallel: true,
            pin: PinStrategy::default(),
        }
    }
}

impl ScanConfig {
    /// Set the multiplier range.
    pub fn with_range(mut self, min_multiplier: f64, max_multiplier: f64) -> Self {
        self.min_multiplier = min_multiplier;
        self.max_multiplier = max_multiplier;
        self
    }

    /// Set the number of grid points.
    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    /// Enable or disable parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the pin strategy for profile fits.
    pub fn with_pin(mut self, pin: PinStrategy) -> Self {
        self.pin = pin;
        self
    }

    /// The multiplier grid.
    pub fn multipliers(&self) -> Result<Array1<f64>> {
        if self.min_multiplier > self.max_multiplier {
            return Err(BindingError::InvalidInput(format!(
                "multiplier range [{}, {}] is empty",
                self.min_multiplier, self.max_multiplier
            )));
        }
        if self.points == 0 {
            return Err(BindingError::InvalidInput(
                "scan needs at least one grid point".to_string(),
            ));
        }
        logspace(self.min_multiplier, self.max_multiplier, self.points)
    }
}

/// Divide a cost surface by its global minimum.
///
/// Fails when the minimum is zero or negative, as for a noiseless fit.
pub(crate) fn normalize(costs: &Array2<f64>) -> Result<Array2<f64>> {
    let min = costs.iter().copied().fold(f64::INFINITY, f64::min);
    if !(min.is_finite() && min > 0.0) {
        return Err(BindingError::InvalidComputation(format!(
            "cannot normalize a cost surface with minimum {:e}",
            min
        )));
    }
    Ok(costs / min)
}
