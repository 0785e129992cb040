//! # Resampling
//!
//! Bootstrap confidence intervals and leave-one-out cross-validation for the
//! binding fit. Both refit the model many times from the best-fit parameters,
//! one independent fit per replicate or fold, so the loops run on the rayon
//! thread pool when enabled.
//!
//! The summary statistics here use linear-interpolated quantiles of the
//! sorted replicate values.

pub mod bootstrap;
pub mod cross_validation;

use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};
use crate::parameters::ParamIndex;

pub use bootstrap::{bootstrap, BootstrapConfig, BootstrapMode, BootstrapReplicate, BootstrapResult};
pub use cross_validation::{leave_one_out, CrossValidation, CvFold};

/// Location, spread and percentile interval of one parameter's replicates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    pub parameter: ParamIndex,
    pub mean: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    pub median: f64,
    /// Lower end of the percentile interval
    pub lower: f64,
    /// Upper end of the percentile interval
    pub upper: f64,
}

impl ParameterSummary {
    /// Summarize replicate values at the given confidence level.
    pub fn from_samples(parameter: ParamIndex, samples: &[f64], confidence: f64) -> Result<Self> {
        let (lower, upper) = percentile_interval(samples, confidence)?;

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);

        Ok(Self {
            parameter,
            mean,
            std_dev: variance.sqrt(),
            median: quantile_linear(samples, 0.5),
            lower,
            upper,
        })
    }
}

/// Quantile of sorted data by linear interpolation between order statistics.
///
/// `q = 0` gives the minimum and `q = 1` the maximum; empty input gives NaN.
pub fn quantile_linear_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let (i, j) = (pos.floor() as usize, pos.ceil() as usize);
            let t = pos - i as f64;
            if i == j {
                sorted[i]
            } else {
                (1.0 - t) * sorted[i] + t * sorted[j]
            }
        }
    }
}

/// Quantile of unsorted data.
pub fn quantile_linear(data: &[f64], q: f64) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_linear_sorted(&sorted, q)
}

/// Two-sided percentile interval at `confidence` in (0, 1).
pub fn percentile_interval(samples: &[f64], confidence: f64) -> Result<(f64, f64)> {
    if samples.len() < 2 {
        return Err(BindingError::InvalidComputation(format!(
            "percentile interval needs at least 2 samples, got {}",
            samples.len()
        )));
    }
    if !(confidence.is_finite() && confidence > 0.0 && confidence < 1.0) {
        return Err(BindingError::InvalidInput(format!(
            "confidence level must be in (0, 1), got {}",
            confidence
        )));
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let alpha = (1.0 - confidence) / 2.0;
    Ok((
        quantile_linear_sorted(&sorted, alpha),
        quantile_linear_sorted(&sorted, 1.0 - alpha),
    ))
}
