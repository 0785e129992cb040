//! Bootstrap refits around a best fit.
//!
//! Every replicate builds its own synthetic dataset, refits it starting from
//! the best-fit parameters and records the result. Replicate `i` draws from
//! an RNG seeded with `seed + i`, so a run is reproducible and does not
//! depend on how replicates are scheduled across threads.

use log::{info, warn};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::error::{BindingError, Result};
use crate::fit::{BindingFitter, FitResult};
use crate::lm::ConvergenceStatus;
use crate::parameters::{ModelParams, ParamIndex, N_PARAMS};
use crate::utils::map_grid;

use super::ParameterSummary;

/// How a replicate dataset is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapMode {
    /// Resample observations with replacement.
    #[default]
    Pairs,

    /// Best-fit prediction plus residuals resampled with replacement.
    Residuals,

    /// Best-fit prediction plus Gaussian noise with the residual standard
    /// deviation of the fit.
    Parametric,
}

/// Bootstrap settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of replicate fits
    pub replicates: usize,

    /// Base RNG seed
    pub seed: u64,

    /// Replicate generation scheme
    pub mode: BootstrapMode,

    /// Confidence level of the percentile intervals
    pub confidence: f64,

    /// Run replicates on the rayon thread pool
    pub parallel: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            replicates: 200,
            seed: 42,
            mode: BootstrapMode::default(),
            confidence: 0.95,
            parallel: true,
        }
    }
}

impl BootstrapConfig {
    pub fn with_replicates(mut self, replicates: usize) -> Self {
        self.replicates = replicates;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_mode(mut self, mode: BootstrapMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// One replicate refit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapReplicate {
    pub index: usize,
    pub params: ModelParams,
    /// Sum of squared residuals on the replicate dataset
    pub cost: f64,
    pub status: ConvergenceStatus,
}

/// All replicates and their per-parameter summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResult {
    /// The fit the replicates were generated from
    pub best: ModelParams,
    pub mode: BootstrapMode,
    pub confidence: f64,
    pub replicates: Vec<BootstrapReplicate>,
    /// Summaries over converged replicates, in `[Kd, Kx, scale]` order
    pub summaries: Vec<ParameterSummary>,
}

impl BootstrapResult {
    /// Summary of one parameter.
    pub fn summary(&self, index: ParamIndex) -> &ParameterSummary {
        &self.summaries[index.index()]
    }

    /// Values of one parameter over converged replicates.
    pub fn samples(&self, index: ParamIndex) -> Array1<f64> {
        self.replicates
            .iter()
            .filter(|r| r.status.is_converged())
            .map(|r| r.params.get(index))
            .collect()
    }

    /// Number of replicates whose refit converged.
    pub fn converged_count(&self) -> usize {
        self.replicates.iter().filter(|r| r.status.is_converged()).count()
    }
}

/// Run a bootstrap around `best`, a fit produced by `fitter`.
///
/// Summaries are computed over converged replicates only; at least two are
/// needed. A replicate whose fit fails with an error aborts the run.
pub fn bootstrap(
    fitter: &BindingFitter<'_>,
    best: &FitResult,
    config: &BootstrapConfig,
) -> Result<BootstrapResult> {
    let dataset = fitter.problem().dataset();
    let n = dataset.len();
    if n == 0 {
        return Err(BindingError::InvalidInput(
            "cannot bootstrap an empty dataset".to_string(),
        ));
    }
    if best.residuals.len() != n {
        return Err(BindingError::DimensionMismatch(format!(
            "fit has {} residuals for {} observations",
            best.residuals.len(),
            n
        )));
    }

    let predicted = fitter.problem().predict(&best.params)?;
    let noise = match config.mode {
        BootstrapMode::Parametric => {
            if n <= N_PARAMS {
                return Err(BindingError::InvalidInput(format!(
                    "parametric bootstrap needs more than {} observations, got {}",
                    N_PARAMS, n
                )));
            }
            let sigma = (best.sum_squares() / (n - N_PARAMS) as f64).sqrt();
            Some(Normal::new(0.0, sigma).map_err(|e| BindingError::InvalidComputation(e.to_string()))?)
        }
        _ => None,
    };

    info!(
        "Bootstrap: {} {:?} replicates of {} observations (seed {})",
        config.replicates, config.mode, n, config.seed
    );

    let indices: Vec<usize> = (0..config.replicates).collect();
    let replicates = map_grid(indices, config.parallel, |i| {
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(i as u64));
        let sample = match config.mode {
            BootstrapMode::Pairs => {
                let picks: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                dataset.select(&picks)?
            }
            BootstrapMode::Residuals => {
                // Residuals are prediction minus response
                let responses: Array1<f64> = predicted
                    .iter()
                    .map(|&p| p - best.residuals[rng.gen_range(0..n)])
                    .collect();
                dataset.with_responses(responses)?
            }
            BootstrapMode::Parametric => {
                let responses: Array1<f64> = match &noise {
                    Some(normal) => predicted.iter().map(|&p| p + normal.sample(&mut rng)).collect(),
                    None => predicted.clone(),
                };
                dataset.with_responses(responses)?
            }
        };
        refit(fitter, &sample, best, i)
    })?;

    let converged: Vec<&BootstrapReplicate> =
        replicates.iter().filter(|r| r.status.is_converged()).collect();
    if converged.len() < replicates.len() {
        warn!(
            "{} of {} bootstrap refits did not converge and are left out of the summaries",
            replicates.len() - converged.len(),
            replicates.len()
        );
    }

    let summaries = ParamIndex::ALL
        .iter()
        .map(|&p| {
            let values: Vec<f64> = converged.iter().map(|r| r.params.get(p)).collect();
            ParameterSummary::from_samples(p, &values, config.confidence)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BootstrapResult {
        best: best.params,
        mode: config.mode,
        confidence: config.confidence,
        replicates,
        summaries,
    })
}

fn refit(
    fitter: &BindingFitter<'_>,
    sample: &Dataset,
    best: &FitResult,
    index: usize,
) -> Result<BootstrapReplicate> {
    let fit = fitter.for_dataset(sample).fit(best.params)?;
    Ok(BootstrapReplicate {
        index,
        params: fit.params,
        cost: fit.sum_squares(),
        status: fit.status,
    })
}
