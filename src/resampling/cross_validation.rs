//! Leave-one-out cross-validation.

use log::{info, warn};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::data::Observation;
use crate::error::{BindingError, Result};
use crate::fit::{BindingFitter, FitResult};
use crate::lm::ConvergenceStatus;
use crate::parameters::ModelParams;
use crate::utils::map_grid;

/// The fit with one observation held out, and its prediction of that point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvFold {
    /// Position of the held-out observation in the dataset
    pub index: usize,
    pub held_out: Observation,
    /// Parameters fitted without the held-out observation
    pub params: ModelParams,
    pub prediction: f64,
    /// Prediction minus measured response
    pub residual: f64,
    pub status: ConvergenceStatus,
}

/// All folds of a leave-one-out run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub folds: Vec<CvFold>,
}

impl CrossValidation {
    /// Held-out residuals in dataset order.
    pub fn residuals(&self) -> Array1<f64> {
        self.folds.iter().map(|f| f.residual).collect()
    }

    /// Mean squared prediction error over the held-out points.
    pub fn mse(&self) -> f64 {
        self.folds.iter().map(|f| f.residual.powi(2)).sum::<f64>() / self.folds.len() as f64
    }

    /// Root of [`CrossValidation::mse`].
    pub fn rmse(&self) -> f64 {
        self.mse().sqrt()
    }
}

/// Refit the model once per observation with that observation removed.
///
/// Every fold starts from `best.params`. Needs at least two observations.
pub fn leave_one_out(
    fitter: &BindingFitter<'_>,
    best: &FitResult,
    parallel: bool,
) -> Result<CrossValidation> {
    let dataset = fitter.problem().dataset();
    let model = fitter.problem().model();
    if dataset.len() < 2 {
        return Err(BindingError::InvalidInput(format!(
            "leave-one-out needs at least 2 observations, got {}",
            dataset.len()
        )));
    }
    info!("Leave-one-out cross-validation over {} observations", dataset.len());

    let indices: Vec<usize> = (0..dataset.len()).collect();
    let folds = map_grid(indices, parallel, |index| {
        let held_out = dataset.get(index).ok_or_else(|| {
            BindingError::InvalidInput(format!("no observation at index {}", index))
        })?;
        let training = dataset.without(index)?;
        let fit = fitter.for_dataset(&training).fit(best.params)?;

        let state = model.equilibrium(
            fit.params.kd,
            held_out.valency,
            fit.params.kx,
            held_out.concentration,
        )?;
        let prediction = fit.params.scale * state.receptor_multimerized;

        Ok(CvFold {
            index,
            held_out,
            params: fit.params,
            prediction,
            residual: prediction - held_out.response,
            status: fit.status,
        })
    })?;

    let stalled = folds.iter().filter(|f| !f.status.is_converged()).count();
    if stalled > 0 {
        warn!("{} of {} cross-validation fits did not converge", stalled, folds.len());
    }

    Ok(CrossValidation { folds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingModel;
    use crate::data::Dataset;
    use approx::assert_relative_eq;

    #[test]
    fn test_noiseless_folds_predict_held_out_points() {
        let model = BindingModel::default();
        let truth = ModelParams::new(1.7e-6, 3.15e-4, 1e-3);
        let mut observations = Vec::new();
        for &valency in &[2u32, 3] {
            for &l0 in &[1e-9, 1e-8, 1e-7, 1e-6] {
                let state = model.equilibrium(truth.kd, valency, truth.kx, l0).unwrap();
                observations.push(Observation {
                    concentration: l0,
                    response: truth.scale * state.receptor_multimerized,
                    valency,
                });
            }
        }
        let data = Dataset::new(&observations).unwrap();
        let fitter = BindingFitter::new(&data, model);
        let best = fitter.fit(ModelParams::new(2e-6, 4e-4, 1.2e-3)).unwrap();

        let cv = leave_one_out(&fitter, &best, true).unwrap();
        assert_eq!(cv.folds.len(), data.len());
        for (i, fold) in cv.folds.iter().enumerate() {
            assert_eq!(fold.index, i);
            assert_eq!(fold.held_out, observations[i]);
            assert!(fold.residual.abs() <= 1e-6 * fold.held_out.response.abs().max(1.0));
        }
        assert!(cv.mse() < 1e-10);
        assert_relative_eq!(cv.rmse(), cv.mse().sqrt());
    }

    #[test]
    fn test_needs_two_observations() {
        let data = Dataset::parse("1e-7, 10.0, 3\n").unwrap();
        let fitter = BindingFitter::new(&data, BindingModel::default());
        let best = FitResult {
            params: ModelParams::new(1.7e-6, 3.15e-4, 1e-3),
            cost: 0.0,
            residuals: Array1::zeros(1),
            status: ConvergenceStatus::ExactFit,
            iterations: 0,
            func_evals: 1,
            message: String::new(),
        };
        assert!(leave_one_out(&fitter, &best, false).is_err());
    }
}
