//! The residual function of the binding fit.

use ndarray::Array1;

use crate::binding::BindingModel;
use crate::data::Dataset;
use crate::error::Result;
use crate::parameters::{ModelParams, N_PARAMS};
use crate::problem::Problem;

/// Least-squares problem: predicted minus measured response for every
/// observation of a dataset, as a function of `[Kd, Kx, scale]`.
#[derive(Debug, Clone, Copy)]
pub struct BindingProblem<'a> {
    dataset: &'a Dataset,
    model: BindingModel,
}

impl<'a> BindingProblem<'a> {
    /// Create the problem for a dataset and a binding model.
    pub fn new(dataset: &'a Dataset, model: BindingModel) -> Self {
        Self { dataset, model }
    }

    /// The data being fitted.
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// The binding model with its fixed `Rtot`.
    pub fn model(&self) -> &BindingModel {
        &self.model
    }

    /// Predicted responses for every observation.
    pub fn predict(&self, params: &ModelParams) -> Result<Array1<f64>> {
        self.model.predict(
            params.kd,
            params.kx,
            self.dataset.valencies().view(),
            self.dataset.concentrations().view(),
            params.scale,
        )
    }

    /// Predicted minus measured responses.
    pub fn residuals(&self, params: &ModelParams) -> Result<Array1<f64>> {
        Ok(self.predict(params)? - self.dataset.responses())
    }

    /// Sum of squared residuals, the scalar objective of the sensitivity scans.
    pub fn sum_squares(&self, params: &ModelParams) -> Result<f64> {
        Ok(self.residuals(params)?.iter().map(|r| r * r).sum())
    }
}

impl Problem for BindingProblem<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.residuals(&ModelParams::from_array(params)?)
    }

    fn parameter_count(&self) -> usize {
        N_PARAMS
    }

    fn residual_count(&self) -> usize {
        self.dataset.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use crate::error::BindingError;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn dataset() -> Dataset {
        Dataset::new(&[
            Observation {
                concentration: 1e-7,
                response: 10.0,
                valency: 3,
            },
            Observation {
                concentration: 1e-7,
                response: 1.0,
                valency: 1,
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_residuals_are_prediction_minus_measurement() {
        let data = dataset();
        let problem = BindingProblem::new(&data, BindingModel::default());
        let params = ModelParams::new(1.7e-6, 3.15e-4, 1e-3);

        let residuals = problem.residuals(&params).unwrap();
        assert_relative_eq!(residuals[0], 14.871859323790068 - 10.0, max_relative = 1e-9);
        assert_eq!(residuals[1], -1.0);

        let ssr = problem.sum_squares(&params).unwrap();
        assert_relative_eq!(ssr, residuals[0].powi(2) + 1.0, max_relative = 1e-12);
        assert_relative_eq!(problem.eval_cost(&params.to_array()).unwrap(), ssr);
    }

    #[test]
    fn test_problem_dimensions() {
        let data = dataset();
        let problem = BindingProblem::new(&data, BindingModel::default());
        assert_eq!(problem.parameter_count(), 3);
        assert_eq!(problem.residual_count(), 2);

        let err = problem.eval(&array![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, BindingError::DimensionMismatch(_)));
    }

    #[test]
    fn test_unsolvable_parameters_abort_evaluation() {
        let data = dataset();
        let problem = BindingProblem::new(&data, BindingModel::default());
        let err = problem.eval(&array![-1.7e-6, 3.15e-4, 1.0]).unwrap_err();
        assert!(matches!(err, BindingError::NoPhysicalSolution { .. }));
    }
}
