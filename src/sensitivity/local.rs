//! One-parameter-at-a-time cost sweeps around the best fit.

use log::info;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};
use crate::fit::BindingProblem;
use crate::parameters::{ModelParams, ParamIndex, N_PARAMS};
use crate::utils::map_grid;

use super::{normalize, ScanConfig};

/// Sum of squared residuals along each parameter axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalScan {
    /// The parameters the sweep is centered on
    pub center: ModelParams,

    /// Multipliers applied to the scanned coordinate
    pub multipliers: Array1<f64>,

    /// `costs[[p, k]]`: cost with coordinate `p` scaled by `multipliers[k]`
    pub costs: Array2<f64>,
}

impl LocalScan {
    /// Sweep every coordinate of `center` over the configured grid.
    ///
    /// Any grid point where the model cannot be evaluated aborts the scan.
    pub fn run(problem: &BindingProblem<'_>, center: ModelParams, config: &ScanConfig) -> Result<Self> {
        let multipliers = config.multipliers()?;
        let n = multipliers.len();
        info!("Local scan: {} parameters x {} multipliers", N_PARAMS, n);

        let grid: Vec<(ParamIndex, f64)> = ParamIndex::ALL
            .iter()
            .flat_map(|&p| multipliers.iter().map(move |&a| (p, a)))
            .collect();

        let costs = map_grid(grid, config.parallel, |(p, a)| {
            problem.sum_squares(&center.with_value(p, center.get(p) * a))
        })?;

        Ok(Self {
            center,
            multipliers,
            costs: Array2::from_shape_vec((N_PARAMS, n), costs)
                .map_err(|e| BindingError::DimensionMismatch(e.to_string()))?,
        })
    }

    /// The sweep of one coordinate.
    pub fn curve(&self, index: ParamIndex) -> ArrayView1<'_, f64> {
        self.costs.row(index.index())
    }

    /// Smallest cost anywhere on the surface.
    pub fn min_cost(&self) -> f64 {
        self.costs.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// The cost surface divided by its global minimum.
    pub fn normalized(&self) -> Result<Array2<f64>> {
        normalize(&self.costs)
    }
}
