//! Profile scans: pin one coordinate, re-optimize the rest.

use log::{info, warn};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};
use crate::fit::{BindingFitter, FitResult};
use crate::lm::ConvergenceStatus;
use crate::parameters::{ModelParams, ParamIndex, N_PARAMS};
use crate::utils::map_grid;

use super::{normalize, ScanConfig};

/// One pinned fit on a profile curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    /// Multiplier applied to the best-fit value
    pub multiplier: f64,

    /// The pinned value
    pub value: f64,

    /// Sum of squared residuals after re-optimization
    pub cost: f64,

    /// Parameters after re-optimization, pinned coordinate included
    pub params: ModelParams,

    /// Optimizer status of the pinned fit
    pub status: ConvergenceStatus,
}

/// The profile of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCurve {
    pub parameter: ParamIndex,
    pub points: Vec<ProfilePoint>,
}

impl ProfileCurve {
    /// Costs in grid order.
    pub fn costs(&self) -> Array1<f64> {
        self.points.iter().map(|p| p.cost).collect()
    }

    /// Pinned values in grid order.
    pub fn values(&self) -> Array1<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// The point with the lowest cost.
    pub fn best_point(&self) -> Option<&ProfilePoint> {
        self.points
            .iter()
            .min_by(|a, b| a.cost.total_cmp(&b.cost))
    }
}

/// Profiles of all three parameters around a best fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileScan {
    /// The fit every pinned optimization starts from
    pub best: ModelParams,

    /// Sum of squared residuals of the best fit
    pub best_cost: f64,

    /// Multipliers applied to the pinned coordinate
    pub multipliers: Array1<f64>,

    /// One curve per parameter, in `[Kd, Kx, scale]` order
    pub curves: Vec<ProfileCurve>,
}

impl ProfileScan {
    /// Profile every parameter of `best` over the configured grid.
    ///
    /// Each grid point is an independent pinned fit seeded from `best.params`.
    /// Pinned fits that stop without converging are kept with their status;
    /// a point where the model cannot be evaluated aborts the scan.
    pub fn run(fitter: &BindingFitter<'_>, best: &FitResult, config: &ScanConfig) -> Result<Self> {
        let multipliers = config.multipliers()?;
        info!(
            "Profile scan: {} parameters x {} multipliers ({:?})",
            N_PARAMS,
            multipliers.len(),
            config.pin
        );

        let center = best.params;
        let grid: Vec<(ParamIndex, f64)> = ParamIndex::ALL
            .iter()
            .flat_map(|&p| multipliers.iter().map(move |&a| (p, a)))
            .collect();

        let points = map_grid(grid, config.parallel, |(p, a)| {
            let value = center.get(p) * a;
            let fit = fitter.fit_pinned(center, p, value, config.pin)?;
            Ok((
                p,
                ProfilePoint {
                    multiplier: a,
                    value,
                    cost: fit.sum_squares(),
                    params: fit.params,
                    status: fit.status,
                },
            ))
        })?;

        let curves: Vec<ProfileCurve> = ParamIndex::ALL
            .iter()
            .map(|&parameter| ProfileCurve {
                parameter,
                points: points
                    .iter()
                    .filter(|(p, _)| *p == parameter)
                    .map(|&(_, point)| point)
                    .collect(),
            })
            .collect();

        let stalled = points.iter().filter(|(_, pt)| !pt.status.is_converged()).count();
        if stalled > 0 {
            warn!("{} of {} profile fits did not converge", stalled, points.len());
        }

        Ok(Self {
            best: center,
            best_cost: best.sum_squares(),
            multipliers,
            curves,
        })
    }

    /// The profile of one parameter.
    pub fn curve(&self, index: ParamIndex) -> &ProfileCurve {
        &self.curves[index.index()]
    }

    /// `costs[[p, k]]`: profile cost of parameter `p` at `multipliers[k]`.
    pub fn costs(&self) -> Result<Array2<f64>> {
        let flat: Vec<f64> = self
            .curves
            .iter()
            .flat_map(|c| c.points.iter().map(|p| p.cost))
            .collect();
        Array2::from_shape_vec((self.curves.len(), self.multipliers.len()), flat)
            .map_err(|e| BindingError::DimensionMismatch(e.to_string()))
    }

    /// Smallest cost on any curve.
    pub fn min_cost(&self) -> f64 {
        self.curves
            .iter()
            .flat_map(|c| c.points.iter().map(|p| p.cost))
            .fold(f64::INFINITY, f64::min)
    }

    /// The profile cost surface divided by its global minimum.
    pub fn normalized(&self) -> Result<Array2<f64>> {
        normalize(&self.costs()?)
    }
}
