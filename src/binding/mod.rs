//! # Multivalent ligand-receptor binding
//!
//! Equilibrium solution of the Stone et al. model for a ligand carrying `v`
//! identical epitopes binding a cell-surface receptor population. The first
//! epitope binds with dissociation constant `Kd`; each further epitope of an
//! already bound ligand engages another receptor with cross-linking constant
//! `Kx`. At equilibrium the free receptor count `Req` satisfies
//!
//! ```text
//! Rtot = Req * (1 + v * (L0 / Kd) * (1 + Kx * Req)^(v - 1))
//! ```
//!
//! and the number of ligands bound through exactly `i` epitopes is
//!
//! ```text
//! vieq[i] = (L0 / Kd) * Req * C(v, i) * (Kx * Req)^(i - 1)
//! ```
//!
//! Every power and product in these formulas is checked: a non-finite
//! intermediate fails the evaluation with [`BindingError::Overflow`] instead
//! of leaking infinities or NaN into a fit.

pub mod root;

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};

pub use root::{brent, RootConfig};

/// Total receptor count per cell used by the cross-linking analysis.
pub const DEFAULT_RTOT: f64 = 24000.0;

/// Equilibrium summary for one ligand concentration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BindingState {
    /// Ligand molecules bound through at least one epitope (`Lbound`)
    pub ligand_bound: f64,

    /// Receptors engaged by any bound ligand (`Rbnd`)
    pub receptor_bound: f64,

    /// Receptors in complexes holding two or more receptors (`Rmulti`)
    pub receptor_multimerized: f64,

    /// Cross-links formed beyond the first epitope (`nXlink`)
    pub crosslinks: f64,

    /// Free receptor at equilibrium (`Req`)
    pub free_receptor: f64,
}

/// The binding model with its fixed receptor count and solver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BindingModel {
    /// Total receptor count per cell.
    pub rtot: f64,

    /// Settings for the free-receptor root finder.
    pub root: RootConfig,
}

impl Default for BindingModel {
    fn default() -> Self {
        Self::new(DEFAULT_RTOT)
    }
}

impl BindingModel {
    /// Create a model with the given total receptor count and default solver settings.
    pub fn new(rtot: f64) -> Self {
        Self {
            rtot,
            root: RootConfig::default(),
        }
    }

    /// Set the root finder configuration.
    pub fn with_root_config(mut self, root: RootConfig) -> Self {
        self.root = root;
        self
    }

    /// Solve the binding equilibrium at one ligand concentration.
    ///
    /// See [`equilibrium`].
    pub fn equilibrium(&self, kd: f64, valency: u32, kx: f64, l0: f64) -> Result<BindingState> {
        equilibrium(self.rtot, kd, valency, kx, l0, &self.root)
    }

    /// Predict the scaled multimerized-receptor count for each condition.
    ///
    /// `valencies` and `concentrations` are paired elementwise; the result has
    /// the same length. The first condition that cannot be solved aborts the
    /// whole prediction.
    pub fn predict(
        &self,
        kd: f64,
        kx: f64,
        valencies: ArrayView1<'_, u32>,
        concentrations: ArrayView1<'_, f64>,
        scale: f64,
    ) -> Result<Array1<f64>> {
        if valencies.len() != concentrations.len() {
            return Err(BindingError::DimensionMismatch(format!(
                "{} valencies but {} concentrations",
                valencies.len(),
                concentrations.len()
            )));
        }

        let mut out = Array1::zeros(valencies.len());
        for (i, (&v, &l0)) in valencies.iter().zip(concentrations.iter()).enumerate() {
            let state = self.equilibrium(kd, v, kx, l0)?;
            out[i] = checked(
                scale * state.receptor_multimerized,
                "scaled multimerized receptor",
            )?;
        }
        Ok(out)
    }
}

/// Solve the binding equilibrium.
///
/// Finds the free receptor count `Req` in `[0, rtot]` that balances the mass
/// equation and derives bound ligand, bound receptor, multimerized receptor
/// and cross-link counts from it.
///
/// # Errors
///
/// * [`BindingError::InvalidInput`] for a non-positive or non-finite `rtot`,
///   zero valency, negative `kx`, or a non-finite argument
/// * [`BindingError::NoPhysicalSolution`] when the mass balance has no root in
///   `[0, rtot]` (for instance a negative `kd` or `l0`)
/// * [`BindingError::Overflow`] when a power or product is not representable
/// * [`BindingError::RootNotConverged`] when the root finder runs out of iterations
pub fn equilibrium(
    rtot: f64,
    kd: f64,
    valency: u32,
    kx: f64,
    l0: f64,
    config: &RootConfig,
) -> Result<BindingState> {
    if !(rtot.is_finite() && rtot > 0.0) {
        return Err(BindingError::InvalidInput(format!(
            "Rtot must be positive and finite, got {}",
            rtot
        )));
    }
    if valency == 0 {
        return Err(BindingError::InvalidInput(
            "Valency must be at least 1".to_string(),
        ));
    }
    if !(kd.is_finite() && kx.is_finite() && l0.is_finite()) {
        return Err(BindingError::InvalidInput(format!(
            "Non-finite argument: Kd = {}, Kx = {}, L0 = {}",
            kd, kx, l0
        )));
    }
    if kx < 0.0 {
        return Err(BindingError::InvalidInput(format!(
            "Kx must be non-negative, got {}",
            kx
        )));
    }

    let v = f64::from(valency);
    let affinity = checked(l0 / kd, "L0 / Kd")?;

    let mass_balance = |x: f64| -> Result<f64> {
        let crosslink = checked_powi(1.0 + kx * x, valency - 1, "(1 + Kx * x)^(v - 1)")?;
        checked(rtot - x * (1.0 + v * affinity * crosslink), "mass balance")
    };
    let req = brent(mass_balance, 0.0, rtot, config)?;

    let mut state = BindingState {
        ligand_bound: 0.0,
        receptor_bound: 0.0,
        receptor_multimerized: 0.0,
        crosslinks: 0.0,
        free_receptor: req,
    };

    for i in 1..=valency {
        let power = checked_powi(kx * req, i - 1, "(Kx * Req)^(i - 1)")?;
        let vieq = checked(
            affinity * req * binomial(valency, i) * power,
            "ligand state occupancy",
        )?;
        let fi = f64::from(i);

        state.ligand_bound += vieq;
        state.receptor_bound += fi * vieq;
        if i >= 2 {
            state.receptor_multimerized += fi * vieq;
            state.crosslinks += (fi - 1.0) * vieq;
        }
    }

    checked(state.receptor_bound, "bound receptor")?;
    Ok(state)
}

/// Binomial coefficient `C(n, k)` as a float.
pub fn binomial(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, j| acc * f64::from(n - j) / f64::from(j + 1))
}

/// `base^exp`, failing instead of returning an infinity or NaN.
fn checked_powi(base: f64, exp: u32, what: &str) -> Result<f64> {
    let exp = i32::try_from(exp)
        .map_err(|_| BindingError::Overflow(format!("{}: exponent {} too large", what, exp)))?;
    checked(base.powi(exp), what)
}

fn checked(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(BindingError::Overflow(format!("{} = {}", what, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    const KD: f64 = 1.7e-6;
    const KX: f64 = 3.15e-4;

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(3, 1), 3.0);
        assert_eq!(binomial(3, 2), 3.0);
        assert_eq!(binomial(3, 3), 1.0);
        assert_eq!(binomial(6, 3), 20.0);
        assert_eq!(binomial(10, 0), 1.0);
        assert_eq!(binomial(2, 3), 0.0);
    }

    #[test]
    fn test_reference_point() {
        let model = BindingModel::default();
        let state = model.equilibrium(KD, 3, KX, 1e-7).unwrap();

        assert_relative_eq!(state.free_receptor, 7758.919574778443, max_relative = 1e-9);
        assert_relative_eq!(state.ligand_bound, 7441.9935653349785, max_relative = 1e-9);
        assert_relative_eq!(state.receptor_bound, 16241.080425221558, max_relative = 1e-9);
        assert_relative_eq!(
            state.receptor_multimerized,
            14871.859323790068,
            max_relative = 1e-9
        );
        assert_relative_eq!(state.crosslinks, 8799.086859886582, max_relative = 1e-9);
    }

    #[test]
    fn test_mass_balance_closes() {
        let model = BindingModel::default();
        for &v in &[1u32, 2, 4, 6] {
            let state = model.equilibrium(KD, v, KX, 3e-8).unwrap();
            assert_relative_eq!(
                state.receptor_bound + state.free_receptor,
                model.rtot,
                max_relative = 1e-10
            );
        }
    }

    #[test]
    fn test_zero_ligand() {
        let model = BindingModel::default();
        let state = model.equilibrium(KD, 4, KX, 0.0).unwrap();
        assert_eq!(state.free_receptor, model.rtot);
        assert_eq!(state.ligand_bound, 0.0);
        assert_eq!(state.receptor_multimerized, 0.0);
    }

    #[test]
    fn test_invalid_arguments() {
        let config = RootConfig::default();
        assert!(matches!(
            equilibrium(0.0, KD, 2, KX, 1e-7, &config),
            Err(BindingError::InvalidInput(_))
        ));
        assert!(matches!(
            equilibrium(24000.0, KD, 0, KX, 1e-7, &config),
            Err(BindingError::InvalidInput(_))
        ));
        assert!(matches!(
            equilibrium(24000.0, KD, 2, -1e-4, 1e-7, &config),
            Err(BindingError::InvalidInput(_))
        ));
        assert!(matches!(
            equilibrium(24000.0, f64::NAN, 2, KX, 1e-7, &config),
            Err(BindingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_negative_kd_has_no_solution() {
        let config = RootConfig::default();
        let err = equilibrium(24000.0, -KD, 3, KX, 1e-7, &config).unwrap_err();
        match err {
            BindingError::NoPhysicalSolution { f_lower, f_upper } => {
                assert_eq!(f_lower, 24000.0);
                assert!(f_upper > 0.0);
            }
            other => panic!("Expected NoPhysicalSolution, got {:?}", other),
        }
    }

    #[test]
    fn test_overflow_fails_fast() {
        let config = RootConfig::default();
        let err = equilibrium(24000.0, KD, 200, 1.0, 1e-7, &config).unwrap_err();
        assert!(matches!(err, BindingError::Overflow(_)));

        let err = equilibrium(24000.0, 0.0, 2, KX, 1e-7, &config).unwrap_err();
        assert!(matches!(err, BindingError::Overflow(_)));
    }

    #[test]
    fn test_predict_scales_rmulti() {
        let model = BindingModel::default();
        let valencies = array![1u32, 3];
        let concentrations = array![1e-7, 1e-7];
        let prediction = model
            .predict(KD, KX, valencies.view(), concentrations.view(), 1e-3)
            .unwrap();

        assert_eq!(prediction.len(), 2);
        assert_eq!(prediction[0], 0.0);
        assert_relative_eq!(prediction[1], 14.871859323790068, max_relative = 1e-9);
    }

    #[test]
    fn test_predict_length_mismatch() {
        let model = BindingModel::default();
        let valencies = array![2u32, 3];
        let concentrations = array![1e-7];
        let err = model
            .predict(KD, KX, valencies.view(), concentrations.view(), 1.0)
            .unwrap_err();
        assert!(matches!(err, BindingError::DimensionMismatch(_)));
    }
}
