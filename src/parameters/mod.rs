//! # Model parameters
//!
//! The fitted quantities of the binding model are the dissociation constant
//! `Kd`, the cross-linking constant `Kx` and a response scale factor. The
//! optimizer sees them as a 3-vector in that fixed order; [`ModelParams`] is the
//! named view and [`ParamIndex`] addresses a single coordinate.
//!
//! ```rust
//! use stonefit_rs::parameters::{ModelParams, ParamIndex};
//!
//! let params = ModelParams::new(1.7e-6, 3.15e-4, 1e-3);
//! let vector = params.to_array();
//! assert_eq!(vector[ParamIndex::Kx.index()], 3.15e-4);
//!
//! let pinned = params.with_value(ParamIndex::Kd, 2.0e-6);
//! assert_eq!(pinned.kd, 2.0e-6);
//! ```

pub mod bounds;

use std::fmt;

use ndarray::{array, Array1};
use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};

// Re-export key types
pub use bounds::{Bounds, BoundsError, BoundsTransform};

/// Number of fitted parameters.
pub const N_PARAMS: usize = 3;

/// A coordinate of the parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamIndex {
    /// Dissociation constant
    Kd,
    /// Cross-linking constant
    Kx,
    /// Response scale factor
    Scale,
}

impl ParamIndex {
    /// All coordinates in vector order.
    pub const ALL: [ParamIndex; N_PARAMS] = [ParamIndex::Kd, ParamIndex::Kx, ParamIndex::Scale];

    /// Position in the parameter vector.
    pub fn index(self) -> usize {
        match self {
            ParamIndex::Kd => 0,
            ParamIndex::Kx => 1,
            ParamIndex::Scale => 2,
        }
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            ParamIndex::Kd => "Kd",
            ParamIndex::Kx => "Kx",
            ParamIndex::Scale => "scale",
        }
    }
}

impl fmt::Display for ParamIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named binding-model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Dissociation constant `Kd`
    pub kd: f64,

    /// Cross-linking constant `Kx`
    pub kx: f64,

    /// Scale from multimerized receptor count to measured response
    pub scale: f64,
}

impl ModelParams {
    /// Create a parameter set.
    pub fn new(kd: f64, kx: f64, scale: f64) -> Self {
        Self { kd, kx, scale }
    }

    /// The parameters as `[Kd, Kx, scale]`.
    pub fn to_array(&self) -> Array1<f64> {
        array![self.kd, self.kx, self.scale]
    }

    /// Read parameters from a `[Kd, Kx, scale]` vector.
    pub fn from_array(values: &Array1<f64>) -> Result<Self> {
        if values.len() != N_PARAMS {
            return Err(BindingError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                N_PARAMS,
                values.len()
            )));
        }
        Ok(Self::new(values[0], values[1], values[2]))
    }

    /// The value of one coordinate.
    pub fn get(&self, index: ParamIndex) -> f64 {
        match index {
            ParamIndex::Kd => self.kd,
            ParamIndex::Kx => self.kx,
            ParamIndex::Scale => self.scale,
        }
    }

    /// A copy with one coordinate replaced.
    pub fn with_value(mut self, index: ParamIndex, value: f64) -> Self {
        match index {
            ParamIndex::Kd => self.kd = value,
            ParamIndex::Kx => self.kx = value,
            ParamIndex::Scale => self.scale = value,
        }
        self
    }
}

impl fmt::Display for ModelParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Kd = {:.6e}, Kx = {:.6e}, scale = {:.6e}",
            self.kd, self.kx, self.scale
        )
    }
}

/// Per-coordinate bounds for a fit, unbounded by default.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamBounds {
    pub kd: Bounds,
    pub kx: Bounds,
    pub scale: Bounds,
}

impl ParamBounds {
    /// No bounds on any coordinate.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Non-negative `Kd`, `Kx` and scale.
    pub fn non_negative() -> Self {
        Self {
            kd: Bounds::min_only(0.0),
            kx: Bounds::min_only(0.0),
            scale: Bounds::min_only(0.0),
        }
    }

    /// The bounds on one coordinate.
    pub fn get(&self, index: ParamIndex) -> Bounds {
        match index {
            ParamIndex::Kd => self.kd,
            ParamIndex::Kx => self.kx,
            ParamIndex::Scale => self.scale,
        }
    }

    /// A copy with the bounds on one coordinate replaced.
    pub fn with(mut self, index: ParamIndex, bounds: Bounds) -> Self {
        match index {
            ParamIndex::Kd => self.kd = bounds,
            ParamIndex::Kx => self.kx = bounds,
            ParamIndex::Scale => self.scale = bounds,
        }
        self
    }

    /// Bounds in vector order.
    pub fn to_vec(&self) -> Vec<Bounds> {
        ParamIndex::ALL.iter().map(|&i| self.get(i)).collect()
    }

    /// Whether any coordinate has a finite limit.
    pub fn is_bounded(&self) -> bool {
        ParamIndex::ALL.iter().any(|&i| self.get(i).is_bounded())
    }
}
