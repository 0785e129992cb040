//! Analysis configuration.
//!
//! [`AnalysisConfig`] gathers every tunable of a fitting session in one
//! serde struct. Missing JSON fields fall back to their defaults, so a config
//! file only needs to name what it changes:
//!
//! ```rust
//! use stonefit_rs::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_json_str(r#"{"scan": {"points": 21}}"#).unwrap();
//! assert_eq!(config.scan.points, 21);
//! assert_eq!(config.rtot, 24000.0);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::binding::root::RootConfig;
use crate::binding::{BindingModel, DEFAULT_RTOT};
use crate::error::{BindingError, Result};
use crate::fit::FitOptions;
use crate::parameters::ModelParams;
use crate::resampling::BootstrapConfig;
use crate::sensitivity::ScanConfig;

/// Settings for a complete fit-and-analyze session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Total receptor count per cell
    pub rtot: f64,

    /// Starting point of the fit
    pub initial: ModelParams,

    /// Equilibrium root finder
    pub root: RootConfig,

    /// Optimizer settings and bounds
    pub fit: FitOptions,

    /// Local and profile scan grid
    pub scan: ScanConfig,

    /// Bootstrap settings
    pub bootstrap: BootstrapConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rtot: DEFAULT_RTOT,
            initial: ModelParams::new(1.7e-6, 3.15e-4, 1e-3),
            root: RootConfig::default(),
            fit: FitOptions::default(),
            scan: ScanConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The binding model these settings describe.
    pub fn model(&self) -> BindingModel {
        BindingModel::new(self.rtot).with_root_config(self.root)
    }

    /// Reject settings no analysis can run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.rtot.is_finite() && self.rtot > 0.0) {
            return Err(BindingError::InvalidInput(format!(
                "rtot must be positive and finite, got {}",
                self.rtot
            )));
        }
        self.scan.multipliers()?;
        if !(self.bootstrap.confidence > 0.0 && self.bootstrap.confidence < 1.0) {
            return Err(BindingError::InvalidInput(format!(
                "bootstrap confidence must be in (0, 1), got {}",
                self.bootstrap.confidence
            )));
        }
        Ok(())
    }
}
