//! # stonefit-rs
//!
//! `stonefit-rs` fits the Stone et al. multivalent ligand-receptor binding
//! model to measurements of receptor cross-linking, and explores how well the
//! data pin down its parameters.
//!
//! The library provides:
//! - An equilibrium solver for the binding model with explicit failure on
//!   unphysical parameters and floating-point overflow
//! - A Levenberg-Marquardt fit of `Kd`, `Kx` and a response scale, with
//!   optional bounds and pinned coordinates
//! - Local and profile sensitivity scans over a log-spaced multiplier grid
//! - Bootstrap and leave-one-out resampling, and linearized uncertainties
//!
//! ## Basic Usage
//!
//! ```
//! use stonefit_rs::{BindingFitter, BindingModel, Dataset, ModelParams};
//!
//! let data = Dataset::parse(
//!     "1e-8, 1.786370807692543, 2\n\
//!      1e-7, 7.792843188125676, 2\n\
//!      1e-8, 8.605679079726404, 3\n\
//!      1e-7, 14.871859323790067, 3\n\
//!      1e-6, 15.518520016536545, 3\n",
//! )
//! .unwrap();
//!
//! let fitter = BindingFitter::new(&data, BindingModel::default());
//! let fit = fitter.fit(ModelParams::new(2e-6, 4e-4, 1.2e-3)).unwrap();
//! assert!((fit.params.kd / 1.7e-6 - 1.0).abs() < 1e-4);
//! ```

pub mod binding;
pub mod config;
pub mod data;
pub mod error;
pub mod fit;
pub mod lm;
pub mod parameters;
pub mod problem;
pub mod resampling;
pub mod sensitivity;
pub mod uncertainty;
pub mod utils;

// Re-exports for convenience
pub use binding::{BindingModel, BindingState};
pub use config::AnalysisConfig;
pub use data::{Dataset, Observation};
pub use error::{BindingError, Result};
pub use fit::{BindingFitter, FitOptions, FitResult, PinStrategy};
pub use lm::{ConvergenceStatus, LevenbergMarquardt, LmConfig};
pub use parameters::{Bounds, ModelParams, ParamBounds, ParamIndex};
pub use problem::Problem;
pub use sensitivity::{LocalScan, ProfileScan, ScanConfig};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
