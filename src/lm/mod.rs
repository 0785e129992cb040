//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides an implementation of the Levenberg-Marquardt algorithm
//! for nonlinear least-squares optimization, with scale-free convergence tests
//! suited to parameters that span many orders of magnitude.

pub mod algorithm;
pub mod config;
pub mod convergence;

// Re-export key types
pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
