//! Utility functions and helpers for the stonefit-rs library.

pub mod finite_difference;
pub mod grid;
pub mod matrix_convert;
pub mod parallel;

// Re-export commonly used utilities
pub use finite_difference::{jacobian, jacobian_at};
pub use grid::logspace;
pub use parallel::map_grid;
pub use matrix_convert::{
    nalgebra_to_ndarray, nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};
