//! Multiplier grids for parameter scans.

use ndarray::Array1;

use crate::error::{BindingError, Result};

/// `n` points spaced evenly in log10 between `start` and `stop`, inclusive.
///
/// `logspace(0.1, 10.0, 41)` gives the multipliers 0.1x..10x used by the
/// sensitivity scans, with 1.0 at the center.
pub fn logspace(start: f64, stop: f64, n: usize) -> Result<Array1<f64>> {
    if !(start > 0.0 && stop > 0.0 && start.is_finite() && stop.is_finite()) {
        return Err(BindingError::InvalidInput(format!(
            "logspace bounds must be positive and finite, got [{}, {}]",
            start, stop
        )));
    }
    match n {
        0 => Ok(Array1::zeros(0)),
        1 => Ok(Array1::from_elem(1, start)),
        _ => {
            let (lo, hi) = (start.log10(), stop.log10());
            let step = (hi - lo) / (n - 1) as f64;
            Ok((0..n)
                .map(|i| {
                    if i == n - 1 {
                        stop
                    } else {
                        10f64.powf(lo + step * i as f64)
                    }
                })
                .collect())
        }
    }
}
