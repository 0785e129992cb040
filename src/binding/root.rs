//! Bracketed root finding.
//!
//! Brent's method: inverse quadratic interpolation and secant steps,
//! safeguarded by bisection so the bracket always shrinks.

use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};

/// Convergence settings for the bracketed root finder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    /// Absolute tolerance on the root. Default: 2e-12
    pub xtol: f64,

    /// Relative tolerance on the root. Default: 4 * f64::EPSILON
    pub rtol: f64,

    /// Maximum number of iterations. Default: 100
    pub max_iterations: usize,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            xtol: 2e-12,
            rtol: 4.0 * f64::EPSILON,
            max_iterations: 100,
        }
    }
}

impl RootConfig {
    /// Set the absolute tolerance.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    /// Set the relative tolerance.
    pub fn with_rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Find a root of `f` in `[lower, upper]` with Brent's method.
///
/// `f(lower)` and `f(upper)` must not share a sign; if they do this returns
/// [`BindingError::NoPhysicalSolution`] carrying both values. An endpoint where
/// `f` is exactly zero is returned as is. Errors raised by `f` itself are
/// propagated unchanged.
pub fn brent<F>(f: F, lower: f64, upper: f64, config: &RootConfig) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
{
    if !(lower.is_finite() && upper.is_finite()) || lower > upper {
        return Err(BindingError::InvalidInput(format!(
            "Invalid bracket: [{}, {}]",
            lower, upper
        )));
    }

    let mut a = lower;
    let mut b = upper;
    let mut fa = f(a)?;
    let mut fb = f(b)?;

    if fa * fb > 0.0 {
        return Err(BindingError::NoPhysicalSolution {
            f_lower: fa,
            f_upper: fb,
        });
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..config.max_iterations {
        // Keep the root bracketed between b and c.
        if (fb > 0.0) == (fc > 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        // b is always the best estimate so far.
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * config.rtol * b.abs() + 0.5 * config.xtol;
        let m = 0.5 * (c - b);
        if m.abs() <= tol || fb == 0.0 {
            return Ok(b);
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                // Secant
                (2.0 * m * s, 1.0 - s)
            } else {
                // Inverse quadratic interpolation
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * m * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }

            if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                e = d;
                d = p / q;
            } else {
                d = m;
                e = m;
            }
        } else {
            d = m;
            e = m;
        }

        a = b;
        fa = fb;
        if d.abs() > tol {
            b += d;
        } else if m > 0.0 {
            b += tol;
        } else {
            b -= tol;
        }
        fb = f(b)?;
    }

    Err(BindingError::RootNotConverged {
        iterations: config.max_iterations,
    })
}
