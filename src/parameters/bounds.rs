//! Box limits on `Kd`, `Kx` and scale, and the change of variables that keeps
//! the unconstrained optimizer inside them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("lower limit {min} is above upper limit {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("{value} lies outside [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("value is not finite")]
    InfiniteValue,
}

/// Closed interval `[min, max]` for one parameter. Either end may be infinite.
///
/// Infinite limits serialize as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoundsRepr", into = "BoundsRepr")]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Serialize, Deserialize)]
struct BoundsRepr {
    #[serde(default)]
    min: Option<f64>,

    #[serde(default)]
    max: Option<f64>,
}

impl From<BoundsRepr> for Bounds {
    fn from(repr: BoundsRepr) -> Self {
        Self {
            min: repr.min.unwrap_or(f64::NEG_INFINITY),
            max: repr.max.unwrap_or(f64::INFINITY),
        }
    }
}

impl From<Bounds> for BoundsRepr {
    fn from(bounds: Bounds) -> Self {
        Self {
            min: bounds.min.is_finite().then_some(bounds.min),
            max: bounds.max.is_finite().then_some(bounds.max),
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }
}

impl Bounds {
    /// Fails when `min > max` or either limit is NaN.
    ///
    /// # Examples
    ///
    /// ```
    /// use stonefit_rs::parameters::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert_eq!(bounds.max, 10.0);
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min > max || min.is_nan() || max.is_nan() {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// `[min, ∞)`
    pub fn min_only(min: f64) -> Self {
        Self {
            min,
            max: f64::INFINITY,
        }
    }

    /// `(-∞, max]`
    pub fn max_only(max: f64) -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max,
        }
    }

    /// `[value - half_width, value + half_width]`, used to hold a parameter
    /// nearly fixed.
    pub fn around(value: f64, half_width: f64) -> Result<Self, BoundsError> {
        if !value.is_finite() {
            return Err(BoundsError::InfiniteValue);
        }
        let half_width = half_width.abs();
        Self::new(value - half_width, value + half_width)
    }

    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Both limits finite.
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    /// At least one limit finite.
    pub fn is_bounded(&self) -> bool {
        self.has_lower_bound() || self.has_upper_bound()
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Maps an unconstrained internal coordinate onto a bounded external value.
///
/// One-sided limits use `min - 1 + sqrt(u² + 1)` (mirrored for an upper
/// limit) and two-sided limits use `min + (sin u + 1)(max - min) / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Internal to external. Never leaves the box.
    pub fn to_external(&self, internal_value: f64) -> f64 {
        match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => internal_value,
            (true, false) => self.bounds.min - 1.0 + (internal_value * internal_value + 1.0).sqrt(),
            (false, true) => self.bounds.max + 1.0 - (internal_value * internal_value + 1.0).sqrt(),
            (true, true) => {
                let width = self.bounds.max - self.bounds.min;
                self.bounds.min + (internal_value.sin() + 1.0) * width / 2.0
            }
        }
    }

    /// External to internal. Fails on a non-finite or out-of-box value.
    pub fn to_internal(&self, external_value: f64) -> Result<f64, BoundsError> {
        if !external_value.is_finite() {
            return Err(BoundsError::InfiniteValue);
        }

        if !self.bounds.is_within_bounds(external_value) {
            return Err(BoundsError::ValueOutsideBounds {
                value: external_value,
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }

        let internal = match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => external_value,
            (true, false) => ((external_value - self.bounds.min + 1.0).powi(2) - 1.0).sqrt(),
            (false, true) => ((self.bounds.max - external_value + 1.0).powi(2) - 1.0).sqrt(),
            (true, true) => {
                let width = self.bounds.max - self.bounds.min;
                if width == 0.0 {
                    0.0
                } else {
                    // rounding can push this a hair past ±1
                    let scaled = 2.0 * (external_value - self.bounds.min) / width - 1.0;
                    scaled.clamp(-1.0, 1.0).asin()
                }
            }
        };
        Ok(internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_creation() {
        let bounds = Bounds::new(0.0, 10.0).unwrap();
        assert_eq!(bounds.min, 0.0);
        assert_eq!(bounds.max, 10.0);

        assert!(Bounds::new(10.0, 0.0).is_err());
        assert!(Bounds::new(f64::NAN, 0.0).is_err());

        let bounds = Bounds::unbounded();
        assert_eq!(bounds.min, f64::NEG_INFINITY);
        assert_eq!(bounds.max, f64::INFINITY);
        assert!(!bounds.is_bounded());

        let bounds = Bounds::min_only(5.0);
        assert!(bounds.has_lower_bound());
        assert!(!bounds.has_upper_bound());

        let bounds = Bounds::max_only(15.0);
        assert!(!bounds.has_lower_bound());
        assert!(bounds.has_upper_bound());
    }

    #[test]
    fn test_around() {
        let bounds = Bounds::around(2.0, 1e-3).unwrap();
        assert_eq!(bounds.min, 2.0 - 1e-3);
        assert_eq!(bounds.max, 2.0 + 1e-3);
        assert!(bounds.is_finite());

        assert_eq!(Bounds::around(f64::INFINITY, 1.0), Err(BoundsError::InfiniteValue));
    }

    #[test]
    fn test_is_within_bounds_and_clamp() {
        let bounds = Bounds::new(0.0, 10.0).unwrap();

        assert!(bounds.is_within_bounds(0.0));
        assert!(bounds.is_within_bounds(10.0));
        assert!(!bounds.is_within_bounds(-1.0));

        assert_eq!(bounds.clamp(-5.0), 0.0);
        assert_eq!(bounds.clamp(15.0), 10.0);
    }

    #[test]
    fn test_bounds_json_round_trip() {
        let bounds = Bounds::min_only(0.0);
        let json = serde_json::to_string(&bounds).unwrap();
        assert_eq!(json, r#"{"min":0.0,"max":null}"#);

        let back: Bounds = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bounds);

        let open: Bounds = serde_json::from_str("{}").unwrap();
        assert_eq!(open, Bounds::unbounded());
    }

    #[test]
    fn test_bounds_transform_unbounded() {
        let transform = BoundsTransform::new(Bounds::unbounded());

        for &value in &[-10.0, 0.0, 1e-6, 10.0] {
            assert_eq!(transform.to_external(value), value);
            assert_eq!(transform.to_internal(value).unwrap(), value);
        }
    }

    #[test]
    fn test_bounds_transform_one_sided() {
        for bounds in [Bounds::min_only(5.0), Bounds::max_only(5.0)] {
            let transform = BoundsTransform::new(bounds);
            for &internal in &[1.0, 5.0, 10.0] {
                let external = transform.to_external(internal);
                assert!(bounds.is_within_bounds(external));

                let round_trip = transform.to_internal(external).unwrap();
                assert!((internal - round_trip).abs() < 1e-8, "{} -> {}", internal, round_trip);
            }
        }
    }

    #[test]
    fn test_bounds_transform_both_bounds() {
        let bounds = Bounds::new(0.0, 10.0).unwrap();
        let transform = BoundsTransform::new(bounds);

        for &internal in &[0.0, 0.5, 1.0] {
            let external = transform.to_external(internal);
            assert!(bounds.is_within_bounds(external));

            let round_trip = transform.to_internal(external).unwrap();
            assert!((internal - round_trip).abs() < 1e-8);
        }

        assert!(bounds.is_within_bounds(transform.to_external(123.4)));
    }

    #[test]
    fn test_bounds_transform_errors() {
        let transform = BoundsTransform::new(Bounds::new(0.0, 10.0).unwrap());

        assert!(transform.to_internal(-1.0).is_err());
        assert!(transform.to_internal(11.0).is_err());
        assert_eq!(transform.to_internal(f64::INFINITY), Err(BoundsError::InfiniteValue));
    }

    #[test]
    fn test_error_messages() {
        let transform = BoundsTransform::new(Bounds::new(0.0, 1.0).unwrap());
        let err = transform.to_internal(2.0).unwrap_err();
        assert_eq!(err.to_string(), "2 lies outside [0, 1]");
        assert_eq!(
            Bounds::new(3.0, 1.0).unwrap_err().to_string(),
            "lower limit 3 is above upper limit 1"
        );
    }
}
