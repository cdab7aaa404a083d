//! Affine clock corrections.
//!
//! Spike times pass through three clocks: the probe's sample clock, an
//! auxiliary synchronization clock, and the behavioral clock shared with
//! the trial log. Each hop is a fitted affine model.

use serde::{Deserialize, Serialize};

/// One affine clock correction, `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineModel {
    /// Intercept in target-clock seconds
    pub intercept: f64,
    /// Dimensionless slope
    pub slope: f64,
}

impl AffineModel {
    /// Build a model from its fitted weights.
    pub fn new(intercept: f64, slope: f64) -> Self {
        Self { intercept, slope }
    }

    /// The identity correction (no drift).
    pub fn identity() -> Self {
        Self {
            intercept: 0.0,
            slope: 1.0,
        }
    }

    /// Map a time through the correction.
    pub fn apply(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

impl Default for AffineModel {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_is_noop() {
        let m = AffineModel::identity();
        assert_eq!(m.apply(12.5), 12.5);
        assert_eq!(m.apply(0.0), 0.0);
    }

    #[test]
    fn test_apply() {
        let m = AffineModel::new(2.0, 1.001);
        assert_relative_eq!(m.apply(10.0), 12.01, epsilon = 1e-12);
    }
}
