//! Peri-event rate curves.
//!
//! The stitcher compares clusters by a single 1-D rate curve: the
//! cluster's cross-task raster ordered by ascending reaction time, then a
//! Gaussian-kernel peri-event time histogram over a fixed window.

use crate::error::{Result, StitchError};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::f64::consts::PI;
use trial_rasters::{ClusterRaster, TrialSlice};

/// Parameters for rate-curve construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateParams {
    /// Gaussian kernel std in ms
    pub smoothing_ms: f64,
    /// Histogram window `[left, right]` in ms relative to the event
    pub window_ms: (f64, f64),
    /// Bin width in ms
    pub bin_ms: f64,
}

impl Default for RateParams {
    fn default() -> Self {
        Self {
            smoothing_ms: 10.0,
            window_ms: (-300.0, 500.0),
            bin_ms: 1.0,
        }
    }
}

impl RateParams {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.smoothing_ms > 0.0) || !self.smoothing_ms.is_finite() {
            return Err(StitchError::InvalidParameter {
                parameter: "smoothing_ms".to_string(),
                value: self.smoothing_ms,
                reason: "must be positive and finite".to_string(),
            });
        }
        if !(self.bin_ms > 0.0) || !self.bin_ms.is_finite() {
            return Err(StitchError::InvalidParameter {
                parameter: "bin_ms".to_string(),
                value: self.bin_ms,
                reason: "must be positive and finite".to_string(),
            });
        }
        if !(self.window_ms.0 < self.window_ms.1) {
            return Err(StitchError::InvalidParameter {
                parameter: "window_ms".to_string(),
                value: self.window_ms.0,
                reason: "left bound must be below right bound".to_string(),
            });
        }
        Ok(())
    }

    /// Number of histogram bins (inclusive grid).
    pub fn n_bins(&self) -> usize {
        ((self.window_ms.1 - self.window_ms.0) / self.bin_ms).floor() as usize + 1
    }
}

/// The cluster's trial slices across all task types, ordered by ascending
/// reaction time with NaN reaction times last. Order within ties follows
/// the stacking order.
pub fn sorted_cross_task_slices(raster: &ClusterRaster) -> Vec<&TrialSlice> {
    let mut slices: Vec<&TrialSlice> = raster
        .tasks
        .iter()
        .flat_map(|task| task.trials.iter())
        .collect();
    slices.sort_by(|a, b| match (a.rt_ms.is_nan(), b.rt_ms.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.rt_ms.partial_cmp(&b.rt_ms).unwrap_or(Ordering::Equal),
    });
    slices
}

/// Gaussian-kernel peri-event time histogram in spikes/second.
///
/// Each spike contributes a unit-mass Gaussian bump of std
/// `smoothing_ms`; the sum is normalized by trial count and converted
/// from per-ms to per-second. A raster with no trials yields a NaN
/// vector so correlations against it are degenerate.
pub fn rate_curve(raster: &ClusterRaster, params: &RateParams) -> Result<DVector<f64>> {
    params.validate()?;

    let slices = sorted_cross_task_slices(raster);
    let n_bins = params.n_bins();
    if slices.is_empty() {
        return Ok(DVector::from_element(n_bins, f64::NAN));
    }

    let sigma = params.smoothing_ms;
    let norm = 1.0 / (sigma * (2.0 * PI).sqrt());
    let n_trials = slices.len() as f64;

    let mut curve = DVector::zeros(n_bins);
    for b in 0..n_bins {
        let t_bin = params.window_ms.0 + b as f64 * params.bin_ms;
        let mut density = 0.0;
        for slice in &slices {
            for &t_spike in &slice.spikes_ms {
                let d = (t_bin - t_spike) / sigma;
                density += norm * (-0.5 * d * d).exp();
            }
        }
        // per-ms density per trial, converted to spikes/second
        curve[b] = density / n_trials * 1_000.0;
    }

    Ok(curve)
}
