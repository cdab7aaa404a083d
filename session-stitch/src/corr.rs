//! Pearson correlation over possibly-incomplete vectors.

use nalgebra::DVector;

/// Pearson correlation of two equal-length vectors, pairwise-complete:
/// positions where either value is non-finite are dropped before the
/// correlation is computed.
///
/// Returns NaN when fewer than two complete pairs remain, when the
/// lengths differ, or when either side has zero variance.
pub fn pearson(x: &DVector<f64>, y: &DVector<f64>) -> f64 {
    if x.len() != y.len() {
        return f64::NAN;
    }

    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut sum_sq_x = 0.0;
    let mut sum_sq_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        numerator += dx * dy;
        sum_sq_x += dx * dx;
        sum_sq_y += dy * dy;
    }

    let denominator = (sum_sq_x * sum_sq_y).sqrt();
    if denominator > 0.0 {
        numerator / denominator
    } else {
        f64::NAN
    }
}

/// Replace NaN with negative infinity so degenerate correlations can
/// never win an argmax.
pub fn nan_to_neg_inf(value: f64) -> f64 {
    if value.is_nan() {
        f64::NEG_INFINITY
    } else {
        value
    }
}
