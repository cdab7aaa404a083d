//! Drift-corrected spike-time reprojection.
//!
//! Raw spike times arrive in probe-clock samples, possibly concatenated
//! across several recordings of one session. Reprojection splits the
//! stream back into per-recording partitions and maps each spike through
//! the probe -> auxiliary -> behavioral affine corrections.

use crate::error::Result;
use crate::recording::{Recording, RecordingGroup};
use serde::{Deserialize, Serialize};

/// One recording's partition of the reprojected stream.
///
/// `indices` point back into the raw spike stream so per-spike payloads
/// (cluster ids, PC features, scaling amplitudes) stay associated without
/// copying. Within a partition both vectors preserve raw-stream order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSpikes {
    /// Recording the partition belongs to
    pub recording_id: String,
    /// False when the auxiliary-to-behavioral correction was missing and
    /// the times are auxiliary-clock seconds instead
    pub aligned: bool,
    /// Indices into the raw spike stream, ascending
    pub indices: Vec<usize>,
    /// Reprojected spike times in behavioral-clock seconds
    pub times_s: Vec<f64>,
}

impl RecordingSpikes {
    /// Number of spikes assigned to this recording.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the partition is empty.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Split a concatenated raw spike stream across the group's recordings
/// and reproject each partition into the behavioral clock.
///
/// Bucket membership uses probe-clock seconds against the cumulative
/// offset `theta`: recording `k` takes spikes with
/// `theta < t <= theta + duration_sec(k)`. The lower bound is exclusive
/// so a spike sitting exactly on a boundary belongs to the earlier
/// recording; the first bucket includes its lower bound so a spike at
/// t = 0 is kept.
///
/// A recording with no fitted auxiliary-to-behavioral correction gets
/// auxiliary-clock times and `aligned = false`; the pipeline continues.
pub fn reproject_group(
    spike_samples: &[i64],
    group: &RecordingGroup,
) -> Result<Vec<RecordingSpikes>> {
    let rate = group.sample_rate();
    let mut partitions = Vec::with_capacity(group.recordings.len());
    let mut theta = 0.0f64;

    for (k, rec) in group.recordings.iter().enumerate() {
        let duration = rec.duration_sec();
        let upper = theta + duration;

        let aux_to_behavioral = rec.aux_to_behavioral;
        if aux_to_behavioral.is_none() {
            log::warn!(
                "recording {}: no auxiliary-to-behavioral weights, emitting auxiliary-clock times",
                rec.id
            );
        }

        let mut indices = Vec::new();
        let mut times_s = Vec::new();
        for (s, &sample) in spike_samples.iter().enumerate() {
            let t_raw = sample as f64 / rate;
            let in_bucket = if k == 0 {
                theta <= t_raw && t_raw <= upper
            } else {
                theta < t_raw && t_raw <= upper
            };
            if !in_bucket {
                continue;
            }

            let u = t_raw - theta;
            let v = rec.probe_to_aux.apply(u);
            let t = match aux_to_behavioral {
                Some(model) => model.apply(v),
                None => v,
            };
            indices.push(s);
            times_s.push(t);
        }

        partitions.push(RecordingSpikes {
            recording_id: rec.id.clone(),
            aligned: aux_to_behavioral.is_some(),
            indices,
            times_s,
        });
        theta = upper;
    }

    let assigned: usize = partitions.iter().map(|p| p.len()).sum();
    if assigned < spike_samples.len() {
        log::warn!(
            "{} of {} spikes fall outside the group's total duration and were dropped",
            spike_samples.len() - assigned,
            spike_samples.len()
        );
    }

    Ok(partitions)
}

/// Reproject a single recording's spike stream, the group-of-one case.
pub fn reproject_recording(
    spike_samples: &[i64],
    recording: &Recording,
) -> Result<RecordingSpikes> {
    let group = RecordingGroup::single(recording.clone())?;
    let mut partitions = reproject_group(spike_samples, &group)?;
    Ok(partitions.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::AffineModel;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn identity_rec(id: &str, samples: i64) -> Recording {
        Recording {
            id: id.to_string(),
            duration_samples: samples,
            sample_rate: 30_000.0,
            probe_to_aux: AffineModel::identity(),
            aux_to_behavioral: Some(AffineModel::identity()),
        }
    }

    #[test]
    fn test_single_recording_identity() {
        // Two clusters' worth of spikes on one 1 s recording; identity
        // transforms leave sample/rate seconds untouched.
        let rec = identity_rec("r1", 30_000);
        let mut samples: Vec<i64> = (1..=99).map(|i| i * 300).collect();
        samples.extend_from_slice(&[450, 1_200, 3_000]);

        let out = reproject_recording(&samples, &rec).unwrap();
        assert_eq!(out.len(), samples.len());
        assert!(out.aligned);
        assert_relative_eq!(out.times_s[0], 0.01, epsilon = 1e-12);
        assert_relative_eq!(out.times_s[98], 0.99, epsilon = 1e-12);
        assert_relative_eq!(out.times_s[99], 0.015, epsilon = 1e-12);
        assert_relative_eq!(out.times_s[100], 0.04, epsilon = 1e-12);
        assert_relative_eq!(out.times_s[101], 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_grouped_split() {
        // 1 s + 2 s group; the spike at exactly the 30 s mark of a scaled
        // group goes to the earlier recording (upper-inclusive rule).
        let group = RecordingGroup::new(vec![
            identity_rec("a", 900_000),
            identity_rec("b", 1_800_000),
        ])
        .unwrap();

        let seconds: [f64; 6] = [0.5, 1.2, 29.999, 30.001, 45.0, 89.9];
        let samples: Vec<i64> =
            seconds.iter().map(|s| (s * 30_000.0).round() as i64).collect();

        let parts = reproject_group(&samples, &group).unwrap();
        assert_eq!(parts.len(), 2);

        assert_eq!(parts[0].indices, vec![0, 1, 2]);
        assert_relative_eq!(parts[0].times_s[2], 29.999, epsilon = 1e-9);

        assert_eq!(parts[1].indices, vec![3, 4, 5]);
        assert_relative_eq!(parts[1].times_s[0], 0.001, epsilon = 1e-9);
        assert_relative_eq!(parts[1].times_s[1], 15.0, epsilon = 1e-9);
        assert_relative_eq!(parts[1].times_s[2], 59.9, epsilon = 1e-9);
    }

    #[test]
    fn test_boundary_spike_goes_to_earlier_recording() {
        let group = RecordingGroup::new(vec![
            identity_rec("a", 900_000),
            identity_rec("b", 900_000),
        ])
        .unwrap();

        // Exactly 30.0 s
        let parts = reproject_group(&[900_000], &group).unwrap();
        assert_eq!(parts[0].indices, vec![0]);
        assert!(parts[1].is_empty());
    }

    #[test]
    fn test_first_bucket_keeps_time_zero() {
        let rec = identity_rec("r1", 30_000);
        let out = reproject_recording(&[0], &rec).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.times_s[0], 0.0);
    }

    #[test]
    fn test_missing_behavioral_model_soft_fails() {
        let mut rec = identity_rec("r1", 30_000);
        rec.probe_to_aux = AffineModel::new(0.5, 1.0);
        rec.aux_to_behavioral = None;

        let out = reproject_recording(&[15_000], &rec).unwrap();
        assert!(!out.aligned);
        // Auxiliary-clock seconds: 0.5 + 1.0 * 0.5
        assert_relative_eq!(out.times_s[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_order_preserved_within_recording() {
        let rec = identity_rec("r1", 30_000);
        // Deliberately unsorted input; partition keeps stream order.
        let out = reproject_recording(&[9_000, 3_000, 6_000], &rec).unwrap();
        assert_eq!(out.indices, vec![0, 1, 2]);
        assert_relative_eq!(out.times_s[0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(out.times_s[1], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_partition_completeness() {
        let group = RecordingGroup::new(vec![
            identity_rec("a", 300_000),
            identity_rec("b", 300_000),
            identity_rec("c", 300_000),
        ])
        .unwrap();
        let samples: Vec<i64> = (0..600).map(|i| i * 1_499).collect();

        let parts = reproject_group(&samples, &group).unwrap();
        let mut all: Vec<usize> = parts.iter().flat_map(|p| p.indices.clone()).collect();
        all.sort_unstable();
        let expected: Vec<usize> = (0..samples.len()).collect();
        assert_eq!(all, expected);
    }

    proptest! {
        /// The reprojected time equals b0 + b1*(a0 + a1*(s/Fs)) exactly,
        /// evaluated in the same operation order on f64.
        #[test]
        fn prop_reprojection_linearity(
            a0 in -10.0f64..10.0,
            a1 in 0.9f64..1.1,
            b0 in -10.0f64..10.0,
            b1 in 0.9f64..1.1,
            sample in 0i64..900_000,
        ) {
            let rec = Recording {
                id: "p".to_string(),
                duration_samples: 900_000,
                sample_rate: 30_000.0,
                probe_to_aux: AffineModel::new(a0, a1),
                aux_to_behavioral: Some(AffineModel::new(b0, b1)),
            };
            let out = reproject_recording(&[sample], &rec).unwrap();
            prop_assert_eq!(out.len(), 1);

            let u = sample as f64 / 30_000.0 - 0.0;
            let reference = b0 + b1 * (a0 + a1 * u);
            prop_assert_eq!(out.times_s[0].to_bits(), reference.to_bits());
        }
    }
}
