//! Best/worst channel selection per cluster.
//!
//! The best channel is where the template carries the most energy,
//! modulated by how many of the cluster's spikes actually have PC
//! features on that channel. The worst channel is a low-energy reference
//! used downstream as a noise floor.

use crate::error::{Result, UnitsError};
use crate::model::SorterOutput;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters for channel selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSelectParams {
    /// Weight of normalized template energy in the combined score;
    /// the remainder weighs normalized PC coverage.
    pub energy_weight: f64,
    /// Minimum PC coverage a channel needs to serve as the noise reference.
    pub coverage_floor: f64,
}

impl Default for ChannelSelectParams {
    fn default() -> Self {
        Self {
            energy_weight: 1.0,
            coverage_floor: 0.1,
        }
    }
}

impl ChannelSelectParams {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.energy_weight) {
            return Err(UnitsError::InvalidParameter {
                parameter: "energy_weight".to_string(),
                value: self.energy_weight,
                reason: "must be in [0, 1]".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.coverage_floor) {
            return Err(UnitsError::InvalidParameter {
                parameter: "coverage_floor".to_string(),
                value: self.coverage_floor,
                reason: "must be in [0, 1]".to_string(),
            });
        }
        Ok(())
    }
}

/// Chosen channels for one cluster, as local PC column indices and
/// their global acquisition-channel identities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSelection {
    pub best_local: usize,
    pub worst_local: usize,
    pub best_channel: i32,
    pub worst_channel: i32,
}

/// Select best and worst channels for a single cluster.
///
/// Returns `None` for a cluster with no spikes; such clusters are omitted
/// from the channel table entirely.
pub fn select_for_cluster(
    out: &SorterOutput,
    cluster: i32,
    params: &ChannelSelectParams,
) -> Option<ChannelSelection> {
    let spikes = out.spike_indices_of(cluster);
    if spikes.is_empty() {
        return None;
    }

    let template = out.primary_template_of(cluster)?;
    let waveform = out.template_on_local_channels(template);
    let n_local = waveform.shape()[1];
    let n_samples = waveform.shape()[0];
    if n_local == 0 {
        return None;
    }

    // Per-channel template energy
    let mut energy = vec![0.0f64; n_local];
    for l in 0..n_local {
        for t in 0..n_samples {
            let w = waveform[[t, l]] as f64;
            energy[l] += w * w;
        }
    }

    // Per-channel PC coverage: fraction of spikes whose PC column is not
    // identically zero
    let n_components = out.pc_features.shape()[1];
    let mut covered = vec![0usize; n_local];
    for &s in &spikes {
        for l in 0..n_local {
            let any_nonzero =
                (0..n_components).any(|k| out.pc_features[[s, k, l]] != 0.0);
            if any_nonzero {
                covered[l] += 1;
            }
        }
    }
    let coverage: Vec<f64> = covered
        .iter()
        .map(|&c| c as f64 / spikes.len() as f64)
        .collect();

    let energy_max = energy.iter().cloned().fold(0.0f64, f64::max);
    let coverage_max = coverage.iter().cloned().fold(0.0f64, f64::max);
    let norm = |v: &[f64], max: f64| -> Vec<f64> {
        if max > 0.0 {
            v.iter().map(|x| x / max).collect()
        } else {
            vec![0.0; v.len()]
        }
    };
    let energy_norm = norm(&energy, energy_max);
    let coverage_norm = norm(&coverage, coverage_max);

    let alpha = params.energy_weight;
    let score: Vec<f64> = energy_norm
        .iter()
        .zip(&coverage_norm)
        .map(|(e, c)| alpha * e + (1.0 - alpha) * c)
        .collect();

    let argmax = |xs: &[f64], allowed: &dyn Fn(usize) -> bool| -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &x) in xs.iter().enumerate() {
            if !allowed(i) {
                continue;
            }
            if best.map_or(true, |(_, b)| x > b) {
                best = Some((i, x));
            }
        }
        best.map(|(i, _)| i)
    };
    let argmin = |xs: &[f64], allowed: &dyn Fn(usize) -> bool| -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &x) in xs.iter().enumerate() {
            if !allowed(i) {
                continue;
            }
            if best.map_or(true, |(_, b)| x < b) {
                best = Some((i, x));
            }
        }
        best.map(|(i, _)| i)
    };

    // Best channel: argmax score, restricted to covered channels when the
    // unrestricted winner has under half coverage
    let mut best_local = argmax(&score, &|_| true)?;
    if coverage[best_local] < 0.5 {
        if let Some(guarded) = argmax(&score, &|i| coverage[i] >= 0.5) {
            best_local = guarded;
        }
    }

    // Worst channel: argmin energy, guarded so the noise reference still
    // has PC mass and nonzero template energy.
    let floor = params.coverage_floor;
    let mut worst_local = argmin(&energy, &|_| true)?;
    if coverage[worst_local] < floor {
        if let Some(guarded) =
            argmin(&energy, &|i| coverage[i] >= floor && energy[i] > 0.0)
        {
            worst_local = guarded;
        }
    }

    // best_channel != worst_channel whenever there are two local channels
    if worst_local == best_local && n_local >= 2 {
        worst_local = argmin(&energy, &|i| i != best_local)?;
    }

    let locals = out.local_channels_of_template(template);
    Some(ChannelSelection {
        best_local,
        worst_local,
        best_channel: locals[best_local],
        worst_channel: locals[worst_local],
    })
}

/// Build the cluster-to-channel table for every cluster with spikes.
pub fn assign_channels(
    out: &SorterOutput,
    params: &ChannelSelectParams,
) -> Result<BTreeMap<i32, ChannelSelection>> {
    params.validate()?;

    let mut table = BTreeMap::new();
    for cluster in out.cluster_ids() {
        if let Some(selection) = select_for_cluster(out, cluster, params) {
            table.insert(cluster, selection);
        }
    }
    Ok(table)
}

/// Clusters sharing a cluster's best channel, excluding the cluster itself.
pub fn neighbors_on_best_channel(
    table: &BTreeMap<i32, ChannelSelection>,
    cluster: i32,
) -> Vec<i32> {
    let Some(own) = table.get(&cluster) else {
        return Vec::new();
    };
    table
        .iter()
        .filter(|(&id, sel)| id != cluster && sel.best_channel == own.best_channel)
        .map(|(&id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::QualityLabel;
    use ndarray::{Array2, Array3};
    use std::collections::BTreeMap;

    /// One cluster, one template over 3 local channels. Channel energies
    /// 0 < 1 < 2; PC coverage is set per test.
    fn output_with_coverage(pc_pattern: &[[bool; 3]]) -> SorterOutput {
        let n_spikes = pc_pattern.len();
        let mut templates = Array3::zeros((1, 2, 3));
        // energies: ch0 = 1, ch1 = 4, ch2 = 9
        templates[[0, 0, 0]] = 1.0;
        templates[[0, 0, 1]] = 2.0;
        templates[[0, 0, 2]] = 3.0;

        let mut pc_feature_ind = Array2::zeros((1, 3));
        for l in 0..3 {
            pc_feature_ind[[0, l]] = l as i32;
        }

        let mut pc_features = Array3::zeros((n_spikes, 3, 3));
        for (s, row) in pc_pattern.iter().enumerate() {
            for (l, &on) in row.iter().enumerate() {
                if on {
                    pc_features[[s, 0, l]] = 0.5;
                }
            }
        }

        SorterOutput {
            spike_times: (0..n_spikes as i64).map(|i| i * 100).collect(),
            spike_clusters: vec![1; n_spikes],
            spike_templates: vec![0; n_spikes],
            templates,
            pc_features,
            pc_feature_ind,
            scaling_amps: vec![1.0; n_spikes],
            channel_map: vec![0, 1, 2],
            quality: BTreeMap::new(),
        }
    }

    #[test]
    fn test_best_is_peak_energy_channel() {
        let out = output_with_coverage(&[[true; 3], [true; 3]]);
        let sel =
            select_for_cluster(&out, 1, &ChannelSelectParams::default()).unwrap();
        assert_eq!(sel.best_local, 2);
        assert_eq!(sel.worst_local, 0);
        assert_eq!(sel.best_channel, 2);
        assert_eq!(sel.worst_channel, 0);
    }

    #[test]
    fn test_best_coverage_guard_restricts() {
        // Peak-energy channel 2 is covered on only 1 of 4 spikes; channel 1
        // is fully covered and wins after the guard.
        let out = output_with_coverage(&[
            [true, true, true],
            [true, true, false],
            [true, true, false],
            [true, true, false],
        ]);
        let sel =
            select_for_cluster(&out, 1, &ChannelSelectParams::default()).unwrap();
        assert_eq!(sel.best_local, 1);
    }

    #[test]
    fn test_best_guard_empty_set_keeps_original() {
        // No channel reaches 50% coverage; the unrestricted argmax stands.
        let out = output_with_coverage(&[
            [false, false, true],
            [false, false, false],
            [false, false, false],
        ]);
        let sel =
            select_for_cluster(&out, 1, &ChannelSelectParams::default()).unwrap();
        assert_eq!(sel.best_local, 2);
    }

    #[test]
    fn test_worst_coverage_guard() {
        // Lowest-energy channel 0 has zero coverage; channel 1 is the
        // lowest-energy channel that clears the floor.
        let out = output_with_coverage(&[
            [false, true, true],
            [false, true, true],
            [false, true, true],
        ]);
        let sel =
            select_for_cluster(&out, 1, &ChannelSelectParams::default()).unwrap();
        assert_eq!(sel.worst_local, 1);
    }

    #[test]
    fn test_zero_spike_cluster_omitted() {
        let out = output_with_coverage(&[[true; 3]]);
        assert!(select_for_cluster(&out, 99, &ChannelSelectParams::default()).is_none());

        let table = assign_channels(&out, &ChannelSelectParams::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains_key(&1));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let out = output_with_coverage(&[[true; 3]]);
        let params = ChannelSelectParams {
            energy_weight: 1.5,
            ..Default::default()
        };
        assert!(assign_channels(&out, &params).is_err());
    }

    #[test]
    fn test_neighbors_share_best_channel() {
        let mut table = BTreeMap::new();
        for (id, best) in [(1, 5), (2, 5), (3, 7)] {
            table.insert(
                id,
                ChannelSelection {
                    best_local: 0,
                    worst_local: 1,
                    best_channel: best,
                    worst_channel: 0,
                },
            );
        }
        assert_eq!(neighbors_on_best_channel(&table, 1), vec![2]);
        assert_eq!(neighbors_on_best_channel(&table, 3), Vec::<i32>::new());
    }

    #[test]
    fn test_quality_untouched_by_selection() {
        let mut out = output_with_coverage(&[[true; 3]]);
        out.quality.insert(1, QualityLabel::Good);
        let table = assign_channels(&out, &ChannelSelectParams::default()).unwrap();
        assert!(table.contains_key(&1));
        assert_eq!(out.quality_of(1), Some(QualityLabel::Good));
    }
}
