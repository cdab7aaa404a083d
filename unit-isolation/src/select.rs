//! Isolated-unit selection.
//!
//! Curation flips the frame-0 verdict of clusters it accepts; selection
//! restricts the reprojected spike stream and the cluster-to-channel
//! table to those clusters.

use crate::frame::IsolationRecord;
use probe_timebase::RecordingSpikes;
use serde::{Deserialize, Serialize};
use sorter_units::{ChannelSelection, SorterOutput};
use std::collections::BTreeMap;

/// The isolated restriction of one recording's spike stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IsolatedSubset {
    /// Behavioral-clock spike times of isolated clusters, stream order
    pub spike_times: Vec<f64>,
    /// Matching cluster ids
    pub cluster_ids: Vec<i32>,
    /// Channel rows restricted to isolated clusters
    pub clusters: BTreeMap<i32, ChannelSelection>,
}

/// Cluster ids whose frame-0 verdict is `Isolated`.
pub fn isolated_clusters(records: &[IsolationRecord]) -> Vec<i32> {
    records
        .iter()
        .filter(|r| r.is_isolated())
        .map(|r| r.cluster)
        .collect()
}

/// Restrict a reprojected partition to isolated clusters.
pub fn isolated_subset(
    out: &SorterOutput,
    channels: &BTreeMap<i32, ChannelSelection>,
    partition: &RecordingSpikes,
    records: &[IsolationRecord],
) -> IsolatedSubset {
    let isolated = isolated_clusters(records);

    let mut subset = IsolatedSubset::default();
    for (&raw, &t) in partition.indices.iter().zip(&partition.times_s) {
        let cluster = out.spike_clusters[raw];
        if isolated.contains(&cluster) {
            subset.spike_times.push(t);
            subset.cluster_ids.push(cluster);
        }
    }
    for &cluster in &isolated {
        if let Some(&selection) = channels.get(&cluster) {
            subset.clusters.insert(cluster, selection);
        }
    }
    subset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{IsolationFrame, Verdict};
    use ndarray::{Array2, Array3};

    fn record(cluster: i32, isolated: bool) -> IsolationRecord {
        let mut frame = IsolationFrame::empty(0, 0.0);
        if isolated {
            frame.verdict = Verdict::Isolated;
        }
        IsolationRecord {
            cluster,
            best_channel: 0,
            worst_channel: 1,
            waveform_best: Vec::new(),
            waveform_worst: Vec::new(),
            neighbors: Vec::new(),
            window_sec: 100.0,
            frames: vec![frame],
        }
    }

    fn two_cluster_output() -> SorterOutput {
        SorterOutput {
            spike_times: vec![100, 200, 300, 400],
            spike_clusters: vec![1, 2, 1, 2],
            spike_templates: vec![0, 0, 0, 0],
            templates: Array3::zeros((1, 2, 2)),
            pc_features: Array3::zeros((4, 3, 2)),
            pc_feature_ind: Array2::zeros((1, 2)),
            scaling_amps: vec![1.0; 4],
            channel_map: vec![0, 1],
            quality: BTreeMap::new(),
        }
    }

    #[test]
    fn test_isolated_clusters_by_frame_zero() {
        let records = vec![record(1, true), record(2, false), record(3, true)];
        assert_eq!(isolated_clusters(&records), vec![1, 3]);
    }

    #[test]
    fn test_subset_restricts_stream_and_table() {
        let out = two_cluster_output();
        let mut channels = BTreeMap::new();
        for id in [1, 2] {
            channels.insert(
                id,
                ChannelSelection {
                    best_local: 0,
                    worst_local: 1,
                    best_channel: 0,
                    worst_channel: 1,
                },
            );
        }
        let partition = RecordingSpikes {
            recording_id: "r".to_string(),
            aligned: true,
            indices: vec![0, 1, 2, 3],
            times_s: vec![0.1, 0.2, 0.3, 0.4],
        };
        let records = vec![record(1, true), record(2, false)];

        let subset = isolated_subset(&out, &channels, &partition, &records);
        assert_eq!(subset.cluster_ids, vec![1, 1]);
        assert_eq!(subset.spike_times, vec![0.1, 0.3]);
        assert_eq!(subset.clusters.len(), 1);
        assert!(subset.clusters.contains_key(&1));
    }

    #[test]
    fn test_no_isolated_clusters_empty_subset() {
        let out = two_cluster_output();
        let channels = BTreeMap::new();
        let partition = RecordingSpikes {
            recording_id: "r".to_string(),
            aligned: true,
            indices: vec![0, 1],
            times_s: vec![0.1, 0.2],
        };
        let records = vec![record(1, false)];

        let subset = isolated_subset(&out, &channels, &partition, &records);
        assert!(subset.spike_times.is_empty());
        assert!(subset.clusters.is_empty());
    }
}
