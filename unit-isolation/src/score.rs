//! Windowed isolation scoring.
//!
//! For every cluster, its drift-corrected spike times are sliced into
//! fixed-length windows. In each window the cluster's amp-scaled PC
//! projections on its best channel (signal) are compared against its
//! projections on its worst channel (noise): the score is the first-PC
//! separation in units of noise standard deviation.

use crate::error::{IsolationError, Result};
use crate::frame::{
    IsolationFrame, IsolationRecord, NeighborInfo, NeighborPcSnapshot, Verdict,
};
use probe_timebase::RecordingSpikes;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sorter_units::{ChannelSelection, SorterOutput};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashMap};

/// Parameters for isolation scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationParams {
    /// Window length in behavioral seconds
    pub window_sec: f64,
}

impl Default for IsolationParams {
    fn default() -> Self {
        Self { window_sec: 100.0 }
    }
}

impl IsolationParams {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.window_sec > 0.0) || !self.window_sec.is_finite() {
            return Err(IsolationError::InvalidParameter {
                parameter: "window_sec".to_string(),
                value: self.window_sec,
                reason: "must be positive and finite".to_string(),
            });
        }
        Ok(())
    }
}

/// Spikes of one cluster within a recording partition: raw-stream index
/// plus behavioral time, in stream order.
type ClusterSpikes = Vec<(usize, f64)>;

fn spikes_by_cluster(out: &SorterOutput, partition: &RecordingSpikes) -> HashMap<i32, ClusterSpikes> {
    let mut by_cluster: HashMap<i32, ClusterSpikes> = HashMap::new();
    for (&raw, &t) in partition.indices.iter().zip(&partition.times_s) {
        let cluster = out.spike_clusters[raw];
        by_cluster.entry(cluster).or_default().push((raw, t));
    }
    by_cluster
}

/// Local PC column of `channel` within the cluster's local-channel table,
/// if the cluster projects onto that channel at all.
fn local_column_of(out: &SorterOutput, cluster: i32, channel: i32) -> Option<usize> {
    let template = out.primary_template_of(cluster)?;
    out.local_channels_of_template(template)
        .iter()
        .position(|&c| c == channel)
}

/// Score every cluster of one recording partition.
///
/// Clusters absent from the channel table (zero-spike clusters) are
/// skipped. Scoring is independent per cluster and runs in parallel.
pub fn score_recording(
    out: &SorterOutput,
    channels: &BTreeMap<i32, ChannelSelection>,
    partition: &RecordingSpikes,
    params: &IsolationParams,
) -> Result<Vec<IsolationRecord>> {
    params.validate()?;
    if partition.indices.len() != partition.times_s.len() {
        return Err(IsolationError::PartitionMismatch {
            indices: partition.indices.len(),
            times: partition.times_s.len(),
        });
    }

    let by_cluster = spikes_by_cluster(out, partition);
    let empty: ClusterSpikes = Vec::new();
    log::debug!(
        "scoring {} clusters over {} spikes in recording {}",
        channels.len(),
        partition.len(),
        partition.recording_id
    );

    channels
        .par_iter()
        .map(|(&cluster, selection)| {
            let spikes = by_cluster.get(&cluster).unwrap_or(&empty);
            score_cluster(out, channels, cluster, selection, spikes, &by_cluster, params)
        })
        .collect()
}

/// Score a single cluster against its best/worst channels.
fn score_cluster(
    out: &SorterOutput,
    channels: &BTreeMap<i32, ChannelSelection>,
    cluster: i32,
    selection: &ChannelSelection,
    spikes: &ClusterSpikes,
    by_cluster: &HashMap<i32, ClusterSpikes>,
    params: &IsolationParams,
) -> Result<IsolationRecord> {
    let template = out
        .primary_template_of(cluster)
        .ok_or(IsolationError::MissingChannels { cluster })?;

    let neighbors: Vec<NeighborInfo> = channels
        .iter()
        .filter(|(&id, sel)| id != cluster && sel.best_channel == selection.best_channel)
        .map(|(&id, _)| NeighborInfo {
            cluster: id,
            good: out.quality_of(id).map_or(false, |q| q.is_good()),
        })
        .collect();

    let mut record = IsolationRecord {
        cluster,
        best_channel: selection.best_channel,
        worst_channel: selection.worst_channel,
        waveform_best: out.template_on_channel(template, selection.best_channel),
        waveform_worst: out.template_on_channel(template, selection.worst_channel),
        neighbors: neighbors.clone(),
        window_sec: params.window_sec,
        frames: Vec::new(),
    };

    if spikes.is_empty() {
        record.frames.push(IsolationFrame::empty(0, 0.0));
        return Ok(record);
    }

    let n_components = out.pc_features.shape()[1];
    let delta = params.window_sec;
    let max_t = spikes
        .iter()
        .map(|&(_, t)| t)
        .fold(f64::NEG_INFINITY, f64::max);
    let n_windows = ((max_t / delta).ceil() as usize).max(1);

    // Neighbor columns on the shared best channel, resolved once
    let neighbor_columns: Vec<(i32, Option<usize>)> = neighbors
        .iter()
        .map(|n| (n.cluster, local_column_of(out, n.cluster, selection.best_channel)))
        .collect();

    for w in 0..n_windows {
        let start = w as f64 * delta;
        let end = start + delta;
        // Window bounds are inclusive on both ends
        let in_window: Vec<&(usize, f64)> = spikes
            .iter()
            .filter(|&&(_, t)| t >= start && t <= end)
            .collect();

        if in_window.is_empty() {
            record.frames.push(IsolationFrame::empty(w, start));
            continue;
        }

        let project = |local: usize, component: usize| -> Vec<f64> {
            in_window
                .iter()
                .map(|&&(raw, _)| {
                    out.scaling_amps[raw] as f64
                        * out.pc_features[[raw, component, local]] as f64
                })
                .collect()
        };

        let mut signal_mean = Vec::with_capacity(n_components);
        let mut noise_mean = Vec::with_capacity(n_components);
        let mut noise_std = Vec::with_capacity(n_components);
        for k in 0..n_components {
            let signal = project(selection.best_local, k);
            let noise = project(selection.worst_local, k);
            signal_mean.push(Statistics::mean(&signal));
            noise_mean.push(Statistics::mean(&noise));
            noise_std.push(Statistics::std_dev(&noise));
        }

        // First-PC separation over noise spread; zero variance gives NaN
        let score = if noise_std[0] > 0.0 {
            (signal_mean[0] - noise_mean[0]).abs() / noise_std[0]
        } else {
            f64::NAN
        };

        let neighbor_pc: Vec<NeighborPcSnapshot> = neighbor_columns
            .iter()
            .map(|&(neighbor, column)| {
                let first_pc = match column {
                    Some(col) => by_cluster
                        .get(&neighbor)
                        .map(|nspikes| {
                            nspikes
                                .iter()
                                .filter(|&&(_, t)| t >= start && t <= end)
                                .map(|&(raw, _)| {
                                    out.scaling_amps[raw] as f64
                                        * out.pc_features[[raw, 0, col]] as f64
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                    None => Vec::new(),
                };
                NeighborPcSnapshot {
                    cluster: neighbor,
                    first_pc,
                }
            })
            .collect();

        record.frames.push(IsolationFrame {
            window_index: w,
            start_s: start,
            n_spikes: in_window.len(),
            score: Some(score),
            signal_mean,
            noise_mean,
            noise_std,
            verdict: Verdict::NotIsolated,
            neighbor_pc,
        });
    }

    Ok(record)
}
