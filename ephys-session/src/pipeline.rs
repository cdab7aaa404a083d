//! Session pipeline orchestration.
//!
//! Stages per session: validate sorter output, select channels, split and
//! reproject the spike stream, then per recording write the spike-stream
//! container, score isolation, append the isolated subset, and build
//! rasters. Once every recording's artifacts exist, the stitcher runs
//! across recordings.
//!
//! Failure isolation follows the recording/cluster granularity: a failed
//! recording is logged and skipped, a failed cluster raster is logged and
//! skipped, and only session-level problems (invalid sorter output,
//! missing geometry, scope contract violations) abort the run.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::store::{SessionAttributes, SessionStore};
use ndarray::{Array3, Axis};
use probe_timebase::{reproject_group, RecordingGroup, RecordingSpikes};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use session_stitch::{
    rate_curve, ClusterEntry, ClusterScope, ProbeGeometry, RecordingCatalog,
    StitchContext, StitchTable,
};
use sorter_units::{
    assign_channels, neighbors_on_best_channel, ChannelSelection, SorterOutput,
};
use std::collections::{BTreeMap, HashMap};
use trial_rasters::{build_cluster_raster, TrialStore};
use unit_isolation::{isolated_subset, score_recording, IsolationRecord};

/// Everything the pipeline needs to process one session.
#[derive(Debug, Clone)]
pub struct SessionInputs {
    /// Side-channel attributes for the stitch table
    pub attributes: SessionAttributes,
    /// Sorter output over the session's concatenated spike stream
    pub sorter: SorterOutput,
    /// Ordered recording group the stream splits into
    pub group: RecordingGroup,
    /// Behavioral trial log
    pub trials: TrialStore,
    /// Probe geometry
    pub geometry: ProbeGeometry,
}

/// Per-recording processing summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSummary {
    /// Recording id
    pub recording_id: String,
    /// Whether behavioral alignment was available
    pub aligned: bool,
    /// Spikes assigned to this recording
    pub n_spikes: usize,
    /// Clusters scored
    pub n_clusters: usize,
    /// Cluster rasters skipped on error
    pub n_raster_failures: usize,
}

/// Whole-session summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Group identity (member recording ids joined)
    pub session_id: String,
    /// Summaries of processed recordings
    pub recordings: Vec<RecordingSummary>,
    /// Ids of recordings skipped on error
    pub skipped: Vec<String>,
    /// Stitch-table row count, when stitching ran
    pub stitch_rows: Option<usize>,
}

/// The session pipeline: configuration plus the artifact store.
pub struct Pipeline {
    config: PipelineConfig,
    store: SessionStore,
}

impl Pipeline {
    /// Build a pipeline with a validated configuration.
    pub fn new(config: PipelineConfig, store: SessionStore) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, store })
    }

    /// Run every stage over one session.
    pub fn run(&self, inputs: &SessionInputs) -> Result<SessionSummary> {
        inputs.sorter.validate()?;
        let channels = assign_channels(&inputs.sorter, &self.config.channel_params())?;
        log::info!(
            "session {}: {} clusters, {} spikes",
            inputs.group.id(),
            channels.len(),
            inputs.sorter.n_spikes()
        );

        let partitions = reproject_group(&inputs.sorter.spike_times, &inputs.group)?;

        let mut recordings = Vec::new();
        let mut skipped = Vec::new();
        for partition in &partitions {
            match self.process_recording(inputs, &channels, partition) {
                Ok(summary) => recordings.push(summary),
                Err(e) => {
                    log::error!("recording {} failed: {}", partition.recording_id, e);
                    skipped.push(partition.recording_id.clone());
                }
            }
        }

        // All per-recording artifacts are on disk before stitching starts
        let stitch_rows = if inputs.group.recordings.len() >= 2 {
            match self.stitch(inputs) {
                Ok(table) => Some(table.rows.len()),
                Err(e) => {
                    log::error!("stitching failed: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(SessionSummary {
            session_id: inputs.group.id(),
            recordings,
            skipped,
            stitch_rows,
        })
    }

    fn process_recording(
        &self,
        inputs: &SessionInputs,
        channels: &BTreeMap<i32, ChannelSelection>,
        partition: &RecordingSpikes,
    ) -> Result<RecordingSummary> {
        let recording_id = &partition.recording_id;
        let sorter = &inputs.sorter;

        // Spike-stream container: the partition's slice of the per-spike arrays
        let spike_clusters: Vec<i32> = partition
            .indices
            .iter()
            .map(|&raw| sorter.spike_clusters[raw])
            .collect();
        let amps: Vec<f32> = partition
            .indices
            .iter()
            .map(|&raw| sorter.scaling_amps[raw])
            .collect();
        let pc_shape = sorter.pc_features.shape();
        let mut pc_feat = Array3::zeros((partition.indices.len(), pc_shape[1], pc_shape[2]));
        for (row, &raw) in partition.indices.iter().enumerate() {
            pc_feat
                .index_axis_mut(Axis(0), row)
                .assign(&sorter.pc_features.index_axis(Axis(0), raw));
        }
        self.store.write_spike_stream(
            recording_id,
            partition.aligned,
            partition.times_s.clone(),
            &spike_clusters,
            sorter,
            channels,
            pc_feat,
            amps,
        )?;

        // Isolation: compute, then write any cluster whose artifact is
        // not already on disk (restartability)
        let records =
            score_recording(sorter, channels, partition, &self.config.isolation_params())?;
        for record in &records {
            if self.store.has_isolation(recording_id, record.cluster) {
                log::debug!(
                    "recording {}: isolation artifact for cluster {} exists, skipping",
                    recording_id,
                    record.cluster
                );
                continue;
            }
            self.store.write_isolation(recording_id, record)?;
        }

        // Selection reads the on-disk records so curated verdicts survive
        // a re-run
        let disk_records: Vec<IsolationRecord> = records
            .iter()
            .map(|r| self.store.read_isolation(recording_id, r.cluster))
            .collect::<Result<_>>()?;
        let subset = isolated_subset(sorter, channels, partition, &disk_records);
        self.store.append_isolated(recording_id, &subset)?;

        // Rasters, one artifact per cluster, in parallel
        let mut times_by_cluster: HashMap<i32, Vec<f64>> = HashMap::new();
        for (&raw, &t) in partition.indices.iter().zip(&partition.times_s) {
            times_by_cluster
                .entry(sorter.spike_clusters[raw])
                .or_default()
                .push(t);
        }
        let raster_params = self.config.raster_params();
        let empty: Vec<f64> = Vec::new();

        let results: Vec<(i32, Result<()>)> = channels
            .par_iter()
            .map(|(&cluster, _)| {
                if self.store.has_raster(recording_id, cluster) {
                    return (cluster, Ok(()));
                }
                let times = times_by_cluster.get(&cluster).unwrap_or(&empty);
                let neighbor_times: Vec<(i32, Vec<f64>)> =
                    neighbors_on_best_channel(channels, cluster)
                        .into_iter()
                        .map(|n| (n, times_by_cluster.get(&n).cloned().unwrap_or_default()))
                        .collect();
                let raster = build_cluster_raster(
                    cluster,
                    times,
                    &neighbor_times,
                    &inputs.trials,
                    recording_id,
                    &raster_params,
                );
                (cluster, self.store.write_raster(recording_id, &raster))
            })
            .collect();

        let mut n_raster_failures = 0;
        for (cluster, result) in results {
            if let Err(e) = result {
                log::warn!(
                    "recording {}: raster for cluster {} failed, skipping: {}",
                    recording_id,
                    cluster,
                    e
                );
                n_raster_failures += 1;
            }
        }

        Ok(RecordingSummary {
            recording_id: recording_id.clone(),
            aligned: partition.aligned,
            n_spikes: partition.len(),
            n_clusters: records.len(),
            n_raster_failures,
        })
    }

    /// Stitch clusters across the session's recordings from the artifacts
    /// on disk, and persist the table.
    pub fn stitch(&self, inputs: &SessionInputs) -> Result<StitchTable> {
        let channels = assign_channels(&inputs.sorter, &self.config.channel_params())?;
        let rate_params = self.config.rate_params();
        let stitch_params = self.config.stitch_params();
        let wf_len = inputs.sorter.templates.shape()[1];
        let rate_len = rate_params.n_bins();

        let mut catalogs = Vec::new();
        for recording in &inputs.group.recordings {
            let mut entries = Vec::new();
            let mut isolated = Vec::new();
            for (&cluster, selection) in &channels {
                let entry = match self.cluster_entry(
                    &recording.id,
                    cluster,
                    selection,
                    &rate_params,
                ) {
                    Ok((entry, is_isolated)) => {
                        if is_isolated {
                            isolated.push(cluster);
                        }
                        entry
                    }
                    Err(e) => {
                        log::warn!(
                            "recording {}: features for cluster {} unavailable ({}), \
                             using NaN placeholders",
                            recording.id,
                            cluster,
                            e
                        );
                        ClusterEntry::missing(cluster, selection.best_channel, wf_len, rate_len)
                    }
                };
                entries.push(entry);
            }

            let mut catalog = RecordingCatalog {
                recording_id: recording.id.clone(),
                clusters: entries,
            };
            match stitch_params.scope {
                ClusterScope::All => {}
                ClusterScope::Good => {
                    let good: Vec<i32> = inputs
                        .sorter
                        .quality
                        .iter()
                        .filter(|(_, q)| q.is_good())
                        .map(|(&id, _)| id)
                        .collect();
                    catalog.retain_clusters(&good)?;
                }
                ClusterScope::Isolated => {
                    catalog.retain_clusters(&isolated)?;
                }
            }
            catalogs.push(catalog);
        }

        let ctx = StitchContext::new(catalogs, inputs.geometry.clone(), stitch_params)?;
        let table = ctx.stitch()?;
        self.store.write_stitch_table(&inputs.attributes, &table)?;
        Ok(table)
    }

    fn cluster_entry(
        &self,
        recording_id: &str,
        cluster: i32,
        selection: &ChannelSelection,
        rate_params: &session_stitch::RateParams,
    ) -> Result<(ClusterEntry, bool)> {
        let isolation = self.store.read_isolation(recording_id, cluster)?;
        let raster = self.store.read_raster(recording_id, cluster)?;
        let rate = rate_curve(&raster, rate_params)?;
        let waveform = nalgebra::DVector::from_iterator(
            isolation.waveform_best.len(),
            isolation.waveform_best.iter().map(|&w| w as f64),
        );
        let entry = ClusterEntry {
            cluster,
            best_channel: selection.best_channel,
            waveform,
            rate_curve: rate,
        };
        Ok((entry, isolation.is_isolated()))
    }
}
