//! Cross-recording cluster stitching.
//!
//! Two clusters in different recordings are the same neuron when they sit
//! on nearby electrodes and both their template waveforms and their
//! peri-event rate curves correlate above threshold. Matching runs per
//! candidate channel; the resulting candidate rows are deduplicated,
//! made disjoint, and filtered by a minimum appearance count.

use crate::corr::{nan_to_neg_inf, pearson};
use crate::error::{Result, StitchError};
use crate::geometry::ProbeGeometry;
use itertools::Itertools;
use nalgebra::DVector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which clusters participate in stitching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterScope {
    /// Every cluster with spikes
    All,
    /// Clusters labeled `good` by curation
    Good,
    /// Clusters selected as isolated
    Isolated,
}

/// Parameters for the stitcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchParams {
    /// Minimum Pearson correlation between rate curves
    pub fr_corr_threshold: f64,
    /// Minimum Pearson correlation between waveforms
    pub wf_corr_threshold: f64,
    /// Minimum number of recordings a neuron must appear in
    pub min_recordings: usize,
    /// Electrode neighborhood radius
    pub channel_range: i32,
    /// Cluster scope the catalogs were built with
    pub scope: ClusterScope,
}

impl Default for StitchParams {
    fn default() -> Self {
        Self {
            fr_corr_threshold: 0.85,
            wf_corr_threshold: 0.85,
            min_recordings: 2,
            channel_range: 2,
            scope: ClusterScope::All,
        }
    }
}

impl StitchParams {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("fr_corr_threshold", self.fr_corr_threshold),
            ("wf_corr_threshold", self.wf_corr_threshold),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(StitchError::InvalidParameter {
                    parameter: name.to_string(),
                    value,
                    reason: "must be in [-1, 1]".to_string(),
                });
            }
        }
        if self.min_recordings == 0 {
            return Err(StitchError::InvalidParameter {
                parameter: "min_recordings".to_string(),
                value: 0.0,
                reason: "must be at least 1".to_string(),
            });
        }
        if self.channel_range < 0 {
            return Err(StitchError::InvalidParameter {
                parameter: "channel_range".to_string(),
                value: self.channel_range as f64,
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

/// One in-scope cluster's stitching features.
#[derive(Debug, Clone)]
pub struct ClusterEntry {
    /// Cluster id
    pub cluster: i32,
    /// Best channel, global
    pub best_channel: i32,
    /// Template waveform on the best channel
    pub waveform: DVector<f64>,
    /// Peri-event rate curve
    pub rate_curve: DVector<f64>,
}

impl ClusterEntry {
    /// An entry whose feature files were missing: NaN vectors, so it can
    /// never win a correlation argmax.
    pub fn missing(cluster: i32, best_channel: i32, wf_len: usize, rate_len: usize) -> Self {
        Self {
            cluster,
            best_channel,
            waveform: DVector::from_element(wf_len, f64::NAN),
            rate_curve: DVector::from_element(rate_len, f64::NAN),
        }
    }
}

/// One recording's in-scope cluster entries.
#[derive(Debug, Clone)]
pub struct RecordingCatalog {
    /// Recording id
    pub recording_id: String,
    /// In-scope clusters
    pub clusters: Vec<ClusterEntry>,
}

impl RecordingCatalog {
    /// Restrict the catalog to the given cluster ids.
    ///
    /// An id that is not in the catalog is a contract violation and
    /// aborts the session.
    pub fn retain_clusters(&mut self, ids: &[i32]) -> Result<()> {
        for &id in ids {
            if !self.clusters.iter().any(|e| e.cluster == id) {
                return Err(StitchError::UnknownCluster {
                    recording: self.recording_id.clone(),
                    cluster: id,
                });
            }
        }
        self.clusters.retain(|e| ids.contains(&e.cluster));
        Ok(())
    }
}

/// One tracked neuron: its cluster id in each recording, or `None` where
/// it was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StitchRow {
    /// Per-recording slot, in session recording order
    pub slots: Vec<Option<i32>>,
}

impl StitchRow {
    /// Number of recordings the neuron was found in.
    pub fn n_found(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Equality key with not-found slots mapped to 0.
    fn key(&self) -> Vec<i32> {
        self.slots.iter().map(|s| s.unwrap_or(0)).collect()
    }
}

/// The session's stitch table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchTable {
    /// Recording ids, defining slot order
    pub recordings: Vec<String>,
    /// One row per tracked neuron
    pub rows: Vec<StitchRow>,
}

/// Stitching state: the per-recording catalogs, the probe geometry, and
/// the thresholds, all passed explicitly.
#[derive(Debug, Clone)]
pub struct StitchContext {
    catalogs: Vec<RecordingCatalog>,
    geometry: ProbeGeometry,
    params: StitchParams,
}

impl StitchContext {
    /// Build a context over at least two recordings.
    pub fn new(
        catalogs: Vec<RecordingCatalog>,
        geometry: ProbeGeometry,
        params: StitchParams,
    ) -> Result<Self> {
        params.validate()?;
        if catalogs.len() < 2 {
            return Err(StitchError::TooFewRecordings {
                count: catalogs.len(),
            });
        }
        Ok(Self {
            catalogs,
            geometry,
            params,
        })
    }

    /// Run the stitcher and produce the session's stitch table.
    pub fn stitch(&self) -> Result<StitchTable> {
        let channels = self.candidate_channels();
        log::info!(
            "stitching {} recordings over {} candidate channels",
            self.catalogs.len(),
            channels.len()
        );

        let per_channel: Vec<Vec<StitchRow>> = channels
            .par_iter()
            .map(|&c| self.candidate_rows_for_channel(c))
            .collect::<Result<_>>()?;
        let candidates: Vec<StitchRow> = per_channel.into_iter().flatten().collect();

        let rows = dedup_and_filter(candidates, self.params.min_recordings);
        log::info!("stitch table has {} rows", rows.len());

        Ok(StitchTable {
            recordings: self
                .catalogs
                .iter()
                .map(|c| c.recording_id.clone())
                .collect(),
            rows,
        })
    }

    /// Union of best channels over all in-scope clusters, sorted.
    fn candidate_channels(&self) -> Vec<i32> {
        self.catalogs
            .iter()
            .flat_map(|cat| cat.clusters.iter().map(|e| e.best_channel))
            .unique()
            .sorted()
            .collect()
    }

    /// Candidate rows seeded by every cluster whose best channel is `c`.
    fn candidate_rows_for_channel(&self, c: i32) -> Result<Vec<StitchRow>> {
        let neighborhood = self.geometry.neighborhood(c, self.params.channel_range)?;
        let n_recs = self.catalogs.len();

        // Per recording, the clusters whose best channel lies in the
        // neighborhood of c
        let nearby: Vec<Vec<&ClusterEntry>> = self
            .catalogs
            .iter()
            .map(|cat| {
                cat.clusters
                    .iter()
                    .filter(|e| neighborhood.contains(&e.best_channel))
                    .collect()
            })
            .collect();

        let mut rows = Vec::new();
        for (r, cat) in self.catalogs.iter().enumerate() {
            for seed in cat.clusters.iter().filter(|e| e.best_channel == c) {
                let mut slots = vec![None; n_recs];
                slots[r] = Some(seed.cluster);
                for (r_other, candidates) in nearby.iter().enumerate() {
                    if r_other == r {
                        continue;
                    }
                    slots[r_other] = self.best_match(seed, candidates);
                }
                rows.push(StitchRow { slots });
            }
        }
        Ok(rows)
    }

    /// The candidate with the highest rate correlation against the seed,
    /// accepted only when both correlations clear their thresholds.
    fn best_match(&self, seed: &ClusterEntry, candidates: &[&ClusterEntry]) -> Option<i32> {
        let best = candidates
            .iter()
            .map(|e| (e, nan_to_neg_inf(pearson(&seed.rate_curve, &e.rate_curve))))
            .max_by(|(_, a), (_, b)| a.total_cmp(b))?;

        let (entry, fr_corr) = best;
        if fr_corr < self.params.fr_corr_threshold {
            return None;
        }
        let wf_corr = pearson(&seed.waveform, &entry.waveform);
        if !(wf_corr >= self.params.wf_corr_threshold) {
            return None;
        }
        Some(entry.cluster)
    }
}

/// Deduplicate candidate rows, make them disjoint, and drop rows found in
/// too few recordings.
///
/// Rows are equivalent when element-wise equal after mapping not-found to
/// 0; the first occurrence wins. A later row that reuses any
/// (recording, cluster) slot already claimed by an earlier row is
/// dropped, so no cluster appears in two rows.
fn dedup_and_filter(candidates: Vec<StitchRow>, min_recordings: usize) -> Vec<StitchRow> {
    let mut seen: HashSet<Vec<i32>> = HashSet::new();
    let mut claimed: HashSet<(usize, i32)> = HashSet::new();
    let mut rows = Vec::new();

    for row in candidates {
        if !seen.insert(row.key()) {
            continue;
        }
        if row.n_found() < min_recordings {
            continue;
        }
        let slots: Vec<(usize, i32)> = row
            .slots
            .iter()
            .enumerate()
            .filter_map(|(r, s)| s.map(|id| (r, id)))
            .collect();
        if slots.iter().any(|slot| claimed.contains(slot)) {
            continue;
        }
        claimed.extend(slots);
        rows.push(row);
    }

    rows
}
