//! In-memory model of one recording's spike-sorter output.
//!
//! The sorter emits parallel per-spike arrays (probe-sample times, cluster
//! and template assignments, PC features, template scaling amplitudes)
//! plus per-template arrays (template waveforms, local-channel index
//! table) and the probe channel map. All of it is read-only once loaded;
//! the pipeline only derives from it.

use crate::error::{Result, UnitsError};
use crate::quality::QualityLabel;
use ndarray::{Array2, Array3, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One recording's complete sorter output.
///
/// Per-spike arrays (`spike_times`, `spike_clusters`, `spike_templates`,
/// `pc_features`, `scaling_amps`) share the spike axis and keep the
/// sorter's original ordering. Channel identifiers are 0-indexed
/// acquisition channels throughout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SorterOutput {
    /// Spike times in probe-clock samples
    pub spike_times: Vec<i64>,
    /// Per-spike cluster assignment
    pub spike_clusters: Vec<i32>,
    /// Per-spike template assignment
    pub spike_templates: Vec<i32>,
    /// Template waveforms, shape (n_templates, n_samples, n_channels)
    pub templates: Array3<f32>,
    /// Per-spike PC features, shape (n_spikes, n_components, n_local_channels)
    pub pc_features: Array3<f32>,
    /// Global channel of each local PC column, shape (n_templates, n_local_channels)
    pub pc_feature_ind: Array2<i32>,
    /// Per-spike template scaling amplitude
    pub scaling_amps: Vec<f32>,
    /// Acquisition channel map (0-indexed)
    pub channel_map: Vec<i32>,
    /// Curation quality labels keyed by cluster id
    pub quality: BTreeMap<i32, QualityLabel>,
}

impl SorterOutput {
    /// Number of spikes in this recording.
    pub fn n_spikes(&self) -> usize {
        self.spike_times.len()
    }

    /// Number of templates the sorter fitted.
    pub fn n_templates(&self) -> usize {
        self.templates.shape()[0]
    }

    /// Number of local PC channels per template.
    pub fn n_local_channels(&self) -> usize {
        self.pc_feature_ind.shape()[1]
    }

    /// Check the shared-axis and index-range invariants.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_spikes();
        for (field, len) in [
            ("spike_clusters", self.spike_clusters.len()),
            ("spike_templates", self.spike_templates.len()),
            ("scaling_amps", self.scaling_amps.len()),
            ("pc_features", self.pc_features.shape()[0]),
        ] {
            if len != n {
                return Err(UnitsError::LengthMismatch {
                    field: field.to_string(),
                    expected: n,
                    actual: len,
                });
            }
        }

        if self.pc_feature_ind.shape()[0] != self.n_templates() {
            return Err(UnitsError::LengthMismatch {
                field: "pc_feature_ind".to_string(),
                expected: self.n_templates(),
                actual: self.pc_feature_ind.shape()[0],
            });
        }

        if self.pc_features.shape()[2] != self.n_local_channels() {
            return Err(UnitsError::LengthMismatch {
                field: "pc_features local channels".to_string(),
                expected: self.n_local_channels(),
                actual: self.pc_features.shape()[2],
            });
        }

        for &t in &self.spike_templates {
            if t < 0 || t as usize >= self.n_templates() {
                return Err(UnitsError::TemplateOutOfRange {
                    template: t,
                    n_templates: self.n_templates(),
                });
            }
        }

        Ok(())
    }

    /// Sorted unique cluster ids present in the spike stream.
    pub fn cluster_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.spike_clusters.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Spike indices belonging to `cluster`, in stream order.
    pub fn spike_indices_of(&self, cluster: i32) -> Vec<usize> {
        self.spike_clusters
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    /// Most frequent template among the cluster's spikes.
    ///
    /// Returns `None` for a cluster with no spikes.
    pub fn primary_template_of(&self, cluster: i32) -> Option<usize> {
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for (&c, &t) in self.spike_clusters.iter().zip(&self.spike_templates) {
            if c == cluster {
                *counts.entry(t).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .max_by_key(|&(_, count)| count)
            .map(|(t, _)| t as usize)
    }

    /// Global channels of the template's local PC columns.
    pub fn local_channels_of_template(&self, template: usize) -> Vec<i32> {
        self.pc_feature_ind.row(template).to_vec()
    }

    /// Template waveform restricted to its local PC channels,
    /// shape (n_samples, n_local_channels).
    pub fn template_on_local_channels(&self, template: usize) -> Array2<f32> {
        let n_samples = self.templates.shape()[1];
        let locals = self.local_channels_of_template(template);
        let mut out = Array2::zeros((n_samples, locals.len()));
        for (l, &ch) in locals.iter().enumerate() {
            if ch < 0 || ch as usize >= self.templates.shape()[2] {
                continue;
            }
            for t in 0..n_samples {
                out[[t, l]] = self.templates[[template, t, ch as usize]];
            }
        }
        out
    }

    /// Template waveform on a single global channel, over the template window.
    pub fn template_on_channel(&self, template: usize, channel: i32) -> Vec<f32> {
        let n_samples = self.templates.shape()[1];
        if channel < 0 || channel as usize >= self.templates.shape()[2] {
            return vec![f32::NAN; n_samples];
        }
        (0..n_samples)
            .map(|t| self.templates[[template, t, channel as usize]])
            .collect()
    }

    /// PC feature rows of the given spikes, shape view per spike.
    pub fn pc_of_spike(&self, spike: usize) -> ArrayView2<'_, f32> {
        self.pc_features.index_axis(ndarray::Axis(0), spike)
    }

    /// Quality label of a cluster, if the curation table has one.
    pub fn quality_of(&self, cluster: i32) -> Option<QualityLabel> {
        self.quality.get(&cluster).copied()
    }

    /// Summary counts over the catalog.
    pub fn catalog_stats(&self) -> CatalogStats {
        let clusters = self.cluster_ids();
        let mut stats = CatalogStats {
            n_clusters: clusters.len(),
            n_spikes: self.n_spikes(),
            ..CatalogStats::default()
        };
        for cluster in clusters {
            match self.quality_of(cluster) {
                Some(QualityLabel::Good) => stats.n_good += 1,
                Some(QualityLabel::Mua) => stats.n_mua += 1,
                Some(QualityLabel::Noise) => stats.n_noise += 1,
                Some(QualityLabel::Unsorted) | None => stats.n_unsorted += 1,
            }
        }
        stats
    }
}

/// Per-recording catalog summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogStats {
    pub n_clusters: usize,
    pub n_spikes: usize,
    pub n_good: usize,
    pub n_mua: usize,
    pub n_noise: usize,
    pub n_unsorted: usize,
}
