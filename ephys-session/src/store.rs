//! Persisted session state.
//!
//! Layout under the session output root:
//!
//! ```text
//! <root>/
//!   <recording_id>/
//!     spike_stream.bin              per-recording spike stream container
//!     isolation/cluster_<id>.bin    one isolation record per cluster
//!     rasters/cluster_<id>.bin      one raster record per cluster
//!   stitch_table.json               per-session stitch table
//! ```
//!
//! Bulk containers are bincode; the stitch table is JSON. Persisted
//! cluster ids are 1-indexed and channels 0-indexed for compatibility
//! with the legacy consumers of these files; everything in memory is
//! 0-indexed and sorter-native, converted exactly here.

use crate::error::{Result, SessionError};
use ndarray::Array3;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use session_stitch::StitchTable;
use sorter_units::{ChannelSelection, SorterOutput};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use trial_rasters::ClusterRaster;
use unit_isolation::{IsolatedSubset, IsolationRecord};

/// Shift an in-memory cluster id to the persisted 1-indexed form.
fn to_persisted(cluster: i32) -> i64 {
    cluster as i64 + 1
}

/// Per-recording spike stream container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeStreamContainer {
    /// Recording id
    pub recording_id: String,
    /// False when behavioral alignment was unavailable
    pub aligned: bool,
    /// Behavioral-clock spike times, seconds
    pub spike_times: Vec<f64>,
    /// Cluster ids, 1-indexed
    pub cluster_ids: Vec<i64>,
    /// Template tensor from the sorter
    pub templates: Array3<f32>,
    /// Rows (cluster_id, best_channel_local), 1-indexed ids
    pub clu_info: Vec<[i64; 2]>,
    /// `clu_info` restricted to quality `good`
    pub ks_clu_info: Vec<[i64; 2]>,
    /// Per-spike PC features of this recording's spikes
    pub pc_feat: Array3<f32>,
    /// Per-spike template scaling amplitudes
    pub temp_scaling_amps: Vec<f32>,
    /// Isolated-subset spike times, appended after selection
    pub iso_spike_times: Vec<f64>,
    /// Isolated-subset cluster ids, 1-indexed
    pub iso_cluster_ids: Vec<i64>,
    /// Isolated-subset channel rows
    pub iso_clu_info: Vec<[i64; 2]>,
}

/// Per-session stitch table file with its side-channel attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchTableFile {
    /// Session day tag
    pub day: String,
    /// Tower the animal ran in
    pub tower: String,
    /// Probe identifier
    pub probe: String,
    /// Recording ids in slot order
    pub recordings: Vec<String>,
    /// Generation timestamp, RFC 3339
    pub generated_at: String,
    /// The stitch table
    pub table: StitchTable,
}

/// Side-channel session attributes persisted with the stitch table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionAttributes {
    /// Session day tag
    pub day: String,
    /// Tower the animal ran in
    pub tower: String,
    /// Probe identifier
    pub probe: String,
}

/// Filesystem store for one session's artifacts.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| SessionError::io(&root, e))?;
        Ok(Self { root })
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn recording_dir(&self, recording_id: &str) -> PathBuf {
        self.root.join(recording_id)
    }

    fn spike_stream_path(&self, recording_id: &str) -> PathBuf {
        self.recording_dir(recording_id).join("spike_stream.bin")
    }

    fn isolation_path(&self, recording_id: &str, cluster: i32) -> PathBuf {
        self.recording_dir(recording_id)
            .join("isolation")
            .join(format!("cluster_{}.bin", to_persisted(cluster)))
    }

    fn raster_path(&self, recording_id: &str, cluster: i32) -> PathBuf {
        self.recording_dir(recording_id)
            .join("rasters")
            .join(format!("cluster_{}.bin", to_persisted(cluster)))
    }

    fn stitch_path(&self) -> PathBuf {
        self.root.join("stitch_table.json")
    }

    fn write_bincode<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::io(parent, e))?;
        }
        let bytes = bincode::serialize(value).map_err(|e| SessionError::Container {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, bytes).map_err(|e| SessionError::io(path, e))
    }

    fn read_bincode<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        if !path.exists() {
            return Err(SessionError::MissingArtifact {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path).map_err(|e| SessionError::io(path, e))?;
        bincode::deserialize(&bytes).map_err(|e| SessionError::Container {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Initial spike-stream write for one recording.
    ///
    /// The isolated-subset fields start empty; [`append_isolated`]
    /// (Self::append_isolated) fills them later in a separate exclusive
    /// write.
    pub fn write_spike_stream(
        &self,
        recording_id: &str,
        aligned: bool,
        spike_times: Vec<f64>,
        spike_clusters: &[i32],
        out: &SorterOutput,
        channels: &BTreeMap<i32, ChannelSelection>,
        pc_feat: Array3<f32>,
        temp_scaling_amps: Vec<f32>,
    ) -> Result<()> {
        let clu_info: Vec<[i64; 2]> = channels
            .iter()
            .map(|(&cluster, sel)| [to_persisted(cluster), sel.best_local as i64])
            .collect();
        let ks_clu_info: Vec<[i64; 2]> = channels
            .iter()
            .filter(|(&cluster, _)| out.quality_of(cluster).map_or(false, |q| q.is_good()))
            .map(|(&cluster, sel)| [to_persisted(cluster), sel.best_local as i64])
            .collect();

        let container = SpikeStreamContainer {
            recording_id: recording_id.to_string(),
            aligned,
            spike_times,
            cluster_ids: spike_clusters.iter().map(|&c| to_persisted(c)).collect(),
            templates: out.templates.clone(),
            clu_info,
            ks_clu_info,
            pc_feat,
            temp_scaling_amps,
            iso_spike_times: Vec::new(),
            iso_cluster_ids: Vec::new(),
            iso_clu_info: Vec::new(),
        };
        self.write_bincode(&self.spike_stream_path(recording_id), &container)
    }

    /// Read a recording's spike-stream container.
    pub fn read_spike_stream(&self, recording_id: &str) -> Result<SpikeStreamContainer> {
        self.read_bincode(&self.spike_stream_path(recording_id))
    }

    /// Append the isolated subset to an existing spike-stream container.
    pub fn append_isolated(&self, recording_id: &str, subset: &IsolatedSubset) -> Result<()> {
        let mut container = self.read_spike_stream(recording_id)?;
        container.iso_spike_times = subset.spike_times.clone();
        container.iso_cluster_ids = subset.cluster_ids.iter().map(|&c| to_persisted(c)).collect();
        container.iso_clu_info = subset
            .clusters
            .iter()
            .map(|(&cluster, sel)| [to_persisted(cluster), sel.best_local as i64])
            .collect();
        self.write_bincode(&self.spike_stream_path(recording_id), &container)
    }

    /// Whether a cluster's isolation artifact already exists.
    pub fn has_isolation(&self, recording_id: &str, cluster: i32) -> bool {
        self.isolation_path(recording_id, cluster).exists()
    }

    /// Write one cluster's isolation record.
    pub fn write_isolation(&self, recording_id: &str, record: &IsolationRecord) -> Result<()> {
        self.write_bincode(&self.isolation_path(recording_id, record.cluster), record)
    }

    /// Read one cluster's isolation record.
    pub fn read_isolation(&self, recording_id: &str, cluster: i32) -> Result<IsolationRecord> {
        self.read_bincode(&self.isolation_path(recording_id, cluster))
    }

    /// Whether a cluster's raster artifact already exists.
    pub fn has_raster(&self, recording_id: &str, cluster: i32) -> bool {
        self.raster_path(recording_id, cluster).exists()
    }

    /// Write one cluster's raster record.
    pub fn write_raster(&self, recording_id: &str, raster: &ClusterRaster) -> Result<()> {
        self.write_bincode(&self.raster_path(recording_id, raster.cluster), raster)
    }

    /// Read one cluster's raster record.
    pub fn read_raster(&self, recording_id: &str, cluster: i32) -> Result<ClusterRaster> {
        self.read_bincode(&self.raster_path(recording_id, cluster))
    }

    /// Write the session's stitch table with its attributes.
    pub fn write_stitch_table(
        &self,
        attributes: &SessionAttributes,
        table: &StitchTable,
    ) -> Result<()> {
        let file = StitchTableFile {
            day: attributes.day.clone(),
            tower: attributes.tower.clone(),
            probe: attributes.probe.clone(),
            recordings: table.recordings.clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            table: table.clone(),
        };
        let path = self.stitch_path();
        let text = serde_json::to_string_pretty(&file).map_err(|e| SessionError::Container {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, text).map_err(|e| SessionError::io(&path, e))
    }

    /// Read the session's stitch table.
    pub fn read_stitch_table(&self) -> Result<StitchTableFile> {
        let path = self.stitch_path();
        if !path.exists() {
            return Err(SessionError::MissingArtifact { path });
        }
        let text = std::fs::read_to_string(&path).map_err(|e| SessionError::io(&path, e))?;
        serde_json::from_str(&text).map_err(|e| SessionError::Container {
            path,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_cluster_ids_are_one_indexed() {
        assert_eq!(to_persisted(0), 1);
        assert_eq!(to_persisted(41), 42);
    }
}
