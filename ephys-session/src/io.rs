//! Session input loading and saving.
//!
//! A session input directory holds three artifacts:
//!
//! ```text
//! <dir>/
//!   session.json   attributes, recording group, probe geometry
//!   sorter.bin     concatenated sorter output (bincode)
//!   trials.json    behavioral trial log
//! ```
//!
//! A missing artifact is reported with its expected path and fails the
//! affected session.

use crate::error::{Result, SessionError};
use crate::pipeline::SessionInputs;
use crate::store::SessionAttributes;
use probe_timebase::RecordingGroup;
use serde::{Deserialize, Serialize};
use session_stitch::ProbeGeometry;
use sorter_units::SorterOutput;
use std::path::Path;
use trial_rasters::TrialStore;

/// The JSON manifest of a session input directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionManifest {
    /// Side-channel attributes
    pub attributes: SessionAttributes,
    /// Recording group
    pub group: RecordingGroup,
    /// Probe geometry
    pub geometry: ProbeGeometry,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(SessionError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|e| SessionError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| SessionError::Container {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| SessionError::Container {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, text).map_err(|e| SessionError::io(path, e))
}

/// Load a session input directory.
pub fn load_session_inputs(dir: &Path) -> Result<SessionInputs> {
    let manifest: SessionManifest = read_json(&dir.join("session.json"))?;

    let sorter_path = dir.join("sorter.bin");
    if !sorter_path.exists() {
        return Err(SessionError::MissingArtifact { path: sorter_path });
    }
    let bytes = std::fs::read(&sorter_path).map_err(|e| SessionError::io(&sorter_path, e))?;
    let mut sorter: SorterOutput =
        bincode::deserialize(&bytes).map_err(|e| SessionError::Container {
            path: sorter_path,
            reason: e.to_string(),
        })?;

    // Curation may re-label clusters after sorting; a TSV table beside the
    // bundle takes precedence over the labels baked into it
    let quality_path = dir.join("cluster_groups.tsv");
    if quality_path.exists() {
        let text =
            std::fs::read_to_string(&quality_path).map_err(|e| SessionError::io(&quality_path, e))?;
        sorter.quality = sorter_units::parse_quality_table(&text)?;
        log::info!("loaded {} curation labels from {}", sorter.quality.len(), quality_path.display());
    }

    // A session can run without a trial log; rasters come out empty
    let trials_path = dir.join("trials.json");
    let trials: TrialStore = if trials_path.exists() {
        read_json(&trials_path)?
    } else {
        log::warn!(
            "no trial log at {}, rasters will be empty",
            trials_path.display()
        );
        TrialStore::default()
    };

    Ok(SessionInputs {
        attributes: manifest.attributes,
        sorter,
        group: manifest.group,
        trials,
        geometry: manifest.geometry,
    })
}

/// Save session inputs into a directory in the loadable layout.
pub fn save_session_inputs(dir: &Path, inputs: &SessionInputs) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| SessionError::io(dir, e))?;

    let manifest = SessionManifest {
        attributes: inputs.attributes.clone(),
        group: inputs.group.clone(),
        geometry: inputs.geometry.clone(),
    };
    write_json(&dir.join("session.json"), &manifest)?;
    write_json(&dir.join("trials.json"), &inputs.trials)?;

    let sorter_path = dir.join("sorter.bin");
    let bytes = bincode::serialize(&inputs.sorter).map_err(|e| SessionError::Container {
        path: sorter_path.clone(),
        reason: e.to_string(),
    })?;
    std::fs::write(&sorter_path, bytes).map_err(|e| SessionError::io(&sorter_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{generate, SynthConfig};

    #[test]
    fn test_save_load_round_trip() {
        let session = generate(&SynthConfig {
            n_recordings: 1,
            n_clusters: 2,
            duration_sec: 2.0,
            trials_per_recording: 3,
            ..Default::default()
        })
        .unwrap();
        let inputs = SessionInputs {
            attributes: session.attributes,
            sorter: session.sorter,
            group: session.group,
            trials: session.trials,
            geometry: session.geometry,
        };

        let dir = std::env::temp_dir().join(format!("ephys-io-test-{}", std::process::id()));
        save_session_inputs(&dir, &inputs).unwrap();
        let loaded = load_session_inputs(&dir).unwrap();

        assert_eq!(loaded.sorter.n_spikes(), inputs.sorter.n_spikes());
        assert_eq!(loaded.group.id(), inputs.group.id());
        assert_eq!(loaded.trials.len(), inputs.trials.len());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_manifest_reports_path() {
        let dir = std::env::temp_dir().join("ephys-io-test-missing");
        let result = load_session_inputs(&dir);
        assert!(matches!(result, Err(SessionError::MissingArtifact { .. })));
    }
}
