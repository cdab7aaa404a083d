//! Pipeline configuration.
//!
//! One JSON-loadable struct covering every tunable of the pipeline.
//! The `curation` section is opaque to the core: it is persisted
//! unchanged for the external curation step.

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use session_stitch::{ClusterScope, RateParams, StitchParams};
use sorter_units::ChannelSelectParams;
use std::path::Path;
use trial_rasters::RasterParams;
use unit_isolation::IsolationParams;

/// Isolation-scoring section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationSection {
    /// Scoring window length in seconds
    pub window_sec: f64,
}

impl Default for IsolationSection {
    fn default() -> Self {
        Self { window_sec: 100.0 }
    }
}

/// Stitching section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchingSection {
    /// Minimum rate-curve correlation
    pub fr_corr_threshold: f64,
    /// Minimum waveform correlation
    pub wf_corr_threshold: f64,
    /// Minimum number of recordings a neuron must appear in
    pub min_recordings: usize,
    /// Electrode neighborhood radius
    pub channel_range: i32,
    /// Cluster scope
    pub scope: ClusterScope,
}

impl Default for StitchingSection {
    fn default() -> Self {
        let p = StitchParams::default();
        Self {
            fr_corr_threshold: p.fr_corr_threshold,
            wf_corr_threshold: p.wf_corr_threshold,
            min_recordings: p.min_recordings,
            channel_range: p.channel_range,
            scope: p.scope,
        }
    }
}

/// Raster section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSection {
    /// Optional override of every task's `[left, right]` window in ms
    pub time_window: Option<(f64, f64)>,
    /// Gaussian smoothing std in ms for the stitcher's rate curves
    pub smoothing: f64,
}

impl Default for RasterSection {
    fn default() -> Self {
        Self {
            time_window: None,
            smoothing: 10.0,
        }
    }
}

/// Channel-selection section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsSection {
    /// Weight of template energy against PC coverage
    pub energy_weight: f64,
    /// Minimum coverage for the noise reference channel
    pub coverage_floor: f64,
}

impl Default for ChannelsSection {
    fn default() -> Self {
        let p = ChannelSelectParams::default();
        Self {
            energy_weight: p.energy_weight,
            coverage_floor: p.coverage_floor,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Isolation scoring
    pub isolation: IsolationSection,
    /// Cross-recording stitching
    pub stitching: StitchingSection,
    /// Raster construction
    pub raster: RasterSection,
    /// Channel selection
    pub channels: ChannelsSection,
    /// Opaque curation thresholds, persisted unchanged
    pub curation: serde_json::Value,
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SessionError::io(path, e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| SessionError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section by building the stage parameters.
    pub fn validate(&self) -> Result<()> {
        self.channel_params().validate()?;
        self.isolation_params().validate()?;
        self.raster_params().validate()?;
        self.rate_params().validate()?;
        self.stitch_params().validate()?;
        Ok(())
    }

    /// Channel-selection parameters.
    pub fn channel_params(&self) -> ChannelSelectParams {
        ChannelSelectParams {
            energy_weight: self.channels.energy_weight,
            coverage_floor: self.channels.coverage_floor,
        }
    }

    /// Isolation-scoring parameters.
    pub fn isolation_params(&self) -> IsolationParams {
        IsolationParams {
            window_sec: self.isolation.window_sec,
        }
    }

    /// Raster-construction parameters.
    pub fn raster_params(&self) -> RasterParams {
        RasterParams {
            window_override: self.raster.time_window,
        }
    }

    /// Rate-curve parameters for the stitcher.
    pub fn rate_params(&self) -> RateParams {
        RateParams {
            smoothing_ms: self.raster.smoothing,
            ..RateParams::default()
        }
    }

    /// Stitching parameters.
    pub fn stitch_params(&self) -> StitchParams {
        StitchParams {
            fr_corr_threshold: self.stitching.fr_corr_threshold,
            wf_corr_threshold: self.stitching.wf_corr_threshold,
            min_recordings: self.stitching.min_recordings,
            channel_range: self.stitching.channel_range,
            scope: self.stitching.scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"isolation": {"window_sec": 50.0}}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.isolation.window_sec, 50.0);
        assert_eq!(config.stitching.min_recordings, 2);
        assert_eq!(config.raster.smoothing, 10.0);
    }

    #[test]
    fn test_curation_section_is_opaque() {
        let json = r#"{"curation": {"iso_floor": 12.0, "notes": "v2"}}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        let round_tripped = serde_json::to_value(&config).unwrap();
        assert_eq!(round_tripped["curation"]["iso_floor"], 12.0);
        assert_eq!(round_tripped["curation"]["notes"], "v2");
    }

    #[test]
    fn test_invalid_section_fails_validation() {
        let mut config = PipelineConfig::default();
        config.isolation.window_sec = -1.0;
        assert!(config.validate().is_err());
    }
}
