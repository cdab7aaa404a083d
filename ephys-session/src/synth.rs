//! Synthetic sessions for validation and demos.
//!
//! Poisson spike trains with per-cluster Gaussian templates, plus a
//! matching trial log, shaped exactly like real sorter output so the
//! full pipeline can run end to end on generated data.

use crate::error::{Result, SessionError};
use crate::store::SessionAttributes;
use ndarray::{Array2, Array3};
use probe_timebase::{AffineModel, Recording, RecordingGroup};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};
use session_stitch::ProbeGeometry;
use sorter_units::{QualityLabel, SorterOutput};
use std::collections::BTreeMap;
use trial_rasters::{TaskKind, Trial, TrialStore};

/// Parameters of the synthetic session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Number of recordings in the session
    pub n_recordings: usize,
    /// Number of clusters
    pub n_clusters: usize,
    /// Number of probe channels
    pub n_channels: usize,
    /// Local PC channels per template
    pub n_local_channels: usize,
    /// Template window length in samples
    pub template_samples: usize,
    /// Duration of each recording in seconds
    pub duration_sec: f64,
    /// Probe sample rate in Hz
    pub sample_rate: f64,
    /// Mean firing rate per cluster in Hz
    pub mean_rate_hz: f64,
    /// Trials per recording
    pub trials_per_recording: usize,
    /// RNG seed
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            n_recordings: 2,
            n_clusters: 6,
            n_channels: 16,
            n_local_channels: 4,
            template_samples: 40,
            duration_sec: 60.0,
            sample_rate: 30_000.0,
            mean_rate_hz: 5.0,
            trials_per_recording: 20,
            seed: 7,
        }
    }
}

/// A complete synthetic session: sorter output, timing metadata, trials,
/// and probe geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthSession {
    /// Session attributes for the stitch table
    pub attributes: SessionAttributes,
    /// Concatenated sorter output over all recordings
    pub sorter: SorterOutput,
    /// The recording group
    pub group: RecordingGroup,
    /// Trial log across recordings
    pub trials: TrialStore,
    /// Probe geometry
    pub geometry: ProbeGeometry,
}

impl SynthConfig {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<()> {
        for (name, value, ok) in [
            ("mean_rate_hz", self.mean_rate_hz, self.mean_rate_hz > 0.0),
            ("duration_sec", self.duration_sec, self.duration_sec > 0.0),
            ("sample_rate", self.sample_rate, self.sample_rate > 0.0),
        ] {
            if !ok || !value.is_finite() {
                return Err(SessionError::Config(format!(
                    "synth.{} must be positive and finite (got {})",
                    name, value
                )));
            }
        }
        if self.n_recordings == 0 || self.n_clusters == 0 || self.n_channels == 0 {
            return Err(SessionError::Config(
                "synth counts must be non-zero".to_string(),
            ));
        }
        if self.n_local_channels < 2 || self.n_local_channels > self.n_channels {
            return Err(SessionError::Config(format!(
                "synth.n_local_channels must be in [2, n_channels] (got {})",
                self.n_local_channels
            )));
        }
        Ok(())
    }
}

fn normal(mean: f64, std: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std)
        .map_err(|e| SessionError::Config(format!("bad normal({}, {}): {}", mean, std, e)))
}

/// Generate a synthetic session. Deterministic for a given config.
pub fn generate(config: &SynthConfig) -> Result<SynthSession> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let templates = make_templates(config, &mut rng)?;
    let pc_feature_ind = make_local_tables(config);
    let group = make_group(config)?;

    // Poisson baseline per cluster per recording, merged into one
    // concatenated stream ordered by probe sample
    let isi = Exp::new(config.mean_rate_hz)
        .map_err(|e| SessionError::Config(format!("bad mean_rate_hz: {}", e)))?;
    let amp_dist = normal(1.0, 0.05)?;
    let pc_jitter = normal(0.0, 0.5)?;
    let pc_noise = normal(0.0, 1.0)?;
    let mut events: Vec<(i64, i32)> = Vec::new();
    for cluster in 0..config.n_clusters as i32 {
        for r in 0..config.n_recordings {
            let offset = r as f64 * config.duration_sec;
            let mut t = isi.sample(&mut rng);
            while t < config.duration_sec {
                let sample = ((offset + t) * config.sample_rate).round() as i64;
                events.push((sample, cluster));
                t += isi.sample(&mut rng);
            }
        }
    }

    // Event-locked bursts at a cluster-specific latency after every trial
    // anchor, identical across recordings. These give each cluster a
    // reproducible peri-event rate profile the stitcher can track.
    for cluster in 0..config.n_clusters as i32 {
        let latency_ms = 30.0 + 25.0 * cluster as f64;
        for r in 0..config.n_recordings {
            let offset = r as f64 * config.duration_sec;
            for i in 0..config.trials_per_recording {
                let anchor_ms = 1_000.0 + i as f64 * 2_000.0;
                for j in 0..6 {
                    let t_local = (anchor_ms + latency_ms + 15.0 * j as f64) / 1_000.0;
                    if t_local >= config.duration_sec {
                        continue;
                    }
                    let sample =
                        ((offset + t_local) * config.sample_rate).round() as i64;
                    events.push((sample, cluster));
                }
            }
        }
    }
    events.sort_unstable();

    let n_spikes = events.len();
    let mut pc_features = Array3::zeros((n_spikes, 3, config.n_local_channels));
    let mut scaling_amps = Vec::with_capacity(n_spikes);
    for (s, &(_, cluster)) in events.iter().enumerate() {
        // Strong first PC on the home column, unit noise on the low-energy
        // spillover column
        pc_features[[s, 0, 0]] =
            (8.0 + cluster as f32) + pc_jitter.sample(&mut rng) as f32;
        pc_features[[s, 1, 0]] = rng.gen_range(-0.5..0.5);
        pc_features[[s, 0, 1]] = pc_noise.sample(&mut rng) as f32;
        pc_features[[s, 1, 1]] = rng.gen_range(-0.2..0.2);
        scaling_amps.push(amp_dist.sample(&mut rng) as f32);
    }

    let mut quality = BTreeMap::new();
    for cluster in 0..config.n_clusters as i32 {
        let label = match cluster % 3 {
            0 => QualityLabel::Good,
            1 => QualityLabel::Mua,
            _ => QualityLabel::Unsorted,
        };
        quality.insert(cluster, label);
    }

    let sorter = SorterOutput {
        spike_times: events.iter().map(|&(s, _)| s).collect(),
        spike_clusters: events.iter().map(|&(_, c)| c).collect(),
        spike_templates: events.iter().map(|&(_, c)| c).collect(),
        templates,
        pc_features,
        pc_feature_ind,
        scaling_amps,
        channel_map: (0..config.n_channels as i32).collect(),
        quality,
    };
    sorter.validate()?;

    Ok(SynthSession {
        attributes: SessionAttributes {
            day: "synthetic".to_string(),
            tower: "t0".to_string(),
            probe: "p0".to_string(),
        },
        sorter,
        group,
        trials: make_trials(config, &mut rng),
        geometry: ProbeGeometry::linear(config.n_channels),
    })
}

fn make_templates(config: &SynthConfig, rng: &mut StdRng) -> Result<Array3<f32>> {
    let mut templates = Array3::zeros((
        config.n_clusters,
        config.template_samples,
        config.n_channels,
    ));
    let center = config.template_samples as f64 / 2.0;
    let width = config.template_samples as f64 / 8.0;
    let jitter = normal(0.0, 0.02)?;

    for k in 0..config.n_clusters {
        let home = k % config.n_channels;
        let amplitude = 40.0 + 5.0 * k as f64;
        for s in 0..config.template_samples {
            let x = (s as f64 - center) / width;
            let bump = amplitude * (-0.5 * x * x).exp();
            templates[[k, s, home]] = (bump + jitter.sample(rng)) as f32;
            // Faint spillover one channel over, as on a real shank
            let spill = (home + 1) % config.n_channels;
            templates[[k, s, spill]] = (0.2 * bump) as f32;
        }
    }
    Ok(templates)
}

fn make_local_tables(config: &SynthConfig) -> Array2<i32> {
    let mut table = Array2::zeros((config.n_clusters, config.n_local_channels));
    for k in 0..config.n_clusters {
        let home = k % config.n_channels;
        for l in 0..config.n_local_channels {
            table[[k, l]] = ((home + l) % config.n_channels) as i32;
        }
    }
    table
}

fn make_group(config: &SynthConfig) -> Result<RecordingGroup> {
    let recordings = (0..config.n_recordings)
        .map(|r| Recording {
            id: format!("rec{}", r),
            duration_samples: (config.duration_sec * config.sample_rate) as i64,
            sample_rate: config.sample_rate,
            probe_to_aux: AffineModel::identity(),
            aux_to_behavioral: Some(AffineModel::identity()),
        })
        .collect();
    Ok(RecordingGroup::new(recordings)?)
}

fn make_trials(config: &SynthConfig, rng: &mut StdRng) -> TrialStore {
    let tasks = [TaskKind::Co, TaskKind::Reach, TaskKind::Null];
    let mut trials = Vec::new();

    for r in 0..config.n_recordings {
        let recording_id = format!("rec{}", r);
        for i in 0..config.trials_per_recording {
            let task = tasks[i % tasks.len()];
            let anchor_ms = 1_000.0 + i as f64 * 2_000.0;
            let mut trial = Trial::new(recording_id.clone(), i as u32, task);
            match task {
                TaskKind::Co => {
                    trial.set_event("TargsOn", anchor_ms);
                    trial.set_event("disGo", anchor_ms + 80.0);
                    trial.set_event("SaccStart", anchor_ms + 150.0 + rng.gen_range(0.0..60.0));
                }
                TaskKind::Reach => {
                    trial.set_event("TargsOn", anchor_ms - 300.0);
                    trial.set_event("ReachStart", anchor_ms);
                }
                TaskKind::Null => {
                    trial.set_event("Pulse_start", anchor_ms);
                }
                _ => {}
            }
            trials.push(trial);
        }
    }
    TrialStore::new(trials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_session_validates() {
        let session = generate(&SynthConfig::default()).unwrap();
        session.sorter.validate().unwrap();
        assert_eq!(session.group.recordings.len(), 2);
        assert_eq!(session.sorter.cluster_ids().len(), 6);
        assert!(!session.trials.is_empty());
    }

    #[test]
    fn test_deterministic_for_seed() {
        let a = generate(&SynthConfig::default()).unwrap();
        let b = generate(&SynthConfig::default()).unwrap();
        assert_eq!(a.sorter.spike_times, b.sorter.spike_times);
        assert_eq!(a.sorter.scaling_amps, b.sorter.scaling_amps);
    }

    #[test]
    fn test_spikes_within_session_duration() {
        let config = SynthConfig::default();
        let session = generate(&config).unwrap();
        let total_samples = (config.duration_sec
            * config.sample_rate
            * config.n_recordings as f64) as i64;
        assert!(session
            .sorter
            .spike_times
            .iter()
            .all(|&s| s >= 0 && s <= total_samples));
    }
}
