//! Isolation frames and per-cluster isolation records.

use serde::{Deserialize, Serialize};

/// Curation verdict on one isolation frame.
///
/// The scorer always initializes frames to `NotIsolated`; an external
/// curation step may flip frame 0 afterwards, and selection reads only
/// that frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Not (yet) judged isolated
    #[default]
    NotIsolated,
    /// Judged isolated by curation
    Isolated,
}

/// A neighbor cluster sharing the scored cluster's best channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborInfo {
    /// Neighbor cluster id
    pub cluster: i32,
    /// Whether the neighbor carries the `good` quality label
    pub good: bool,
}

/// A neighbor's first-PC values restricted to one time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborPcSnapshot {
    /// Neighbor cluster id
    pub cluster: i32,
    /// Scaled first-PC values of the neighbor's spikes inside the window,
    /// projected on the shared best channel
    pub first_pc: Vec<f64>,
}

/// Signal/noise discriminability of one cluster in one time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationFrame {
    /// Window index (window w covers `[w * window_sec, (w+1) * window_sec]`)
    pub window_index: usize,
    /// Window start in behavioral seconds
    pub start_s: f64,
    /// Spikes inside the window
    pub n_spikes: usize,
    /// First-PC discriminability; `None` for an empty window, NaN when the
    /// noise channel has zero variance
    pub score: Option<f64>,
    /// Per-component mean of the best-channel projections
    pub signal_mean: Vec<f64>,
    /// Per-component mean of the worst-channel projections
    pub noise_mean: Vec<f64>,
    /// Per-component sample std of the worst-channel projections
    pub noise_std: Vec<f64>,
    /// Curation verdict, initialized to `NotIsolated`
    pub verdict: Verdict,
    /// Neighbor first-PC activity inside this window
    pub neighbor_pc: Vec<NeighborPcSnapshot>,
}

impl IsolationFrame {
    /// A degenerate frame for a window (or cluster) with no spikes.
    pub fn empty(window_index: usize, start_s: f64) -> Self {
        Self {
            window_index,
            start_s,
            n_spikes: 0,
            score: None,
            signal_mean: Vec::new(),
            noise_mean: Vec::new(),
            noise_std: Vec::new(),
            verdict: Verdict::NotIsolated,
            neighbor_pc: Vec::new(),
        }
    }
}

/// Complete isolation output for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationRecord {
    /// Scored cluster id
    pub cluster: i32,
    /// Best (signal) channel, global
    pub best_channel: i32,
    /// Worst (noise) channel, global
    pub worst_channel: i32,
    /// Template waveform on the best channel
    pub waveform_best: Vec<f32>,
    /// Template waveform on the worst channel
    pub waveform_worst: Vec<f32>,
    /// Clusters sharing the best channel, with their `good` flags
    pub neighbors: Vec<NeighborInfo>,
    /// Window length used, seconds
    pub window_sec: f64,
    /// One frame per time window
    pub frames: Vec<IsolationFrame>,
}

impl IsolationRecord {
    /// Whether curation marked this cluster isolated (frame-0 verdict).
    pub fn is_isolated(&self) -> bool {
        self.frames
            .first()
            .map_or(false, |f| f.verdict == Verdict::Isolated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_defaults_not_isolated() {
        assert_eq!(Verdict::default(), Verdict::NotIsolated);
    }

    #[test]
    fn test_empty_frame() {
        let frame = IsolationFrame::empty(3, 300.0);
        assert_eq!(frame.window_index, 3);
        assert_eq!(frame.n_spikes, 0);
        assert!(frame.score.is_none());
        assert_eq!(frame.verdict, Verdict::NotIsolated);
    }

    #[test]
    fn test_is_isolated_reads_frame_zero() {
        let mut record = IsolationRecord {
            cluster: 1,
            best_channel: 0,
            worst_channel: 1,
            waveform_best: Vec::new(),
            waveform_worst: Vec::new(),
            neighbors: Vec::new(),
            window_sec: 100.0,
            frames: vec![IsolationFrame::empty(0, 0.0), IsolationFrame::empty(1, 100.0)],
        };
        assert!(!record.is_isolated());

        record.frames[1].verdict = Verdict::Isolated;
        assert!(!record.is_isolated());

        record.frames[0].verdict = Verdict::Isolated;
        assert!(record.is_isolated());
    }
}
