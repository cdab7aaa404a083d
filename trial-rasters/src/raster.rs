//! Trial-aligned raster construction.
//!
//! For each cluster and task type, spike times are sliced into per-trial
//! windows around an alignment event, expressed in ms relative to that
//! event, together with a per-trial reaction time. Rasters are stacked
//! across task types in a fixed order, and rebuilt for every neighbor
//! cluster sharing the best channel.

use crate::error::{RasterError, Result};
use crate::task::{EventPolicy, RtDenominator, TaskKind};
use crate::trial::{Trial, TrialStore};
use serde::{Deserialize, Serialize};

/// Parameters for raster construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RasterParams {
    /// When set, overrides every task's peri-event window `[left, right]` ms
    pub window_override: Option<(f64, f64)>,
}

impl RasterParams {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if let Some((left, right)) = self.window_override {
            if !(left < right) {
                return Err(RasterError::InvalidWindow {
                    left,
                    right,
                    reason: "left bound must be below right bound".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// One trial's aligned spikes and reaction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSlice {
    /// Trial index within the recording
    pub trial_index: u32,
    /// Spike times in ms relative to the alignment event
    pub spikes_ms: Vec<f64>,
    /// Reaction time in ms; NaN when either defining event is missing
    pub rt_ms: f64,
}

/// One task type's raster for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRaster {
    /// Task type
    pub task: TaskKind,
    /// Event the trials were aligned on; `None` when the task had no trials
    pub align_event: Option<String>,
    /// Window `[left, right]` in ms relative to the event
    pub window_ms: (f64, f64),
    /// One slice per trial, in trial order
    pub trials: Vec<TrialSlice>,
}

impl TaskRaster {
    fn empty(task: TaskKind, window_ms: (f64, f64)) -> Self {
        Self {
            task,
            align_event: None,
            window_ms,
            trials: Vec::new(),
        }
    }
}

/// A neighbor cluster's stacked raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborRaster {
    /// Neighbor cluster id
    pub cluster: i32,
    /// Task rasters in stacking order
    pub tasks: Vec<TaskRaster>,
}

/// A cluster's complete raster record: its own task rasters plus one
/// raster per neighbor on its best channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRaster {
    /// Cluster id
    pub cluster: i32,
    /// Task rasters in stacking order
    pub tasks: Vec<TaskRaster>,
    /// Neighbor rasters, one per cluster sharing the best channel
    pub neighbors: Vec<NeighborRaster>,
}

fn resolve_rt(task: TaskKind, trial: &Trial, align_event: &str) -> f64 {
    let Some(numerator_event) = task.rt_numerator() else {
        return f64::NAN;
    };
    let numerator = trial.event(numerator_event);
    let denominator = match task.rt_denominator() {
        Some(RtDenominator::AlignEvent) => trial.event(align_event),
        Some(RtDenominator::Named(e)) => trial.event(e),
        Some(RtDenominator::NamedPair(a, b)) => trial.event(a).or_else(|| trial.event(b)),
        None => None,
    };
    match (numerator, denominator) {
        (Some(n), Some(d)) => n - d,
        _ => f64::NAN,
    }
}

fn slice_trial(
    times_s: &[f64],
    trial: &Trial,
    align_event: &str,
    window_ms: (f64, f64),
    rt_ms: f64,
) -> TrialSlice {
    let spikes_ms = match trial.event(align_event) {
        Some(event_ms) => times_s
            .iter()
            .map(|&t| t * 1_000.0)
            .filter(|&t_ms| t_ms >= event_ms + window_ms.0 && t_ms <= event_ms + window_ms.1)
            .map(|t_ms| t_ms - event_ms)
            .collect(),
        None => Vec::new(),
    };
    TrialSlice {
        trial_index: trial.index,
        spikes_ms,
        rt_ms,
    }
}

/// Build one task's raster from the cluster's spike times (behavioral
/// seconds) and the trials of that task.
pub fn build_task_raster(
    times_s: &[f64],
    trials: &[&Trial],
    task: TaskKind,
    policy: EventPolicy,
    params: &RasterParams,
) -> TaskRaster {
    let window_ms = params.window_override.unwrap_or_else(|| task.window_ms());
    if trials.is_empty() {
        return TaskRaster::empty(task, window_ms);
    }

    // Primary alignment event, falling back only when no trial carries it
    let (primary, fallback) = task.align_events(policy);
    let align_event = if trials.iter().any(|t| t.event(primary).is_some()) {
        primary
    } else {
        match fallback {
            Some(f) if trials.iter().any(|t| t.event(f).is_some()) => f,
            _ => primary,
        }
    };

    let mut slices: Vec<TrialSlice> = trials
        .iter()
        .map(|trial| {
            let rt = resolve_rt(task, trial, align_event);
            slice_trial(times_s, trial, align_event, window_ms, rt)
        })
        .collect();
    let mut used_event = align_event.to_string();

    // Touch sessions without saccade markers realign on trial start and
    // take StartOn - End as the reaction time.
    if task == TaskKind::Touch && slices.iter().all(|s| s.rt_ms.is_nan()) {
        log::debug!(
            "touch raster: no saccade reaction times, realigning {} trials on StartOn",
            trials.len()
        );
        used_event = "StartOn".to_string();
        slices = trials
            .iter()
            .map(|trial| {
                let rt = match (trial.event("StartOn"), trial.event("End")) {
                    (Some(start), Some(end)) => start - end,
                    _ => f64::NAN,
                };
                slice_trial(times_s, trial, "StartOn", window_ms, rt)
            })
            .collect();
    }

    TaskRaster {
        task,
        align_event: Some(used_event),
        window_ms,
        trials: slices,
    }
}

/// Build a cluster's stacked raster record, including neighbor rasters.
///
/// `neighbor_times` pairs each neighbor cluster (sharing this cluster's
/// best channel) with its own behavioral spike times. Neighbor rasters
/// use the neighbor event policy, which swaps the CO primary/fallback
/// pair.
pub fn build_cluster_raster(
    cluster: i32,
    times_s: &[f64],
    neighbor_times: &[(i32, Vec<f64>)],
    store: &TrialStore,
    recording_id: &str,
    params: &RasterParams,
) -> ClusterRaster {
    let stack = |times: &[f64], policy: EventPolicy| -> Vec<TaskRaster> {
        TaskKind::STACK_ORDER
            .iter()
            .map(|&task| {
                let trials = store.for_recording_task(recording_id, task);
                build_task_raster(times, &trials, task, policy, params)
            })
            .collect()
    };

    ClusterRaster {
        cluster,
        tasks: stack(times_s, EventPolicy::Own),
        neighbors: neighbor_times
            .iter()
            .map(|(id, times)| NeighborRaster {
                cluster: *id,
                tasks: stack(times, EventPolicy::Neighbor),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn co_trial(index: u32, targs_on: f64) -> Trial {
        Trial::new("r1", index, TaskKind::Co).with_event("TargsOn", targs_on)
    }

    #[test]
    fn test_co_windowing() {
        // Event at 1000 ms; window [-300, 500] keeps relative times in
        // [-300, 500] with inclusive edges.
        let trial = co_trial(0, 1_000.0);
        let times_s = [0.4, 0.7, 0.9, 1.1, 1.4, 1.6];

        let raster = build_task_raster(
            &times_s,
            &[&trial],
            TaskKind::Co,
            EventPolicy::Own,
            &RasterParams::default(),
        );

        assert_eq!(raster.align_event.as_deref(), Some("TargsOn"));
        assert_eq!(raster.trials.len(), 1);
        let spikes = &raster.trials[0].spikes_ms;
        assert_eq!(spikes.len(), 4);
        assert_relative_eq!(spikes[0], -300.0, epsilon = 1e-9);
        assert_relative_eq!(spikes[1], -100.0, epsilon = 1e-9);
        assert_relative_eq!(spikes[2], 100.0, epsilon = 1e-9);
        assert_relative_eq!(spikes[3], 400.0, epsilon = 1e-9);
    }

    #[test]
    fn test_window_conformance() {
        let trial = co_trial(0, 2_000.0);
        let times_s: Vec<f64> = (0..400).map(|i| i as f64 * 0.01).collect();
        let raster = build_task_raster(
            &times_s,
            &[&trial],
            TaskKind::Co,
            EventPolicy::Own,
            &RasterParams::default(),
        );
        let (left, right) = raster.window_ms;
        for &t in &raster.trials[0].spikes_ms {
            assert!(t >= left && t <= right);
        }
    }

    #[test]
    fn test_fallback_event_engaged() {
        // No trial has TargsOn; all have disTargsOn.
        let trial = Trial::new("r1", 0, TaskKind::Co).with_event("disTargsOn", 1_000.0);
        let raster = build_task_raster(
            &[1.0],
            &[&trial],
            TaskKind::Co,
            EventPolicy::Own,
            &RasterParams::default(),
        );
        assert_eq!(raster.align_event.as_deref(), Some("disTargsOn"));
        assert_eq!(raster.trials[0].spikes_ms, vec![0.0]);
    }

    #[test]
    fn test_neighbor_policy_swaps_co_primary() {
        // Both events present: own raster aligns on TargsOn, neighbor
        // raster on disTargsOn.
        let trial = Trial::new("r1", 0, TaskKind::Co)
            .with_event("TargsOn", 1_000.0)
            .with_event("disTargsOn", 1_200.0);

        let own = build_task_raster(
            &[1.0],
            &[&trial],
            TaskKind::Co,
            EventPolicy::Own,
            &RasterParams::default(),
        );
        let neighbor = build_task_raster(
            &[1.0],
            &[&trial],
            TaskKind::Co,
            EventPolicy::Neighbor,
            &RasterParams::default(),
        );
        assert_eq!(own.align_event.as_deref(), Some("TargsOn"));
        assert_eq!(neighbor.align_event.as_deref(), Some("disTargsOn"));
    }

    #[test]
    fn test_missing_event_yields_empty_slice() {
        let with_event = co_trial(0, 1_000.0);
        let without_event = Trial::new("r1", 1, TaskKind::Co);

        let raster = build_task_raster(
            &[1.0],
            &[&with_event, &without_event],
            TaskKind::Co,
            EventPolicy::Own,
            &RasterParams::default(),
        );
        assert_eq!(raster.trials.len(), 2);
        assert!(!raster.trials[0].spikes_ms.is_empty());
        assert!(raster.trials[1].spikes_ms.is_empty());
        assert!(raster.trials[1].rt_ms.is_nan());
    }

    #[test]
    fn test_rt_from_align_event() {
        let trial = co_trial(0, 1_000.0).with_event("SaccStart", 1_180.0);
        let raster = build_task_raster(
            &[],
            &[&trial],
            TaskKind::Co,
            EventPolicy::Own,
            &RasterParams::default(),
        );
        assert_relative_eq!(raster.trials[0].rt_ms, 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rt_denominator_pair_falls_back() {
        // GazeAnchor RT denominator prefers disGo, falls back to Go.
        let with_disgo = Trial::new("r1", 0, TaskKind::GazeAnchor)
            .with_event("disTargsOn", 500.0)
            .with_event("SaccStart", 900.0)
            .with_event("disGo", 700.0);
        let with_go = Trial::new("r1", 1, TaskKind::GazeAnchor)
            .with_event("disTargsOn", 500.0)
            .with_event("SaccStart", 900.0)
            .with_event("Go", 650.0);

        let raster = build_task_raster(
            &[],
            &[&with_disgo, &with_go],
            TaskKind::GazeAnchor,
            EventPolicy::Own,
            &RasterParams::default(),
        );
        assert_relative_eq!(raster.trials[0].rt_ms, 200.0, epsilon = 1e-9);
        assert_relative_eq!(raster.trials[1].rt_ms, 250.0, epsilon = 1e-9);
    }

    #[test]
    fn test_touch_realigns_when_rts_all_missing() {
        // No SaccStart anywhere: Touch realigns on StartOn with
        // RT = StartOn - End.
        let trial = Trial::new("r1", 0, TaskKind::Touch)
            .with_event("disTargsOn", 400.0)
            .with_event("StartOn", 1_000.0)
            .with_event("End", 800.0);

        let raster = build_task_raster(
            &[1.0],
            &[&trial],
            TaskKind::Touch,
            EventPolicy::Own,
            &RasterParams::default(),
        );
        assert_eq!(raster.align_event.as_deref(), Some("StartOn"));
        assert_relative_eq!(raster.trials[0].rt_ms, 200.0, epsilon = 1e-9);
        assert_eq!(raster.trials[0].spikes_ms, vec![0.0]);
    }

    #[test]
    fn test_null_rt_is_length_matched_nan() {
        let trials: Vec<Trial> = (0..3)
            .map(|i| Trial::new("r1", i, TaskKind::Null).with_event("Pulse_start", 100.0))
            .collect();
        let refs: Vec<&Trial> = trials.iter().collect();

        let raster = build_task_raster(
            &[],
            &refs,
            TaskKind::Null,
            EventPolicy::Own,
            &RasterParams::default(),
        );
        assert_eq!(raster.trials.len(), 3);
        assert!(raster.trials.iter().all(|s| s.rt_ms.is_nan()));
    }

    #[test]
    fn test_stacked_raster_order_and_neighbors() {
        let store = TrialStore::new(vec![
            co_trial(0, 1_000.0),
            Trial::new("r1", 1, TaskKind::Reach).with_event("ReachStart", 2_000.0),
        ]);

        let raster = build_cluster_raster(
            5,
            &[1.0, 2.0],
            &[(9, vec![1.05])],
            &store,
            "r1",
            &RasterParams::default(),
        );

        assert_eq!(raster.cluster, 5);
        assert_eq!(raster.tasks.len(), 8);
        let order: Vec<TaskKind> = raster.tasks.iter().map(|t| t.task).collect();
        assert_eq!(order, TaskKind::STACK_ORDER.to_vec());

        // Tasks without trials stay well-formed and empty
        assert!(raster.tasks[1].trials.is_empty());
        assert!(raster.tasks[1].align_event.is_none());

        assert_eq!(raster.neighbors.len(), 1);
        assert_eq!(raster.neighbors[0].cluster, 9);
        assert_eq!(raster.neighbors[0].tasks.len(), 8);
    }

    #[test]
    fn test_empty_store_yields_empty_record() {
        let store = TrialStore::default();
        let raster = build_cluster_raster(
            1,
            &[1.0],
            &[],
            &store,
            "r1",
            &RasterParams::default(),
        );
        assert!(raster.tasks.iter().all(|t| t.trials.is_empty()));
    }

    #[test]
    fn test_window_override_applies() {
        let trial = co_trial(0, 1_000.0);
        let params = RasterParams {
            window_override: Some((-100.0, 100.0)),
        };
        let raster =
            build_task_raster(&[0.7, 1.05], &[&trial], TaskKind::Co, EventPolicy::Own, &params);
        assert_eq!(raster.window_ms, (-100.0, 100.0));
        assert_eq!(raster.trials[0].spikes_ms.len(), 1);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let params = RasterParams {
            window_override: Some((500.0, -300.0)),
        };
        assert!(params.validate().is_err());
    }
}
