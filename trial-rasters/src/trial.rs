//! Behavioral trials as explicit event maps.
//!
//! A trial is a task tag plus a mapping from event name to behavioral
//! time. Absence of an event is represented by absence from the map;
//! loaders turn upstream NaN placeholders into absence at the boundary.

use crate::task::TaskKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One behavioral trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    /// Recording this trial belongs to
    pub recording_id: String,
    /// Trial index within the recording
    pub index: u32,
    /// Task type
    pub task: TaskKind,
    /// Event times in behavioral-clock ms, keyed by event name
    events: BTreeMap<String, f64>,
}

impl Trial {
    /// A trial with no events yet.
    pub fn new(recording_id: impl Into<String>, index: u32, task: TaskKind) -> Self {
        Self {
            recording_id: recording_id.into(),
            index,
            task,
            events: BTreeMap::new(),
        }
    }

    /// Record an event time. A non-finite time means the event is missing
    /// and is not stored.
    pub fn set_event(&mut self, name: impl Into<String>, time_ms: f64) {
        if time_ms.is_finite() {
            self.events.insert(name.into(), time_ms);
        }
    }

    /// Builder-style [`set_event`](Self::set_event).
    pub fn with_event(mut self, name: impl Into<String>, time_ms: f64) -> Self {
        self.set_event(name, time_ms);
        self
    }

    /// Time of an event, if the trial has it.
    pub fn event(&self, name: &str) -> Option<f64> {
        self.events.get(name).copied()
    }

    /// Event names present on this trial.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(|k| k.as_str())
    }
}

/// All trials of a session, with per-recording and per-task filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialStore {
    trials: Vec<Trial>,
}

impl TrialStore {
    /// Build a store from loaded trials.
    pub fn new(trials: Vec<Trial>) -> Self {
        Self { trials }
    }

    /// Number of trials.
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether the store holds no trials.
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// All trials, in load order.
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Trials of one recording, in load order.
    pub fn for_recording<'a>(&'a self, recording_id: &str) -> Vec<&'a Trial> {
        self.trials
            .iter()
            .filter(|t| t.recording_id == recording_id)
            .collect()
    }

    /// Trials of one recording and task, in load order.
    pub fn for_recording_task<'a>(
        &'a self,
        recording_id: &str,
        task: TaskKind,
    ) -> Vec<&'a Trial> {
        self.trials
            .iter()
            .filter(|t| t.recording_id == recording_id && t.task == task)
            .collect()
    }
}
