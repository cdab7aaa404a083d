//! Behavioral task types and their alignment constants.
//!
//! Each task tag fixes the alignment event (with a fallback), the
//! peri-event window, and how reaction time is defined. Folding those
//! constants into one sum type keeps the builder to a single code path.

use crate::error::{RasterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of behavioral task types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// Center-out saccade
    Co,
    /// Luminance-cued go
    Lum,
    /// Gaze anchoring
    GazeAnchor,
    /// Visually guided saccade
    Saccade,
    /// Touch with feedback
    TouchFeedback,
    /// Touch
    Touch,
    /// Reach
    Reach,
    /// Null (pulse-aligned baseline)
    Null,
}

/// Whose raster is being aligned. The CO tag swaps its primary/fallback
/// pair between a cluster's own raster and its neighbors' rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPolicy {
    /// The cluster's own raster
    Own,
    /// A raster built for a neighbor cluster
    Neighbor,
}

/// How the reaction-time denominator is resolved for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtDenominator {
    /// The event the trial was aligned on
    AlignEvent,
    /// A named event
    Named(&'static str),
    /// A named event with a fallback
    NamedPair(&'static str, &'static str),
}

impl TaskKind {
    /// All tags in the fixed cross-task stacking order.
    pub const STACK_ORDER: [TaskKind; 8] = [
        TaskKind::Co,
        TaskKind::Lum,
        TaskKind::Reach,
        TaskKind::Null,
        TaskKind::GazeAnchor,
        TaskKind::Saccade,
        TaskKind::TouchFeedback,
        TaskKind::Touch,
    ];

    /// Alignment events as (primary, fallback) for the given policy.
    pub fn align_events(&self, policy: EventPolicy) -> (&'static str, Option<&'static str>) {
        match self {
            TaskKind::Co => match policy {
                EventPolicy::Own => ("TargsOn", Some("disTargsOn")),
                EventPolicy::Neighbor => ("disTargsOn", Some("TargsOn")),
            },
            TaskKind::Lum => ("disGo", Some("Go")),
            TaskKind::GazeAnchor
            | TaskKind::Saccade
            | TaskKind::TouchFeedback
            | TaskKind::Touch => ("disTargsOn", Some("TargsOn")),
            TaskKind::Reach => ("ReachStart", None),
            TaskKind::Null => ("Pulse_start", None),
        }
    }

    /// Peri-event window `[left, right]` in ms.
    pub fn window_ms(&self) -> (f64, f64) {
        match self {
            TaskKind::Reach => (-400.0, 400.0),
            _ => (-300.0, 500.0),
        }
    }

    /// Reaction-time numerator event, when the task defines one.
    pub fn rt_numerator(&self) -> Option<&'static str> {
        match self {
            TaskKind::Co
            | TaskKind::Lum
            | TaskKind::GazeAnchor
            | TaskKind::Saccade
            | TaskKind::TouchFeedback
            | TaskKind::Touch => Some("SaccStart"),
            TaskKind::Reach => Some("ReachStart"),
            TaskKind::Null => None,
        }
    }

    /// Reaction-time denominator policy, when the task defines one.
    pub fn rt_denominator(&self) -> Option<RtDenominator> {
        match self {
            TaskKind::Co | TaskKind::Lum => Some(RtDenominator::AlignEvent),
            TaskKind::GazeAnchor
            | TaskKind::Saccade
            | TaskKind::TouchFeedback
            | TaskKind::Touch => Some(RtDenominator::NamedPair("disGo", "Go")),
            TaskKind::Reach => Some(RtDenominator::Named("TargsOn")),
            TaskKind::Null => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Co => "CO",
            TaskKind::Lum => "Lum",
            TaskKind::GazeAnchor => "GazeAnchor",
            TaskKind::Saccade => "Saccade",
            TaskKind::TouchFeedback => "TouchFeedback",
            TaskKind::Touch => "Touch",
            TaskKind::Reach => "Reach",
            TaskKind::Null => "Null",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TaskKind {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "CO" => Ok(TaskKind::Co),
            "Lum" => Ok(TaskKind::Lum),
            "GazeAnchor" => Ok(TaskKind::GazeAnchor),
            "Saccade" => Ok(TaskKind::Saccade),
            "TouchFeedback" => Ok(TaskKind::TouchFeedback),
            "Touch" => Ok(TaskKind::Touch),
            "Reach" => Ok(TaskKind::Reach),
            "Null" => Ok(TaskKind::Null),
            other => Err(RasterError::UnknownTask {
                tag: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_order_is_complete() {
        assert_eq!(TaskKind::STACK_ORDER.len(), 8);
        assert_eq!(TaskKind::STACK_ORDER[0], TaskKind::Co);
        assert_eq!(TaskKind::STACK_ORDER[7], TaskKind::Touch);
    }

    #[test]
    fn test_co_swaps_events_for_neighbors() {
        let own = TaskKind::Co.align_events(EventPolicy::Own);
        let neighbor = TaskKind::Co.align_events(EventPolicy::Neighbor);
        assert_eq!(own, ("TargsOn", Some("disTargsOn")));
        assert_eq!(neighbor, ("disTargsOn", Some("TargsOn")));
    }

    #[test]
    fn test_non_co_tags_ignore_policy() {
        for task in TaskKind::STACK_ORDER {
            if task == TaskKind::Co {
                continue;
            }
            assert_eq!(
                task.align_events(EventPolicy::Own),
                task.align_events(EventPolicy::Neighbor)
            );
        }
    }

    #[test]
    fn test_reach_window_differs() {
        assert_eq!(TaskKind::Reach.window_ms(), (-400.0, 400.0));
        assert_eq!(TaskKind::Co.window_ms(), (-300.0, 500.0));
    }

    #[test]
    fn test_null_has_no_rt() {
        assert!(TaskKind::Null.rt_numerator().is_none());
        assert!(TaskKind::Null.rt_denominator().is_none());
    }

    #[test]
    fn test_tag_round_trip() {
        for task in TaskKind::STACK_ORDER {
            let parsed: TaskKind = task.to_string().parse().unwrap();
            assert_eq!(parsed, task);
        }
        assert!("Unknown".parse::<TaskKind>().is_err());
    }
}
