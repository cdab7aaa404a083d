//! # Unit Isolation
//!
//! Per-cluster isolation quality over time windows, and selection of the
//! isolated subset.
//!
//! A cluster is discriminable when its spikes' principal-component
//! projections on its best channel sit far from the same spikes'
//! projections on its low-energy worst channel. The scorer slices each
//! cluster's drift-corrected spike train into fixed windows and emits one
//! [`frame::IsolationFrame`] per window:
//!
//! ```text
//! score = |mean(signal PC1) - mean(noise PC1)| / std(noise PC1)
//! ```
//!
//! Verdicts start as `NotIsolated`; an external curation step flips frame
//! 0 of the clusters it accepts, and [`select::isolated_subset`] restricts
//! the spike stream to those clusters.

pub mod error;
pub mod frame;
pub mod score;
pub mod select;

pub use error::{IsolationError, Result};
pub use frame::{
    IsolationFrame, IsolationRecord, NeighborInfo, NeighborPcSnapshot, Verdict,
};
pub use score::{score_recording, IsolationParams};
pub use select::{isolated_clusters, isolated_subset, IsolatedSubset};
