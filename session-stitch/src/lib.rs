//! # Session Stitch
//!
//! Cross-recording neuron identity for multi-recording sessions.
//!
//! The same neuron recorded twice on a chronically implanted probe keeps
//! (approximately) its electrode, its template waveform, and its
//! peri-event firing-rate profile. The stitcher exploits all three:
//!
//! 1. For every candidate channel, gather the clusters whose best channel
//!    lies within an electrode neighborhood of it, per recording.
//! 2. Match a seed cluster to the foreign candidate whose rate curve
//!    correlates best, accepting only when both the rate and waveform
//!    correlations clear their thresholds.
//! 3. Deduplicate candidate rows, keep rows disjoint, and drop neurons
//!    found in too few recordings.
//!
//! The result is one [`stitch::StitchRow`] per tracked neuron: its
//! cluster id in each recording of the session, or `None` where it was
//! not found.

pub mod corr;
pub mod error;
pub mod geometry;
pub mod rate;
pub mod stitch;

pub use corr::{nan_to_neg_inf, pearson};
pub use error::{Result, StitchError};
pub use geometry::ProbeGeometry;
pub use rate::{rate_curve, sorted_cross_task_slices, RateParams};
pub use stitch::{
    ClusterEntry, ClusterScope, RecordingCatalog, StitchContext, StitchParams,
    StitchRow, StitchTable,
};
