//! # Sorter Units
//!
//! In-memory model of a spike sorter's per-recording output and the
//! channel-selection step every downstream stage depends on.
//!
//! The sorter assigns millions of detected spikes to clusters (putative
//! single neurons), fits a template waveform per cluster, and projects
//! each spike into a small principal-component subspace on a handful of
//! local channels. This crate holds that output read-only and derives:
//!
//! - **Quality labels**: the curation table (`noise`/`mua`/`good`/`unsorted`)
//! - **Channel selection**: per cluster, a *best* channel (peak template
//!   energy, guarded by PC coverage) and a *worst* channel (low-energy
//!   noise reference)
//! - **Catalog summaries**: cluster/spike/label counts per recording
//!
//! ## Example
//!
//! ```rust,ignore
//! use sorter_units::{assign_channels, ChannelSelectParams, SorterOutput};
//!
//! let out: SorterOutput = load_recording()?;
//! out.validate()?;
//! let channels = assign_channels(&out, &ChannelSelectParams::default())?;
//! for (cluster, sel) in &channels {
//!     println!("cluster {} peaks on channel {}", cluster, sel.best_channel);
//! }
//! ```

pub mod channels;
pub mod error;
pub mod model;
pub mod quality;

pub use channels::{
    assign_channels, neighbors_on_best_channel, select_for_cluster,
    ChannelSelectParams, ChannelSelection,
};
pub use error::{Result, UnitsError};
pub use model::{CatalogStats, SorterOutput};
pub use quality::{parse_quality_table, QualityLabel};
