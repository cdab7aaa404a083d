//! # Trial Rasters
//!
//! Behavioral trial model and trial-aligned spike rasters.
//!
//! Trials carry a task tag and a map from event name to behavioral time;
//! a missing event is absent from the map, never an exception. Each task
//! tag fixes its alignment event (with fallback), peri-event window, and
//! reaction-time definition in the [`task::TaskKind`] sum type, so the
//! builder is one code path over all tags.
//!
//! For every cluster the builder emits its own raster stacked across all
//! task types in a fixed order, plus one raster per neighbor cluster on
//! the same best channel. Neighbor rasters swap the CO primary/fallback
//! alignment pair, matching the asymmetry of the curation workflow this
//! feeds.

pub mod error;
pub mod raster;
pub mod task;
pub mod trial;

pub use error::{RasterError, Result};
pub use raster::{
    build_cluster_raster, build_task_raster, ClusterRaster, NeighborRaster,
    RasterParams, TaskRaster, TrialSlice,
};
pub use task::{EventPolicy, RtDenominator, TaskKind};
pub use trial::{Trial, TrialStore};
