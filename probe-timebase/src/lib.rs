//! # Probe Timebase
//!
//! Clock models and drift-corrected spike-time reprojection for
//! high-density probe recordings.
//!
//! A session's spike times exist in three clocks:
//!
//! 1. **Probe clock**: the acquisition sample counter
//! 2. **Auxiliary clock**: the synchronization stream the drift model is
//!    fitted against
//! 3. **Behavioral clock**: the common axis shared with trial events
//!
//! Each hop is an affine correction `(intercept, slope)` fitted upstream.
//! When several recordings of one session are sorted as a single
//! concatenated block, the reprojector also splits the stream back into
//! per-recording partitions by cumulative probe-clock offset.
//!
//! ## Example
//!
//! ```rust
//! use probe_timebase::{AffineModel, Recording, reproject_recording};
//!
//! let rec = Recording {
//!     id: "rec0".to_string(),
//!     duration_samples: 30_000,
//!     sample_rate: 30_000.0,
//!     probe_to_aux: AffineModel::identity(),
//!     aux_to_behavioral: Some(AffineModel::new(0.02, 1.0001)),
//! };
//! let out = reproject_recording(&[15_000], &rec).unwrap();
//! assert!(out.aligned);
//! assert!((out.times_s[0] - (0.02 + 1.0001 * 0.5)).abs() < 1e-12);
//! ```

#![deny(missing_docs)]

pub mod clock;
pub mod error;
pub mod recording;
pub mod reproject;

pub use clock::AffineModel;
pub use error::{Result, TimebaseError};
pub use recording::{Recording, RecordingGroup};
pub use reproject::{reproject_group, reproject_recording, RecordingSpikes};
