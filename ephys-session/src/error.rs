//! Session-level error type aggregating the stage crates.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for session pipeline operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur while running the session pipeline.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Sorter-output model error
    #[error("Sorter output error: {0}")]
    Units(#[from] sorter_units::UnitsError),

    /// Timebase reprojection error
    #[error("Timebase error: {0}")]
    Timebase(#[from] probe_timebase::TimebaseError),

    /// Isolation scoring error
    #[error("Isolation error: {0}")]
    Isolation(#[from] unit_isolation::IsolationError),

    /// Raster construction error
    #[error("Raster error: {0}")]
    Raster(#[from] trial_rasters::RasterError),

    /// Stitching error
    #[error("Stitch error: {0}")]
    Stitch(#[from] session_stitch::StitchError),

    /// Invalid pipeline configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A required input artifact is missing
    #[error("Missing input artifact: {path}")]
    MissingArtifact {
        /// Expected location
        path: PathBuf,
    },

    /// Filesystem error
    #[error("IO error at {path}: {source}")]
    Io {
        /// Affected path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Container (de)serialization error
    #[error("Container serialization error at {path}: {reason}")]
    Container {
        /// Affected path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },
}

impl SessionError {
    /// Wrap an IO error with its path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
