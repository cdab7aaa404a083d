//! Error types for the raster builder.

use thiserror::Error;

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;

/// Errors that can occur while building trial-aligned rasters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    /// Invalid alignment window
    #[error("Invalid raster window [{left}, {right}] ms: {reason}")]
    InvalidWindow {
        left: f64,
        right: f64,
        reason: String,
    },

    /// Task tag string did not parse
    #[error("Unknown task tag: {tag:?}")]
    UnknownTask { tag: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RasterError::InvalidWindow {
            left: 500.0,
            right: -300.0,
            reason: "left bound exceeds right bound".to_string(),
        };
        assert!(err.to_string().contains("500"));
    }
}
