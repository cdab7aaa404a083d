//! Error types for cross-recording stitching.

use thiserror::Error;

/// Result type for stitching operations.
pub type Result<T> = std::result::Result<T, StitchError>;

/// Errors that can occur while stitching clusters across recordings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StitchError {
    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {reason} (value: {value})")]
    InvalidParameter {
        parameter: String,
        value: f64,
        reason: String,
    },

    /// Probe geometry has no electrode entry for a channel
    #[error("Channel {channel} is not in the probe geometry")]
    UnknownChannel { channel: i32 },

    /// Scope filter referenced a cluster absent from its recording's catalog
    #[error("Cluster {cluster} is not in the catalog of recording {recording}")]
    UnknownCluster { recording: String, cluster: i32 },

    /// Stitching needs at least two recordings
    #[error("Stitching needs at least 2 recordings, got {count}")]
    TooFewRecordings { count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StitchError::UnknownCluster {
            recording: "rec3".to_string(),
            cluster: 17,
        };
        assert!(err.to_string().contains("rec3"));
        assert!(err.to_string().contains("17"));
    }
}
