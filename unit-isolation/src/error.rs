//! Error types for isolation scoring.

use thiserror::Error;

/// Result type for isolation operations.
pub type Result<T> = std::result::Result<T, IsolationError>;

/// Errors that can occur while scoring cluster isolation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IsolationError {
    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {reason} (value: {value})")]
    InvalidParameter {
        parameter: String,
        value: f64,
        reason: String,
    },

    /// Cluster missing from the channel table
    #[error("Cluster {cluster} has no channel selection")]
    MissingChannels { cluster: i32 },

    /// Partition index/time vectors disagree
    #[error("Partition index/time length mismatch: {indices} indices, {times} times")]
    PartitionMismatch { indices: usize, times: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IsolationError::MissingChannels { cluster: 42 };
        assert!(err.to_string().contains("42"));
    }
}
