//! Error types for timebase operations.

use thiserror::Error;

/// Result type for timebase operations.
pub type Result<T> = std::result::Result<T, TimebaseError>;

/// Errors that can occur while reprojecting spike times.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimebaseError {
    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {reason} (value: {value})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Offending value
        value: f64,
        /// Why the value is rejected
        reason: String,
    },

    /// Recording group with no members
    #[error("Recording group is empty")]
    EmptyGroup,

    /// Group members disagree on the probe sample rate
    #[error(
        "Recording {recording} samples at {rate} Hz but the group runs at {group_rate} Hz"
    )]
    MixedSampleRates {
        /// Offending recording id
        recording: String,
        /// Its sample rate
        rate: f64,
        /// Rate of the first group member
        group_rate: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TimebaseError::MixedSampleRates {
            recording: "rec2".to_string(),
            rate: 25_000.0,
            group_rate: 30_000.0,
        };
        assert!(err.to_string().contains("rec2"));
        assert!(err.to_string().contains("25000"));
    }
}
