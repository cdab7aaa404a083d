//! Error types for the sorter-output model.

use thiserror::Error;

/// Result type for sorter-unit operations.
pub type Result<T> = std::result::Result<T, UnitsError>;

/// Errors that can occur while handling sorter output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitsError {
    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {reason} (value: {value})")]
    InvalidParameter {
        parameter: String,
        value: f64,
        reason: String,
    },

    /// Array length mismatch between per-spike fields
    #[error("Spike field length mismatch for {field}: expected {expected}, got {actual}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// Template id referenced by a spike is out of range
    #[error("Template id {template} out of range (templates: {n_templates})")]
    TemplateOutOfRange { template: i32, n_templates: usize },

    /// Cluster id not present in the catalog
    #[error("Unknown cluster {cluster}")]
    UnknownCluster { cluster: i32 },

    /// Quality label string did not parse
    #[error("Unknown quality label: {label:?}")]
    UnknownQualityLabel { label: String },

    /// Malformed quality table row
    #[error("Malformed quality table at line {line}: {reason}")]
    MalformedQualityRow { line: usize, reason: String },
}
