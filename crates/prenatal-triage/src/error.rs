//! Errors raised at the edges of the triage library.
//!
//! The classifier itself never fails; these cover record entry, threshold
//! configuration and snapshot loading.

use thiserror::Error;

/// Errors that can occur outside the pure classification path
#[derive(Debug, Error)]
pub enum TriageError {
    /// A required form field was left empty
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// A form field could not be read as a number
    #[error("{field} must be a number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// A value is outside the range accepted for its field
    #[error("{field} out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    /// Clinical thresholds failed validation
    #[error("invalid clinical thresholds: {0}")]
    InvalidThresholds(String),

    /// No patient registered under this id
    #[error("unknown patient: {0}")]
    UnknownPatient(String),

    /// A notification sink refused a message
    #[error("notification failed: {0}")]
    Notification(String),

    /// Snapshot or threshold JSON could not be parsed
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a snapshot or threshold file failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
