use thiserror::Error;

/// Errors produced while interpreting domain values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Invalid time of day: {0} (expected HH:MM)")]
    InvalidTime(String),

    /// Stored vital columns do not match the shape required by its type.
    #[error("Inconsistent {kind} reading: {reason}")]
    InconsistentVital { kind: &'static str, reason: String },
}
