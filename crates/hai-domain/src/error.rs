//! Error taxonomy for the surveillance data model.

use crate::decision::HaiType;

/// Errors produced while loading reference tables, converting external
/// payloads, or assembling case data.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invalid reference table {version:?}: {reason}")]
    InvalidReferenceTable { version: String, reason: String },

    #[error("invalid classification payload: {0}")]
    InvalidPayload(String),

    #[error("extraction record {record_id} carries {found} data, expected {expected}")]
    HaiTypeMismatch {
        record_id: String,
        expected: HaiType,
        found: HaiType,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for domain operations.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
