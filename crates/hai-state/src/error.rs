//! Error types for hai-state

use thiserror::Error;

/// Whether a failed storage call may succeed if the caller tries again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    Retryable,
    Permanent,
}

/// Errors returned by `SurveillanceStore` implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("candidate not found: {candidate_id}")]
    CandidateNotFound { candidate_id: String },

    #[error("review not found: {review_id}")]
    ReviewNotFound { review_id: String },

    #[error("candidate already exists: {candidate_id}")]
    CandidateExists { candidate_id: String },

    #[error("candidate {candidate_id} already has open review {review_id}")]
    ReviewAlreadyOpen {
        candidate_id: String,
        review_id: String,
    },

    #[error("review {review_id} is already completed")]
    ReviewClosed { review_id: String },

    #[error("event {event_id} already exists for candidate {candidate_id}")]
    EventExists {
        candidate_id: String,
        event_id: String,
    },

    /// Backend unreachable or timed out.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the write (constraint, permissions).
    #[error("write rejected: {0}")]
    WriteRejected(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl StorageError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Unavailable(_) => FailureClass::Retryable,
            _ => FailureClass::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == FailureClass::Retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(StorageError::Unavailable("timeout".into()).is_retryable());
        assert_eq!(
            StorageError::WriteRejected("constraint".into()).class(),
            FailureClass::Permanent
        );
        assert!(!StorageError::CandidateNotFound {
            candidate_id: "c".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_event_exists_display() {
        let err = StorageError::EventExists {
            candidate_id: "c-1".into(),
            event_id: "e-1".into(),
        };
        assert_eq!(err.to_string(), "event e-1 already exists for candidate c-1");
    }
}
