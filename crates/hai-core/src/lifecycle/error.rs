//! Error types for the candidate lifecycle.

use hai_domain::{CandidateStatus, DomainError, HaiType};
use hai_state::StorageError;

/// Errors produced by the lifecycle manager.
///
/// Conflict variants are returned before anything is written. Storage
/// failures name the operation that failed; the two partial variants say
/// exactly which writes landed.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("candidate not found: {0}")]
    CandidateNotFound(String),

    #[error("review not found: {0}")]
    ReviewNotFound(String),

    #[error("candidate {candidate_id} is already under review ({review_id})")]
    AlreadyUnderReview {
        candidate_id: String,
        review_id: String,
    },

    #[error("candidate {candidate_id} is already {status}")]
    AlreadyTerminal {
        candidate_id: String,
        status: CandidateStatus,
    },

    #[error("review {0} is already completed")]
    ReviewClosed(String),

    #[error("candidate {candidate_id} has open review {review_id}; complete it instead")]
    ReviewOpen {
        candidate_id: String,
        review_id: String,
    },

    #[error("candidate {candidate_id} needs a completed review before it can be {action}")]
    ReviewRequired {
        candidate_id: String,
        action: &'static str,
    },

    #[error("decision for {found} submitted to {expected} candidate {candidate_id}")]
    HaiTypeMismatch {
        candidate_id: String,
        expected: HaiType,
        found: HaiType,
    },

    #[error("candidate {candidate_id} already has event {event_id}; it cannot be rejected")]
    EventExists {
        candidate_id: String,
        event_id: String,
    },

    /// Extraction records or an external classification payload were
    /// rejected before anything was written.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure during {op}: {source}")]
    Persistence {
        op: &'static str,
        #[source]
        source: StorageError,
    },

    /// The event is durable but the candidate status write failed.
    /// Re-running finalize is safe and completes the transition.
    #[error("event {event_id} saved for candidate {candidate_id} but status update failed: {source}")]
    PartialFinalization {
        candidate_id: String,
        event_id: String,
        #[source]
        source: StorageError,
    },

    /// The review was closed but finalizing the candidate failed.
    #[error("review {review_id} completed but finalization failed: {source}")]
    FinalizeAfterReview {
        review_id: String,
        #[source]
        source: Box<LifecycleError>,
    },
}

impl LifecycleError {
    pub(crate) fn storage(op: &'static str, source: StorageError) -> Self {
        match source {
            StorageError::CandidateNotFound { candidate_id } => Self::CandidateNotFound(candidate_id),
            StorageError::ReviewNotFound { review_id } => Self::ReviewNotFound(review_id),
            StorageError::ReviewAlreadyOpen {
                candidate_id,
                review_id,
            } => Self::AlreadyUnderReview {
                candidate_id,
                review_id,
            },
            StorageError::ReviewClosed { review_id } => Self::ReviewClosed(review_id),
            source => Self::Persistence { op, source },
        }
    }

    /// Whether the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Persistence { source, .. } => source.is_retryable(),
            Self::PartialFinalization { .. } => true,
            Self::FinalizeAfterReview { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;
