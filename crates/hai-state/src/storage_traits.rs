//! Storage trait for the surveillance lifecycle.
//!
//! The lifecycle manager is generic over `SurveillanceStore`; concrete
//! backends live outside this workspace. [`crate::fakes`] provides an
//! in-memory implementation for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hai_domain::{
    Candidate, CandidateId, CandidateStatus, DecisionEntry, NhsnEvent, QueueType, Review,
    ReviewDecision, ReviewId,
};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Terminal data written when a review is completed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCompletion {
    pub reviewer: String,
    pub decision: ReviewDecision,
    pub notes: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Persistence contract for candidates, reviews and reportable events.
///
/// Each call is atomic on its own; callers that need several calls to
/// appear atomic must serialize them per candidate.
#[async_trait]
pub trait SurveillanceStore: Send + Sync {
    /// Store a new candidate. Fails with `CandidateExists` on id reuse.
    async fn insert_candidate(&self, candidate: Candidate) -> StorageResult<()>;

    async fn get_candidate(&self, id: &CandidateId) -> StorageResult<Candidate>;

    /// Append to the candidate's decision history.
    async fn append_decision(&self, id: &CandidateId, entry: DecisionEntry) -> StorageResult<()>;

    async fn update_candidate_status(
        &self,
        id: &CandidateId,
        status: CandidateStatus,
        at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// List candidates, optionally filtered by status, oldest first.
    async fn list_candidates(&self, status: Option<CandidateStatus>)
        -> StorageResult<Vec<Candidate>>;

    /// Store a new open review. Fails with `ReviewAlreadyOpen` when the
    /// candidate already has one.
    async fn open_review(&self, review: Review) -> StorageResult<()>;

    async fn get_review(&self, id: &ReviewId) -> StorageResult<Review>;

    /// The open review for a candidate, if any.
    async fn open_review_for(&self, candidate_id: &CandidateId) -> StorageResult<Option<Review>>;

    /// Every review ever opened for a candidate, oldest first.
    async fn reviews_for(&self, candidate_id: &CandidateId) -> StorageResult<Vec<Review>>;

    async fn assign_review(&self, id: &ReviewId, reviewer: &str) -> StorageResult<Review>;

    /// Mark a review terminal. Fails with `ReviewClosed` if already completed.
    async fn complete_review(
        &self,
        id: &ReviewId,
        completion: ReviewCompletion,
    ) -> StorageResult<Review>;

    /// Open reviews, optionally for one queue, oldest first.
    async fn get_pending_reviews(&self, queue: Option<QueueType>) -> StorageResult<Vec<Review>>;

    /// Store a reportable event. Fails with `EventExists` when the candidate
    /// already has one.
    async fn save_event(&self, event: NhsnEvent) -> StorageResult<()>;

    async fn get_event_for_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> StorageResult<Option<NhsnEvent>>;
}
