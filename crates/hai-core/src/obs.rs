//! Structured observability hooks for the candidate lifecycle.
//!
//! Every state change emits one `info!` event with an `event` field naming
//! it (`candidate.classified`, `review.enqueued`, ...). Storage failures are
//! logged with their retry class before being returned to the caller.

use tracing::{info, warn};

use hai_domain::{
    CandidateId, CandidateStatus, ClassificationDecision, HaiType, NhsnEvent, QueueType,
    ReviewDecision, ReviewId,
};
use hai_state::{FailureClass, StorageError};

/// RAII guard entering a span tagged with the candidate for the duration of
/// a lifecycle operation.
pub struct CandidateSpan {
    _span: tracing::span::EnteredSpan,
}

impl CandidateSpan {
    pub fn enter(candidate_id: &CandidateId, hai_type: HaiType) -> Self {
        let span = tracing::info_span!(
            "hai.candidate",
            candidate_id = %candidate_id,
            hai_type = %hai_type,
        );
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_candidate_registered(candidate_id: &CandidateId, hai_type: HaiType) {
    info!(event = "candidate.registered", candidate_id = %candidate_id, hai_type = %hai_type);
}

/// A decision was appended to the candidate's history.
pub fn emit_candidate_classified(candidate_id: &CandidateId, decision: &ClassificationDecision) {
    info!(
        event = "candidate.classified",
        candidate_id = %candidate_id,
        decision = %decision.decision,
        classification = decision.classification.label(),
        confidence = %decision.confidence,
        missing_fields = decision.missing_fields.len(),
    );
}

pub fn emit_review_enqueued(
    candidate_id: &CandidateId,
    review_id: &ReviewId,
    queue: QueueType,
    reason: &str,
) {
    info!(
        event = "review.enqueued",
        candidate_id = %candidate_id,
        review_id = %review_id,
        queue = %queue,
        reason = %reason,
    );
}

pub fn emit_review_completed(review_id: &ReviewId, reviewer: &str, decision: ReviewDecision) {
    info!(
        event = "review.completed",
        review_id = %review_id,
        reviewer = %reviewer,
        decision = %decision,
    );
}

pub fn emit_candidate_finalized(candidate_id: &CandidateId, status: CandidateStatus, by: &str) {
    info!(
        event = "candidate.finalized",
        candidate_id = %candidate_id,
        status = %status,
        by = %by,
    );
}

pub fn emit_event_created(event: &NhsnEvent) {
    info!(
        event = "event.created",
        candidate_id = %event.candidate_id,
        event_id = %event.id,
        hai_type = %event.hai_type,
        event_date = ?event.event_date,
    );
}

/// Storage call failed (warning for retryable, error for permanent).
pub fn emit_persistence_failure(op: &str, error: &StorageError) {
    match error.class() {
        FailureClass::Retryable => {
            warn!(event = "storage.failed", op = %op, retryable = true, error = %error)
        }
        FailureClass::Permanent => {
            tracing::error!(event = "storage.failed", op = %op, retryable = false, error = %error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_span_create() {
        let _span = CandidateSpan::enter(&CandidateId::from("c-1"), HaiType::Vae);
    }
}
