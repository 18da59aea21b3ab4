//! Candidate and review lifecycle manager.
//!
//! ```text
//! NEW -> PENDING_CLASSIFICATION -> CONFIRMED | REJECTED          (policy accepts)
//!                               -> PENDING_REVIEW -> CONFIRMED | REJECTED
//!                                                 -> PENDING_CLASSIFICATION (needs more info)
//! ```
//!
//! Every mutation of a candidate runs under that candidate's lock, so
//! concurrent callers observe the read-evaluate-write sequence as one step.
//!
//! Writes that span two records are ordered so a failure part way leaves a
//! state the next call can complete: the review is opened before the status
//! moves to `PENDING_REVIEW`, and the NHSN event is saved before the status
//! moves to `CONFIRMED`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, instrument};

use hai_domain::{
    Candidate, CandidateId, CandidateStatus, CaseData, ClassificationDecision,
    ClassificationPayload, DecisionEntry, ExtractionRecord, HaiType, NhsnEvent, QueueType, Review,
    ReviewDecision, ReviewId,
};
use hai_state::{ReviewCompletion, StorageError, SurveillanceStore};

use super::clock::{Clock, SystemClock};
use super::error::{LifecycleError, LifecycleResult};
use super::locks::CandidateLocks;
use super::policy::{Acceptance, AcceptancePolicy};
use crate::criteria::SurveillanceEngine;
use crate::metrics::METRICS;
use crate::normalize::normalize;
use crate::obs::{self, CandidateSpan};

/// Reviewer recorded on events confirmed by the acceptance policy.
pub const ENGINE_REVIEWER: &str = "criteria-engine";

/// Result of submitting a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The policy accepted a confirmed decision.
    Confirmed { event: NhsnEvent },
    /// The policy accepted a rejection.
    Rejected,
    QueuedForReview { review: Review },
    /// A review was already open; the decision was appended to the history
    /// and the reviewer decides.
    RecordedUnderReview { review_id: ReviewId },
}

/// Result of finalizing a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    /// `event_created` is false when the event already existed.
    Confirmed {
        event: NhsnEvent,
        event_created: bool,
    },
    Rejected,
    /// Back in `PENDING_CLASSIFICATION` until new extraction input arrives.
    AwaitingInformation,
}

/// A closed review and what it did to the candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedReview {
    pub review: Review,
    pub outcome: FinalizeOutcome,
}

/// Drives candidates through classification, review and finalization.
pub struct LifecycleManager<S: SurveillanceStore> {
    store: Arc<S>,
    engine: SurveillanceEngine,
    policy: AcceptancePolicy,
    clock: Arc<dyn Clock>,
    locks: CandidateLocks,
}

impl<S: SurveillanceStore> LifecycleManager<S> {
    /// Manager with the standard acceptance policy and the system clock.
    pub fn new(store: Arc<S>, engine: SurveillanceEngine) -> Self {
        Self {
            store,
            engine,
            policy: AcceptancePolicy::standard(),
            clock: Arc::new(SystemClock),
            locks: CandidateLocks::new(),
        }
    }

    pub fn with_policy(mut self, policy: AcceptancePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    pub fn engine(&self) -> &SurveillanceEngine {
        &self.engine
    }

    // ------------------------------------------------------------------
    // Candidates
    // ------------------------------------------------------------------

    #[instrument(skip_all, fields(hai_type = %hai_type))]
    pub async fn register_candidate(
        &self,
        hai_type: HaiType,
        patient_ref: &str,
    ) -> LifecycleResult<Candidate> {
        let candidate = Candidate::new(hai_type, patient_ref, self.clock.now());
        self.store
            .insert_candidate(candidate.clone())
            .await
            .map_err(|e| failure("insert_candidate", e))?;
        obs::emit_candidate_registered(&candidate.id, hai_type);
        Ok(candidate)
    }

    pub async fn get_candidate(&self, id: &CandidateId) -> LifecycleResult<Candidate> {
        self.store
            .get_candidate(id)
            .await
            .map_err(|e| failure("get_candidate", e))
    }

    /// Record a decision for a candidate and act on it.
    ///
    /// The decision is always appended to the history first. With no review
    /// open, the acceptance policy then either finalizes the candidate or
    /// queues it for review.
    #[instrument(skip_all, fields(candidate_id = %id, decision = %decision.decision))]
    pub async fn submit_decision(
        &self,
        id: &CandidateId,
        decision: ClassificationDecision,
    ) -> LifecycleResult<Transition> {
        let _guard = self.locks.acquire(id).await;
        let candidate = self.get_candidate(id).await?;
        if decision.hai_type != candidate.hai_type {
            return Err(LifecycleError::HaiTypeMismatch {
                candidate_id: id.to_string(),
                expected: candidate.hai_type,
                found: decision.hai_type,
            });
        }
        if candidate.status.is_terminal() {
            return Err(terminal(&candidate));
        }

        let now = self.clock.now();
        self.store
            .append_decision(id, DecisionEntry::new(decision.clone(), now)?)
            .await
            .map_err(|e| failure("append_decision", e))?;
        METRICS.inc_decisions();
        obs::emit_candidate_classified(id, &decision);

        if let Some(open) = self.open_review(id).await? {
            if candidate.status != CandidateStatus::PendingReview {
                self.set_status(id, CandidateStatus::PendingReview).await?;
            }
            return Ok(Transition::RecordedUnderReview { review_id: open.id });
        }
        if candidate.status == CandidateStatus::New {
            self.set_status(id, CandidateStatus::PendingClassification)
                .await?;
        }

        match self.policy.evaluate(&decision) {
            Acceptance::Confirm => {
                let candidate = self.get_candidate(id).await?;
                let (event, _) = self.confirm(&candidate, ENGINE_REVIEWER).await?;
                Ok(Transition::Confirmed { event })
            }
            Acceptance::Reject => {
                self.finalize_locked(id, ReviewDecision::Rejected, ENGINE_REVIEWER)
                    .await?;
                Ok(Transition::Rejected)
            }
            Acceptance::Review { queue, reason } => {
                let review = self.enqueue_locked(id, queue, &reason).await?;
                Ok(Transition::QueuedForReview { review })
            }
        }
    }

    /// Run the engine for the candidate's HAI type and submit the result.
    pub async fn classify_candidate(
        &self,
        id: &CandidateId,
        case: &CaseData,
    ) -> LifecycleResult<Transition> {
        let decision = {
            let _span = CandidateSpan::enter(id, case.hai_type());
            self.engine.classify(case)
        };
        self.submit_decision(id, decision).await
    }

    /// Normalize extraction records into case data, then classify.
    pub async fn classify_records(
        &self,
        id: &CandidateId,
        records: &[ExtractionRecord],
    ) -> LifecycleResult<Transition> {
        let candidate = self.get_candidate(id).await?;
        let case = normalize(candidate.hai_type, records)?;
        self.classify_candidate(id, &case).await
    }

    /// Submit a decision produced outside the engines, e.g. by the
    /// extraction collaborator's own classifier.
    pub async fn submit_payload(
        &self,
        id: &CandidateId,
        payload: ClassificationPayload,
    ) -> LifecycleResult<Transition> {
        let candidate = self.get_candidate(id).await?;
        let decision =
            payload.into_decision(candidate.hai_type, &self.engine.tables().version)?;
        self.submit_decision(id, decision).await
    }

    // ------------------------------------------------------------------
    // Reviews
    // ------------------------------------------------------------------

    /// Open a review for a candidate.
    ///
    /// # Errors
    ///
    /// `AlreadyUnderReview` if a review is open, `AlreadyTerminal` if the
    /// candidate is confirmed or rejected. Nothing is written in either case.
    #[instrument(skip_all, fields(candidate_id = %id, queue = %queue))]
    pub async fn enqueue_for_review(
        &self,
        id: &CandidateId,
        queue: QueueType,
    ) -> LifecycleResult<Review> {
        let _guard = self.locks.acquire(id).await;
        self.enqueue_locked(id, queue, "requested").await
    }

    pub async fn assign_review(&self, review_id: &ReviewId, reviewer: &str) -> LifecycleResult<Review> {
        let review = self
            .store
            .assign_review(review_id, reviewer)
            .await
            .map_err(|e| failure("assign_review", e))?;
        debug!(review_id = %review_id, reviewer = %reviewer, "review assigned");
        Ok(review)
    }

    /// Close a review with the reviewer's verdict and apply it to the
    /// candidate.
    ///
    /// # Errors
    ///
    /// `ReviewClosed` if the review was already completed. If the review is
    /// closed but the candidate transition fails, `FinalizeAfterReview`
    /// wraps the cause; `finalize_candidate` with the same verdict completes
    /// the transition.
    #[instrument(skip_all, fields(review_id = %review_id, decision = %decision))]
    pub async fn complete_review(
        &self,
        review_id: &ReviewId,
        reviewer: &str,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> LifecycleResult<CompletedReview> {
        let review = self
            .store
            .get_review(review_id)
            .await
            .map_err(|e| failure("get_review", e))?;
        let _guard = self.locks.acquire(&review.candidate_id).await;
        if !review.is_open() {
            return Err(LifecycleError::ReviewClosed(review_id.to_string()));
        }
        let candidate = self.get_candidate(&review.candidate_id).await?;
        if candidate.status.is_terminal() {
            return Err(terminal(&candidate));
        }

        let completion = ReviewCompletion {
            reviewer: reviewer.to_string(),
            decision,
            notes,
            completed_at: self.clock.now(),
        };
        let review = self
            .store
            .complete_review(review_id, completion)
            .await
            .map_err(|e| failure("complete_review", e))?;
        METRICS.inc_reviews_completed();
        obs::emit_review_completed(review_id, reviewer, decision);

        match self
            .finalize_locked(&review.candidate_id, decision, reviewer)
            .await
        {
            Ok(outcome) => Ok(CompletedReview { review, outcome }),
            Err(source) => Err(LifecycleError::FinalizeAfterReview {
                review_id: review_id.to_string(),
                source: Box::new(source),
            }),
        }
    }

    /// Apply a final verdict to a candidate.
    ///
    /// A verdict is accepted when the acceptance policy accepts the current
    /// decision or a completed review reached the same verdict.
    /// `NeedsMoreInfo` needs neither. Confirming an already confirmed
    /// candidate returns the existing event.
    ///
    /// # Errors
    ///
    /// `ReviewOpen` while a review is open, `ReviewRequired` without policy
    /// or review backing, `AlreadyTerminal` for any other change to a
    /// confirmed or rejected candidate. `PartialFinalization` means the
    /// event is saved but the status is not; calling again completes it.
    #[instrument(skip_all, fields(candidate_id = %id, decision = %decision))]
    pub async fn finalize_candidate(
        &self,
        id: &CandidateId,
        decision: ReviewDecision,
        reviewer: &str,
    ) -> LifecycleResult<FinalizeOutcome> {
        let _guard = self.locks.acquire(id).await;
        let candidate = self.get_candidate(id).await?;

        let repeat_confirm = candidate.status == CandidateStatus::Confirmed
            && decision == ReviewDecision::Confirmed;
        if candidate.status.is_terminal() && !repeat_confirm {
            return Err(terminal(&candidate));
        }
        if let Some(open) = self.open_review(id).await? {
            return Err(LifecycleError::ReviewOpen {
                candidate_id: id.to_string(),
                review_id: open.id.to_string(),
            });
        }
        if !repeat_confirm && !self.is_backed(&candidate, decision).await? {
            return Err(LifecycleError::ReviewRequired {
                candidate_id: id.to_string(),
                action: match decision {
                    ReviewDecision::Confirmed => "confirmed",
                    _ => "rejected",
                },
            });
        }

        self.finalize_locked(id, decision, reviewer).await
    }

    // ------------------------------------------------------------------
    // Read-only views
    // ------------------------------------------------------------------

    pub async fn get_pending_reviews(&self, queue: Option<QueueType>) -> LifecycleResult<Vec<Review>> {
        self.store
            .get_pending_reviews(queue)
            .await
            .map_err(|e| failure("get_pending_reviews", e))
    }

    /// Open reviews per queue; every queue is present, empty ones with 0.
    pub async fn get_queue_counts(&self) -> LifecycleResult<BTreeMap<QueueType, usize>> {
        let mut counts: BTreeMap<QueueType, usize> = [
            QueueType::Clabsi,
            QueueType::Ssi,
            QueueType::Vae,
            QueueType::ConflictingEvidence,
        ]
        .into_iter()
        .map(|q| (q, 0))
        .collect();
        for review in self.get_pending_reviews(None).await? {
            *counts.entry(review.queue_type).or_default() += 1;
        }
        Ok(counts)
    }

    /// Candidates sent back for more information whose status has not
    /// changed for longer than `max_age`.
    pub async fn stalled_candidates(&self, max_age: Duration) -> LifecycleResult<Vec<Candidate>> {
        let now = self.clock.now();
        let waiting = self
            .store
            .list_candidates(Some(CandidateStatus::PendingClassification))
            .await
            .map_err(|e| failure("list_candidates", e))?;

        let mut stalled = Vec::new();
        for candidate in waiting {
            if now - candidate.status_changed_at <= max_age {
                continue;
            }
            let reviews = self
                .store
                .reviews_for(&candidate.id)
                .await
                .map_err(|e| failure("reviews_for", e))?;
            let sent_back = reviews
                .last()
                .is_some_and(|r| r.decision == Some(ReviewDecision::NeedsMoreInfo));
            if sent_back {
                stalled.push(candidate);
            }
        }
        Ok(stalled)
    }

    // ------------------------------------------------------------------
    // Internals (caller holds the candidate lock)
    // ------------------------------------------------------------------

    async fn open_review(&self, id: &CandidateId) -> LifecycleResult<Option<Review>> {
        self.store
            .open_review_for(id)
            .await
            .map_err(|e| failure("open_review_for", e))
    }

    async fn set_status(&self, id: &CandidateId, status: CandidateStatus) -> LifecycleResult<()> {
        self.store
            .update_candidate_status(id, status, self.clock.now())
            .await
            .map_err(|e| failure("update_candidate_status", e))
    }

    async fn is_backed(&self, candidate: &Candidate, decision: ReviewDecision) -> LifecycleResult<bool> {
        if decision == ReviewDecision::NeedsMoreInfo {
            return Ok(true);
        }
        let by_policy = candidate.current_decision().map(|entry| self.policy.evaluate(&entry.decision));
        let policy_agrees = matches!(
            (by_policy, decision),
            (Some(Acceptance::Confirm), ReviewDecision::Confirmed)
                | (Some(Acceptance::Reject), ReviewDecision::Rejected)
        );
        if policy_agrees {
            return Ok(true);
        }
        let reviews = self
            .store
            .reviews_for(&candidate.id)
            .await
            .map_err(|e| failure("reviews_for", e))?;
        Ok(reviews
            .last()
            .is_some_and(|r| r.decision == Some(decision)))
    }

    async fn enqueue_locked(
        &self,
        id: &CandidateId,
        queue: QueueType,
        reason: &str,
    ) -> LifecycleResult<Review> {
        let candidate = self.get_candidate(id).await?;
        if candidate.status.is_terminal() {
            return Err(terminal(&candidate));
        }

        let review = Review::open(id.clone(), queue, self.clock.now());
        self.store
            .open_review(review.clone())
            .await
            .map_err(|e| failure("open_review", e))?;
        // A failure here leaves the review open; the next submission for
        // this candidate repairs the status.
        self.set_status(id, CandidateStatus::PendingReview).await?;

        METRICS.inc_reviews_enqueued();
        obs::emit_review_enqueued(id, &review.id, queue, reason);
        Ok(review)
    }

    async fn finalize_locked(
        &self,
        id: &CandidateId,
        decision: ReviewDecision,
        reviewer: &str,
    ) -> LifecycleResult<FinalizeOutcome> {
        let candidate = self.get_candidate(id).await?;
        match decision {
            ReviewDecision::Confirmed => {
                let (event, event_created) = self.confirm(&candidate, reviewer).await?;
                Ok(FinalizeOutcome::Confirmed {
                    event,
                    event_created,
                })
            }
            ReviewDecision::Rejected => {
                if candidate.status.is_terminal() {
                    return Err(terminal(&candidate));
                }
                if let Some(event) = self.existing_event(id).await? {
                    return Err(LifecycleError::EventExists {
                        candidate_id: id.to_string(),
                        event_id: event.id.to_string(),
                    });
                }
                self.set_status(id, CandidateStatus::Rejected).await?;
                obs::emit_candidate_finalized(id, CandidateStatus::Rejected, reviewer);
                Ok(FinalizeOutcome::Rejected)
            }
            ReviewDecision::NeedsMoreInfo => {
                if candidate.status.is_terminal() {
                    return Err(terminal(&candidate));
                }
                self.set_status(id, CandidateStatus::PendingClassification)
                    .await?;
                debug!(candidate_id = %id, "candidate awaiting more information");
                Ok(FinalizeOutcome::AwaitingInformation)
            }
        }
    }

    /// Save the event (or find the existing one), then mark the candidate
    /// confirmed. Returns the event and whether this call created it.
    async fn confirm(
        &self,
        candidate: &Candidate,
        reviewer: &str,
    ) -> LifecycleResult<(NhsnEvent, bool)> {
        if candidate.status == CandidateStatus::Rejected {
            return Err(terminal(candidate));
        }
        let id = &candidate.id;

        let (event, event_created) = match self.existing_event(id).await? {
            Some(event) => (event, false),
            None => {
                let event = NhsnEvent::from_decision(
                    id.clone(),
                    candidate.hai_type,
                    candidate.current_decision().map(|entry| &entry.decision),
                    reviewer,
                    self.clock.now(),
                )?;
                match self.store.save_event(event.clone()).await {
                    Ok(()) => {
                        METRICS.inc_events_created();
                        obs::emit_event_created(&event);
                        (event, true)
                    }
                    Err(StorageError::EventExists { .. }) => match self.existing_event(id).await? {
                        Some(existing) => (existing, false),
                        None => {
                            return Err(failure(
                                "save_event",
                                StorageError::WriteRejected(format!(
                                    "event for {id} reported as existing but not found"
                                )),
                            ))
                        }
                    },
                    Err(e) => return Err(failure("save_event", e)),
                }
            }
        };

        if candidate.status != CandidateStatus::Confirmed {
            if let Err(source) = self
                .store
                .update_candidate_status(id, CandidateStatus::Confirmed, self.clock.now())
                .await
            {
                obs::emit_persistence_failure("update_candidate_status", &source);
                METRICS.inc_persistence_failures();
                return Err(LifecycleError::PartialFinalization {
                    candidate_id: id.to_string(),
                    event_id: event.id.to_string(),
                    source,
                });
            }
            obs::emit_candidate_finalized(id, CandidateStatus::Confirmed, reviewer);
        }
        Ok((event, event_created))
    }

    async fn existing_event(&self, id: &CandidateId) -> LifecycleResult<Option<NhsnEvent>> {
        self.store
            .get_event_for_candidate(id)
            .await
            .map_err(|e| failure("get_event_for_candidate", e))
    }
}

fn terminal(candidate: &Candidate) -> LifecycleError {
    LifecycleError::AlreadyTerminal {
        candidate_id: candidate.id.to_string(),
        status: candidate.status,
    }
}

/// Map a storage error, logging and counting the ones that are not
/// ordinary lifecycle conflicts.
fn failure(op: &'static str, source: StorageError) -> LifecycleError {
    let err = LifecycleError::storage(op, source);
    if let LifecycleError::Persistence { op, source } = &err {
        obs::emit_persistence_failure(op, source);
        METRICS.inc_persistence_failures();
    }
    err
}
