//! In-memory fake for the storage trait (testing only)
//!
//! `MemorySurveillanceStore` satisfies the `SurveillanceStore` contract
//! without external dependencies and can be told to fail specific calls so
//! callers' partial-failure handling can be exercised.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use hai_domain::{
    Candidate, CandidateId, CandidateStatus, DecisionEntry, NhsnEvent, QueueType, Review,
    ReviewId,
};

use crate::error::StorageError;
use crate::storage_traits::{ReviewCompletion, StorageResult, SurveillanceStore};

/// Store calls that can be targeted by fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    InsertCandidate,
    GetCandidate,
    AppendDecision,
    UpdateCandidateStatus,
    ListCandidates,
    OpenReview,
    GetReview,
    OpenReviewFor,
    ReviewsFor,
    AssignReview,
    CompleteReview,
    GetPendingReviews,
    SaveEvent,
    GetEventForCandidate,
}

#[derive(Debug, Default)]
struct State {
    candidates: BTreeMap<String, Candidate>,
    reviews: BTreeMap<String, Review>,
    /// Event per candidate id.
    events: BTreeMap<String, NhsnEvent>,
}

/// In-memory surveillance store backed by `BTreeMap`s behind one mutex.
#[derive(Debug, Default)]
pub struct MemorySurveillanceStore {
    state: Mutex<State>,
    faults: Mutex<HashMap<StoreOperation, VecDeque<StorageError>>>,
}

impl MemorySurveillanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call to `op` fail with `err`. Queued faults are
    /// consumed in order.
    pub fn fail_next(&self, op: StoreOperation, err: StorageError) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.entry(op).or_default().push_back(err);
        }
    }

    /// Number of stored events across all candidates.
    pub fn event_count(&self) -> usize {
        self.state.lock().map(|s| s.events.len()).unwrap_or(0)
    }

    fn injected(&self, op: StoreOperation) -> StorageResult<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| StorageError::Unavailable("fault table lock poisoned".to_string()))?;
        match faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => {
                debug!(?op, error = %err, "injected storage fault");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn enter(&self, op: StoreOperation) -> StorageResult<MutexGuard<'_, State>> {
        self.injected(op)?;
        self.state
            .lock()
            .map_err(|_| StorageError::Unavailable("state lock poisoned".to_string()))
    }
}

fn candidate_not_found(id: &CandidateId) -> StorageError {
    StorageError::CandidateNotFound {
        candidate_id: id.to_string(),
    }
}

fn review_not_found(id: &ReviewId) -> StorageError {
    StorageError::ReviewNotFound {
        review_id: id.to_string(),
    }
}

fn oldest_first(reviews: &mut [Review]) {
    reviews.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
}

#[async_trait]
impl SurveillanceStore for MemorySurveillanceStore {
    async fn insert_candidate(&self, candidate: Candidate) -> StorageResult<()> {
        let mut state = self.enter(StoreOperation::InsertCandidate)?;
        if state.candidates.contains_key(candidate.id.as_str()) {
            return Err(StorageError::CandidateExists {
                candidate_id: candidate.id.to_string(),
            });
        }
        state
            .candidates
            .insert(candidate.id.to_string(), candidate);
        Ok(())
    }

    async fn get_candidate(&self, id: &CandidateId) -> StorageResult<Candidate> {
        let state = self.enter(StoreOperation::GetCandidate)?;
        state
            .candidates
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| candidate_not_found(id))
    }

    async fn append_decision(&self, id: &CandidateId, entry: DecisionEntry) -> StorageResult<()> {
        let mut state = self.enter(StoreOperation::AppendDecision)?;
        let candidate = state
            .candidates
            .get_mut(id.as_str())
            .ok_or_else(|| candidate_not_found(id))?;
        candidate.history.push(entry);
        Ok(())
    }

    async fn update_candidate_status(
        &self,
        id: &CandidateId,
        status: CandidateStatus,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let mut state = self.enter(StoreOperation::UpdateCandidateStatus)?;
        let candidate = state
            .candidates
            .get_mut(id.as_str())
            .ok_or_else(|| candidate_not_found(id))?;
        candidate.status = status;
        candidate.status_changed_at = at;
        Ok(())
    }

    async fn list_candidates(
        &self,
        status: Option<CandidateStatus>,
    ) -> StorageResult<Vec<Candidate>> {
        let state = self.enter(StoreOperation::ListCandidates)?;
        let mut candidates: Vec<Candidate> = state
            .candidates
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(candidates)
    }

    async fn open_review(&self, review: Review) -> StorageResult<()> {
        let mut state = self.enter(StoreOperation::OpenReview)?;
        if !state.candidates.contains_key(review.candidate_id.as_str()) {
            return Err(candidate_not_found(&review.candidate_id));
        }
        if let Some(open) = state
            .reviews
            .values()
            .find(|r| r.candidate_id == review.candidate_id && r.is_open())
        {
            return Err(StorageError::ReviewAlreadyOpen {
                candidate_id: review.candidate_id.to_string(),
                review_id: open.id.to_string(),
            });
        }
        state.reviews.insert(review.id.to_string(), review);
        Ok(())
    }

    async fn get_review(&self, id: &ReviewId) -> StorageResult<Review> {
        let state = self.enter(StoreOperation::GetReview)?;
        state
            .reviews
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| review_not_found(id))
    }

    async fn open_review_for(&self, candidate_id: &CandidateId) -> StorageResult<Option<Review>> {
        let state = self.enter(StoreOperation::OpenReviewFor)?;
        Ok(state
            .reviews
            .values()
            .find(|r| &r.candidate_id == candidate_id && r.is_open())
            .cloned())
    }

    async fn reviews_for(&self, candidate_id: &CandidateId) -> StorageResult<Vec<Review>> {
        let state = self.enter(StoreOperation::ReviewsFor)?;
        let mut reviews: Vec<Review> = state
            .reviews
            .values()
            .filter(|r| &r.candidate_id == candidate_id)
            .cloned()
            .collect();
        oldest_first(&mut reviews);
        Ok(reviews)
    }

    async fn assign_review(&self, id: &ReviewId, reviewer: &str) -> StorageResult<Review> {
        let mut state = self.enter(StoreOperation::AssignReview)?;
        let review = state
            .reviews
            .get_mut(id.as_str())
            .ok_or_else(|| review_not_found(id))?;
        if !review.is_open() {
            return Err(StorageError::ReviewClosed {
                review_id: id.to_string(),
            });
        }
        review.assigned_reviewer = Some(reviewer.to_string());
        Ok(review.clone())
    }

    async fn complete_review(
        &self,
        id: &ReviewId,
        completion: ReviewCompletion,
    ) -> StorageResult<Review> {
        let mut state = self.enter(StoreOperation::CompleteReview)?;
        let review = state
            .reviews
            .get_mut(id.as_str())
            .ok_or_else(|| review_not_found(id))?;
        if !review.is_open() {
            return Err(StorageError::ReviewClosed {
                review_id: id.to_string(),
            });
        }
        review.reviewed_by = Some(completion.reviewer);
        review.decision = Some(completion.decision);
        review.notes = completion.notes;
        review.completed_at = Some(completion.completed_at);
        Ok(review.clone())
    }

    async fn get_pending_reviews(&self, queue: Option<QueueType>) -> StorageResult<Vec<Review>> {
        let state = self.enter(StoreOperation::GetPendingReviews)?;
        let mut reviews: Vec<Review> = state
            .reviews
            .values()
            .filter(|r| r.is_open() && queue.map_or(true, |q| r.queue_type == q))
            .cloned()
            .collect();
        oldest_first(&mut reviews);
        Ok(reviews)
    }

    async fn save_event(&self, event: NhsnEvent) -> StorageResult<()> {
        let mut state = self.enter(StoreOperation::SaveEvent)?;
        if let Some(existing) = state.events.get(event.candidate_id.as_str()) {
            return Err(StorageError::EventExists {
                candidate_id: event.candidate_id.to_string(),
                event_id: existing.id.to_string(),
            });
        }
        state
            .events
            .insert(event.candidate_id.to_string(), event);
        Ok(())
    }

    async fn get_event_for_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> StorageResult<Option<NhsnEvent>> {
        let state = self.enter(StoreOperation::GetEventForCandidate)?;
        Ok(state.events.get(candidate_id.as_str()).cloned())
    }
}
