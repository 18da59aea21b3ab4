//! Surveillance candidates and their audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::{ClassificationDecision, HaiType};
use crate::error::DomainResult;
use crate::ids::CandidateId;

/// Lifecycle status of a candidate.
///
/// `New → PendingClassification → {PendingReview | Confirmed | Rejected}`;
/// a review may also send the candidate back to `PendingClassification`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    New,
    PendingClassification,
    PendingReview,
    Confirmed,
    Rejected,
}

impl CandidateStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::PendingClassification => "pending_classification",
            Self::PendingReview => "pending_review",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only decision history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub decision: ClassificationDecision,
    pub recorded_at: DateTime<Utc>,
    /// SHA-256 of the decision at the time it was recorded.
    pub digest: String,
}

impl DecisionEntry {
    pub fn new(decision: ClassificationDecision, recorded_at: DateTime<Utc>) -> DomainResult<Self> {
        let digest = decision.digest()?;
        Ok(Self {
            decision,
            recorded_at,
            digest,
        })
    }
}

/// A surveillance event under evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub hai_type: HaiType,
    /// Opaque reference to the patient encounter.
    pub patient_ref: String,
    pub status: CandidateStatus,
    /// Every decision ever recorded, oldest first. Never rewritten.
    pub history: Vec<DecisionEntry>,
    pub created_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(hai_type: HaiType, patient_ref: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: CandidateId::new(),
            hai_type,
            patient_ref: patient_ref.into(),
            status: CandidateStatus::New,
            history: Vec::new(),
            created_at: now,
            status_changed_at: now,
        }
    }

    /// The most recently recorded decision.
    pub fn current_decision(&self) -> Option<&DecisionEntry> {
        self.history.last()
    }
}
