//! Human review tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::HaiType;
use crate::ids::{CandidateId, ReviewId};

/// Review queue a task is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueType {
    Clabsi,
    Ssi,
    Vae,
    /// Cases where an alternative infection source competes with the HAI.
    ConflictingEvidence,
}

impl QueueType {
    pub fn for_hai_type(hai_type: HaiType) -> Self {
        match hai_type {
            HaiType::Clabsi => Self::Clabsi,
            HaiType::Ssi => Self::Ssi,
            HaiType::Vae => Self::Vae,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clabsi => "clabsi",
            Self::Ssi => "ssi",
            Self::Vae => "vae",
            Self::ConflictingEvidence => "conflicting_evidence",
        }
    }
}

impl std::fmt::Display for QueueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal verdict a reviewer records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Confirmed,
    Rejected,
    NeedsMoreInfo,
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Rejected => write!(f, "rejected"),
            Self::NeedsMoreInfo => write!(f, "needs_more_info"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub candidate_id: CandidateId,
    pub queue_type: QueueType,
    pub assigned_reviewer: Option<String>,
    pub reviewed_by: Option<String>,
    pub decision: Option<ReviewDecision>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Review {
    /// A fresh, unassigned, open review.
    pub fn open(candidate_id: CandidateId, queue_type: QueueType, now: DateTime<Utc>) -> Self {
        Self {
            id: ReviewId::new(),
            candidate_id,
            queue_type,
            assigned_reviewer: None,
            reviewed_by: None,
            decision: None,
            notes: None,
            created_at: now,
            completed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.decision.is_none()
    }
}
