//! Finalized reportable events.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::{Classification, ClassificationDecision, HaiType};
use crate::error::DomainResult;
use crate::ids::{CandidateId, NhsnEventId};

/// Immutable reportable record created when a candidate is confirmed.
///
/// Location and pathogen codes are left empty; a separate mapping step
/// fills them before submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NhsnEvent {
    pub id: NhsnEventId,
    pub candidate_id: CandidateId,
    pub hai_type: HaiType,
    pub event_date: Option<NaiveDate>,
    pub classification: Option<Classification>,
    pub location_code: Option<String>,
    pub pathogen_code: Option<String>,
    /// Digest of the decision that was current when the event was created.
    pub decision_digest: Option<String>,
    pub confirmed_by: String,
    pub created_at: DateTime<Utc>,
}

impl NhsnEvent {
    pub fn from_decision(
        candidate_id: CandidateId,
        hai_type: HaiType,
        decision: Option<&ClassificationDecision>,
        confirmed_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: NhsnEventId::new(),
            candidate_id,
            hai_type,
            event_date: decision.and_then(|d| d.event_date),
            classification: decision
                .map(|d| d.classification)
                .filter(Classification::is_reportable),
            location_code: None,
            pathogen_code: None,
            decision_digest: decision.map(ClassificationDecision::digest).transpose()?,
            confirmed_by: confirmed_by.into(),
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::ConfidenceLevel;
    use crate::decision::{DecisionOutcome, VaeClass};

    fn decision() -> ClassificationDecision {
        ClassificationDecision {
            hai_type: HaiType::Vae,
            decision: DecisionOutcome::HaiConfirmed,
            classification: Classification::Vae(VaeClass::Ivac),
            confidence: ConfidenceLevel::Possible,
            reasoning: String::new(),
            supporting_evidence: Vec::new(),
            contradicting_evidence: Vec::new(),
            alternative_source: None,
            is_mbi_lcbi: false,
            event_date: NaiveDate::from_ymd_opt(2024, 2, 3),
            missing_fields: Vec::new(),
            reference_version: "t".to_string(),
        }
    }

    #[test]
    fn test_event_copies_decision_fields() {
        let d = decision();
        let event = NhsnEvent::from_decision(
            CandidateId::from("c-9"),
            HaiType::Vae,
            Some(&d),
            "ip-nurse",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(event.event_date, d.event_date);
        assert_eq!(event.classification, Some(Classification::Vae(VaeClass::Ivac)));
        assert_eq!(event.decision_digest, Some(d.digest().unwrap()));
        assert!(event.location_code.is_none());
    }

    #[test]
    fn test_non_reportable_classification_is_dropped() {
        let mut d = decision();
        d.classification = Classification::none_for(HaiType::Vae);
        let event =
            NhsnEvent::from_decision(CandidateId::new(), HaiType::Vae, Some(&d), "r", Utc::now())
                .unwrap();
        assert!(event.classification.is_none());
    }
}
