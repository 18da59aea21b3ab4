//! Output schema of the extraction collaborator.
//!
//! The collaborator may emit its own classification for a case. The payload
//! is validated here and converted into the same [`ClassificationDecision`]
//! the criteria engines produce, so the lifecycle manager treats both alike.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceLevel;
use crate::decision::{
    ClabsiClass, Classification, ClassificationDecision, DecisionOutcome, HaiType,
};
use crate::error::{DomainError, DomainResult};
use crate::evidence::EvidenceItem;

/// Confidence as numeric score in `[0, 1]` or as a categorical level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadConfidence {
    Score(f64),
    Level(String),
}

impl PayloadConfidence {
    pub fn to_level(&self) -> DomainResult<ConfidenceLevel> {
        match self {
            Self::Score(score) => ConfidenceLevel::from_score(*score).ok_or_else(|| {
                DomainError::InvalidPayload(format!("confidence {score} is outside [0, 1]"))
            }),
            Self::Level(level) => level.parse().map_err(DomainError::InvalidPayload),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationPayload {
    pub decision: String,
    pub confidence: PayloadConfidence,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub alternative_source: Option<String>,
    #[serde(default)]
    pub is_mbi_lcbi: bool,
    #[serde(default)]
    pub supporting_evidence: Vec<EvidenceItem>,
    #[serde(default)]
    pub contradicting_evidence: Vec<EvidenceItem>,
    /// Optional tier label, e.g. `"deep_incisional"`.
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
}

fn parse_outcome(raw: &str) -> DomainResult<DecisionOutcome> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "hai_confirmed" => Ok(DecisionOutcome::HaiConfirmed),
        "not_hai" => Ok(DecisionOutcome::NotHai),
        "pending_review" => Ok(DecisionOutcome::PendingReview),
        other => Err(DomainError::InvalidPayload(format!(
            "unknown decision literal {other:?}"
        ))),
    }
}

impl ClassificationPayload {
    pub fn from_json_str(json: &str) -> DomainResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the payload and convert it into a decision for `hai_type`.
    pub fn into_decision(
        self,
        hai_type: HaiType,
        reference_version: &str,
    ) -> DomainResult<ClassificationDecision> {
        let decision = parse_outcome(&self.decision)?;
        let confidence = self.confidence.to_level()?;

        if self.is_mbi_lcbi && hai_type != HaiType::Clabsi {
            return Err(DomainError::InvalidPayload(format!(
                "is_mbi_lcbi set on a {hai_type} payload"
            )));
        }

        let classification = match self.classification.as_deref() {
            Some(label) => Classification::parse_for(hai_type, label).ok_or_else(|| {
                DomainError::InvalidPayload(format!("unknown {hai_type} classification {label:?}"))
            })?,
            None => match (decision, hai_type) {
                (DecisionOutcome::HaiConfirmed, HaiType::Clabsi) if self.is_mbi_lcbi => {
                    Classification::Clabsi(ClabsiClass::MbiLcbi)
                }
                (DecisionOutcome::HaiConfirmed, HaiType::Clabsi) => {
                    Classification::Clabsi(ClabsiClass::Lcbi1)
                }
                (DecisionOutcome::HaiConfirmed, _) => {
                    return Err(DomainError::InvalidPayload(format!(
                        "confirmed {hai_type} payload must name a classification"
                    )))
                }
                _ => Classification::none_for(hai_type),
            },
        };

        if self.is_mbi_lcbi && classification != Classification::Clabsi(ClabsiClass::MbiLcbi) {
            return Err(DomainError::InvalidPayload(format!(
                "is_mbi_lcbi set but classification is {}",
                classification.label()
            )));
        }
        match decision {
            DecisionOutcome::HaiConfirmed if !classification.is_reportable() => {
                return Err(DomainError::InvalidPayload(format!(
                    "hai_confirmed with non-reportable classification {}",
                    classification.label()
                )));
            }
            DecisionOutcome::NotHai if classification.is_reportable() => {
                return Err(DomainError::InvalidPayload(format!(
                    "not_hai with reportable classification {}",
                    classification.label()
                )));
            }
            _ => {}
        }

        Ok(ClassificationDecision {
            hai_type,
            decision,
            classification,
            confidence,
            reasoning: self.reasoning,
            supporting_evidence: self.supporting_evidence,
            contradicting_evidence: self.contradicting_evidence,
            alternative_source: self.alternative_source.filter(|s| !s.trim().is_empty()),
            is_mbi_lcbi: self.is_mbi_lcbi,
            event_date: self.event_date,
            missing_fields: Vec::new(),
            reference_version: reference_version.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::SsiClass;

    #[test]
    fn test_numeric_confidence_maps_to_level() {
        let payload = ClassificationPayload::from_json_str(
            r#"{
                "decision": "hai_confirmed",
                "confidence": 0.82,
                "reasoning": "purulent drainage POD 10",
                "classification": "superficial_incisional",
                "supporting_evidence": [{"text": "pus at incision", "source": "note-1#4..19"}]
            }"#,
        )
        .unwrap();
        let d = payload.into_decision(HaiType::Ssi, "nhsn-2024").unwrap();
        assert_eq!(d.confidence, ConfidenceLevel::Probable);
        assert_eq!(d.classification, Classification::Ssi(SsiClass::SuperficialIncisional));
        assert_eq!(d.supporting_evidence[0].relevance, None);
    }

    #[test]
    fn test_categorical_confidence() {
        let payload = ClassificationPayload::from_json_str(
            r#"{"decision": "not_hai", "confidence": "definite"}"#,
        )
        .unwrap();
        let d = payload.into_decision(HaiType::Vae, "v").unwrap();
        assert_eq!(d.confidence, ConfidenceLevel::Definite);
        assert_eq!(d.classification, Classification::none_for(HaiType::Vae));
    }

    #[test]
    fn test_clabsi_mbi_flag_derives_classification() {
        let payload = ClassificationPayload::from_json_str(
            r#"{"decision": "hai_confirmed", "confidence": 0.95, "is_mbi_lcbi": true}"#,
        )
        .unwrap();
        let d = payload.into_decision(HaiType::Clabsi, "v").unwrap();
        assert_eq!(d.classification, Classification::Clabsi(ClabsiClass::MbiLcbi));
        assert!(d.is_mbi_lcbi);
    }

    #[test]
    fn test_rejects_unknown_decision() {
        let payload = ClassificationPayload::from_json_str(
            r#"{"decision": "maybe", "confidence": 0.5}"#,
        )
        .unwrap();
        let err = payload.into_decision(HaiType::Clabsi, "v").unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_rejects_out_of_range_score() {
        let payload = ClassificationPayload::from_json_str(
            r#"{"decision": "pending_review", "confidence": 1.5}"#,
        )
        .unwrap();
        assert!(payload.into_decision(HaiType::Ssi, "v").is_err());
    }

    #[test]
    fn test_rejects_mbi_flag_outside_clabsi() {
        let payload = ClassificationPayload::from_json_str(
            r#"{"decision": "not_hai", "confidence": 0.1, "is_mbi_lcbi": true}"#,
        )
        .unwrap();
        assert!(payload.into_decision(HaiType::Vae, "v").is_err());
    }

    #[test]
    fn test_confirmed_ssi_needs_classification() {
        let payload = ClassificationPayload::from_json_str(
            r#"{"decision": "hai_confirmed", "confidence": 0.9}"#,
        )
        .unwrap();
        assert!(payload.into_decision(HaiType::Ssi, "v").is_err());
    }

    #[test]
    fn test_blank_alternative_source_is_dropped() {
        let payload = ClassificationPayload::from_json_str(
            r#"{"decision": "pending_review", "confidence": "possible", "alternative_source": "  "}"#,
        )
        .unwrap();
        let d = payload.into_decision(HaiType::Clabsi, "v").unwrap();
        assert!(d.alternative_source.is_none());
    }
}
