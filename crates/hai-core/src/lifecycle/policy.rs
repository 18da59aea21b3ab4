//! Acceptance policy: when an engine decision may finalize a candidate
//! without a human review.

use serde::{Deserialize, Serialize};

use hai_domain::{
    ClassificationDecision, ConfidenceLevel, DecisionOutcome, DomainResult, HaiType, QueueType,
};

/// Per-HAI-type acceptance thresholds and review routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceRule {
    pub hai_type: HaiType,
    /// Minimum confidence for an `hai_confirmed` decision to auto-confirm.
    pub confirm_at: ConfidenceLevel,
    /// Minimum confidence for a `not_hai` decision to auto-reject.
    pub reject_at: ConfidenceLevel,
    /// Queue used when the decision needs review.
    pub queue: QueueType,
}

impl AcceptanceRule {
    pub fn new(hai_type: HaiType, confirm_at: ConfidenceLevel, reject_at: ConfidenceLevel) -> Self {
        Self {
            hai_type,
            confirm_at,
            reject_at,
            queue: QueueType::for_hai_type(hai_type),
        }
    }

    /// Route reviews to a different queue (builder pattern).
    pub fn with_queue(mut self, queue: QueueType) -> Self {
        self.queue = queue;
        self
    }
}

/// What the lifecycle manager should do with a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    Confirm,
    Reject,
    Review { queue: QueueType, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptancePolicy {
    pub rules: Vec<AcceptanceRule>,
    /// Queue for decisions that name a competing alternative source.
    pub conflict_queue: QueueType,
}

impl AcceptancePolicy {
    /// Standard policy: every HAI type auto-finalizes at `probable` or above.
    ///
    /// | Type   | Confirm at | Reject at | Queue  |
    /// |--------|------------|-----------|--------|
    /// | CLABSI | probable   | probable  | clabsi |
    /// | SSI    | probable   | probable  | ssi    |
    /// | VAE    | probable   | probable  | vae    |
    pub fn standard() -> Self {
        Self {
            rules: [HaiType::Clabsi, HaiType::Ssi, HaiType::Vae]
                .into_iter()
                .map(|t| AcceptanceRule::new(t, ConfidenceLevel::Probable, ConfidenceLevel::Probable))
                .collect(),
            conflict_queue: QueueType::ConflictingEvidence,
        }
    }

    /// Load a policy from JSON, e.g. a site-specific override file.
    pub fn from_json_str(json: &str) -> DomainResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replace the rule for the rule's HAI type (builder pattern).
    pub fn with_rule(mut self, rule: AcceptanceRule) -> Self {
        self.rules.retain(|r| r.hai_type != rule.hai_type);
        self.rules.push(rule);
        self
    }

    pub fn rule_for(&self, hai_type: HaiType) -> Option<&AcceptanceRule> {
        self.rules.iter().find(|r| r.hai_type == hai_type)
    }

    /// Decide whether `decision` may finalize directly or needs review.
    ///
    /// A type without a rule always goes to review.
    pub fn evaluate(&self, decision: &ClassificationDecision) -> Acceptance {
        let Some(rule) = self.rule_for(decision.hai_type) else {
            return Acceptance::Review {
                queue: QueueType::for_hai_type(decision.hai_type),
                reason: format!("no acceptance rule for {}", decision.hai_type),
            };
        };
        let review_queue = if decision.alternative_source.is_some() {
            self.conflict_queue
        } else {
            rule.queue
        };

        match decision.decision {
            DecisionOutcome::HaiConfirmed if decision.confidence >= rule.confirm_at => {
                Acceptance::Confirm
            }
            DecisionOutcome::NotHai if decision.confidence >= rule.reject_at => Acceptance::Reject,
            DecisionOutcome::PendingReview => Acceptance::Review {
                queue: review_queue,
                reason: if decision.is_incomplete() {
                    format!("incomplete case data: {}", decision.missing_fields.join(", "))
                } else {
                    "decision explicitly pending review".to_string()
                },
            },
            outcome => Acceptance::Review {
                queue: review_queue,
                reason: format!(
                    "{outcome} at {} confidence is below the acceptance threshold",
                    decision.confidence
                ),
            },
        }
    }
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hai_domain::{Classification, SsiClass};

    fn decision(outcome: DecisionOutcome, confidence: ConfidenceLevel) -> ClassificationDecision {
        ClassificationDecision {
            hai_type: HaiType::Ssi,
            decision: outcome,
            classification: match outcome {
                DecisionOutcome::HaiConfirmed => Classification::Ssi(SsiClass::DeepIncisional),
                _ => Classification::Ssi(SsiClass::NoSsi),
            },
            confidence,
            reasoning: String::new(),
            supporting_evidence: Vec::new(),
            contradicting_evidence: Vec::new(),
            alternative_source: None,
            is_mbi_lcbi: false,
            event_date: None,
            missing_fields: Vec::new(),
            reference_version: "t".to_string(),
        }
    }

    #[test]
    fn test_confirm_at_threshold() {
        let policy = AcceptancePolicy::standard();
        let d = decision(DecisionOutcome::HaiConfirmed, ConfidenceLevel::Probable);
        assert_eq!(policy.evaluate(&d), Acceptance::Confirm);
    }

    #[test]
    fn test_below_threshold_goes_to_type_queue() {
        let policy = AcceptancePolicy::standard();
        let d = decision(DecisionOutcome::HaiConfirmed, ConfidenceLevel::Possible);
        assert!(matches!(
            policy.evaluate(&d),
            Acceptance::Review { queue: QueueType::Ssi, .. }
        ));
    }

    #[test]
    fn test_pending_review_never_auto_finalizes() {
        let policy = AcceptancePolicy::standard();
        let d = decision(DecisionOutcome::PendingReview, ConfidenceLevel::Definite);
        assert!(matches!(policy.evaluate(&d), Acceptance::Review { .. }));
    }

    #[test]
    fn test_alternative_source_routes_to_conflict_queue() {
        let policy = AcceptancePolicy::standard();
        let mut d = decision(DecisionOutcome::PendingReview, ConfidenceLevel::Possible);
        d.alternative_source = Some("suspected pneumonia".to_string());
        assert!(matches!(
            policy.evaluate(&d),
            Acceptance::Review { queue: QueueType::ConflictingEvidence, .. }
        ));
    }

    #[test]
    fn test_reject_at_threshold() {
        let policy = AcceptancePolicy::standard();
        let d = decision(DecisionOutcome::NotHai, ConfidenceLevel::Definite);
        assert_eq!(policy.evaluate(&d), Acceptance::Reject);
        let d = decision(DecisionOutcome::NotHai, ConfidenceLevel::Insufficient);
        assert!(matches!(policy.evaluate(&d), Acceptance::Review { .. }));
    }

    #[test]
    fn test_with_rule_replaces_existing() {
        let policy = AcceptancePolicy::standard().with_rule(AcceptanceRule::new(
            HaiType::Ssi,
            ConfidenceLevel::Definite,
            ConfidenceLevel::Definite,
        ));
        assert_eq!(policy.rules.len(), 3);
        let d = decision(DecisionOutcome::HaiConfirmed, ConfidenceLevel::Probable);
        assert!(matches!(policy.evaluate(&d), Acceptance::Review { .. }));
    }

    #[test]
    fn test_policy_serde_shape() {
        let json = serde_json::to_value(AcceptancePolicy::standard()).unwrap();
        assert_eq!(json["conflict_queue"], "conflicting_evidence");
        assert_eq!(json["rules"][0]["confirm_at"], "probable");
    }

    #[test]
    fn test_policy_from_json_override() {
        let json = r#"{
            "rules": [
                {"hai_type": "vae", "confirm_at": "definite", "reject_at": "probable", "queue": "vae"}
            ],
            "conflict_queue": "conflicting_evidence"
        }"#;
        let policy = AcceptancePolicy::from_json_str(json).unwrap();
        assert!(policy.rule_for(HaiType::Clabsi).is_none());
        assert_eq!(
            policy.rule_for(HaiType::Vae).map(|r| r.confirm_at),
            Some(ConfidenceLevel::Definite)
        );
    }
}
