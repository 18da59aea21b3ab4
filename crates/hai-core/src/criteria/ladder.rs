//! Ordered tier evaluation shared by every criteria engine.
//!
//! Each engine evaluates its tiers independently, most severe first, and
//! hands the evaluations to [`resolve`]. The highest fully satisfied tier
//! wins; a partially met higher tier never hides a satisfied lower one.

use chrono::NaiveDate;

use hai_domain::evidence::push_unique;
use hai_domain::{
    Classification, ClassificationDecision, ConfidenceLevel, DecisionOutcome, EvidenceItem,
    HaiType, KnowledgeTables,
};

// ---------------------------------------------------------------------------
// Tier evaluation
// ---------------------------------------------------------------------------

/// Result of checking one tier's full criteria against a case.
#[derive(Debug, Clone, PartialEq)]
pub struct TierEvaluation<T> {
    pub tier: T,
    pub satisfied: bool,
    /// Confidence this tier supports when satisfied.
    pub grade: ConfidenceLevel,
    pub reasoning: Vec<String>,
    pub supporting: Vec<EvidenceItem>,
    pub event_date: Option<NaiveDate>,
}

impl<T> TierEvaluation<T> {
    pub fn met(tier: T, grade: ConfidenceLevel) -> Self {
        Self {
            tier,
            satisfied: true,
            grade,
            reasoning: Vec::new(),
            supporting: Vec::new(),
            event_date: None,
        }
    }

    pub fn unmet(tier: T) -> Self {
        Self {
            tier,
            satisfied: false,
            grade: ConfidenceLevel::Insufficient,
            reasoning: Vec::new(),
            supporting: Vec::new(),
            event_date: None,
        }
    }

    pub fn note(mut self, line: impl Into<String>) -> Self {
        self.reasoning.push(line.into());
        self
    }

    pub fn support(mut self, item: EvidenceItem) -> Self {
        push_unique(&mut self.supporting, item);
        self
    }

    pub fn on(mut self, date: Option<NaiveDate>) -> Self {
        self.event_date = date;
        self
    }
}

/// Combined outcome of a tier ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderOutcome<T> {
    /// Highest satisfied tier, if any.
    pub tier: Option<T>,
    /// Maximum grade across all satisfied tiers.
    pub confidence: ConfidenceLevel,
    pub reasoning: Vec<String>,
    pub supporting: Vec<EvidenceItem>,
    pub event_date: Option<NaiveDate>,
}

/// Resolve evaluations ordered most severe first.
///
/// Reasoning keeps the unmet lines of every tier above the winner, then the
/// winner's own lines. When nothing is satisfied every tier's lines are kept.
pub fn resolve<T: Copy>(evaluations: Vec<TierEvaluation<T>>) -> LadderOutcome<T> {
    let winner = evaluations.iter().position(|e| e.satisfied);

    let confidence = evaluations
        .iter()
        .filter(|e| e.satisfied)
        .map(|e| e.grade)
        .max()
        .unwrap_or_default();

    let mut supporting = Vec::new();
    for evaluation in evaluations.iter().filter(|e| e.satisfied) {
        for item in &evaluation.supporting {
            push_unique(&mut supporting, item.clone());
        }
    }

    let last = winner.unwrap_or(evaluations.len().saturating_sub(1));
    let reasoning = evaluations
        .iter()
        .take(last + 1)
        .flat_map(|e| e.reasoning.iter().cloned())
        .collect();

    let (tier, event_date) = match winner {
        Some(i) => (Some(evaluations[i].tier), evaluations[i].event_date),
        None => (None, None),
    };

    LadderOutcome {
        tier,
        confidence,
        reasoning,
        supporting,
        event_date,
    }
}

// ---------------------------------------------------------------------------
// Decision assembly
// ---------------------------------------------------------------------------

/// Accumulates reasoning and evidence while an engine runs.
#[derive(Debug, Clone)]
pub struct DecisionDraft {
    hai_type: HaiType,
    reference_version: String,
    reasoning: Vec<String>,
    supporting: Vec<EvidenceItem>,
    contradicting: Vec<EvidenceItem>,
    missing: Vec<String>,
    alternative_source: Option<String>,
}

impl DecisionDraft {
    pub fn new(hai_type: HaiType, tables: &KnowledgeTables) -> Self {
        Self {
            hai_type,
            reference_version: tables.version.clone(),
            reasoning: Vec::new(),
            supporting: Vec::new(),
            contradicting: Vec::new(),
            missing: Vec::new(),
            alternative_source: None,
        }
    }

    pub fn note(&mut self, line: impl Into<String>) {
        self.reasoning.push(line.into());
    }

    pub fn support(&mut self, item: EvidenceItem) {
        push_unique(&mut self.supporting, item);
    }

    pub fn contradict(&mut self, item: EvidenceItem) {
        push_unique(&mut self.contradicting, item);
    }

    /// Record a required field that is absent from the case data.
    pub fn missing(&mut self, field: &str) {
        self.missing.push(field.to_string());
        self.note(format!("{field}: required field missing from case data"));
    }

    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    pub fn alternative_source(&mut self, source: impl Into<String>) {
        self.alternative_source = Some(source.into());
    }

    /// Merge a ladder outcome's reasoning and supporting evidence.
    pub fn absorb<T>(&mut self, outcome: &LadderOutcome<T>) {
        self.reasoning.extend(outcome.reasoning.iter().cloned());
        for item in &outcome.supporting {
            push_unique(&mut self.supporting, item.clone());
        }
    }

    /// Lowest-confidence result for a case missing required fields.
    pub fn incomplete(self) -> ClassificationDecision {
        let hai_type = self.hai_type;
        self.finish(
            DecisionOutcome::PendingReview,
            Classification::none_for(hai_type),
            ConfidenceLevel::Insufficient,
            None,
        )
    }

    pub fn finish(
        self,
        decision: DecisionOutcome,
        classification: Classification,
        confidence: ConfidenceLevel,
        event_date: Option<NaiveDate>,
    ) -> ClassificationDecision {
        let mut reasoning = self.reasoning.join("\n");
        if !reasoning.is_empty() {
            reasoning.push('\n');
        }
        ClassificationDecision {
            hai_type: self.hai_type,
            decision,
            classification,
            confidence,
            reasoning,
            supporting_evidence: self.supporting,
            contradicting_evidence: self.contradicting,
            alternative_source: self.alternative_source,
            is_mbi_lcbi: matches!(
                classification,
                Classification::Clabsi(hai_domain::ClabsiClass::MbiLcbi)
            ),
            event_date,
            missing_fields: self.missing,
            reference_version: self.reference_version,
        }
    }
}
