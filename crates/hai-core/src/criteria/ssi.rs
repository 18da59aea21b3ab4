//! Surgical site infection criteria.
//!
//! Ladder, deepest first: organ/space, deep incisional, superficial
//! incisional. Findings count only inside the surveillance window that
//! starts on the procedure day (30 days, 90 with an implant).

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use hai_domain::case::{
    AbscessDetection, CultureStatus, IncisionSign, SignKind, SsiCase, SsiFinding, SsiFindingKind,
    TissueLayer,
};
use hai_domain::{
    Classification, ClassificationDecision, ConfidenceLevel, DecisionOutcome, EvidenceItem,
    HaiType, KnowledgeTables, SsiClass,
};

use super::ladder::{resolve, DecisionDraft, TierEvaluation};
use super::{CriteriaEngine, DateWindow};

fn tier_for(layer: TissueLayer) -> SsiClass {
    match layer {
        TissueLayer::Superficial => SsiClass::SuperficialIncisional,
        TissueLayer::Deep => SsiClass::DeepIncisional,
        TissueLayer::OrganSpace => SsiClass::OrganSpace,
    }
}

fn describe(kind: &SsiFindingKind) -> &'static str {
    match kind {
        SsiFindingKind::PurulentDrainage => "purulent drainage",
        SsiFindingKind::DrainPurulence => "purulent drainage from drain",
        SsiFindingKind::OrganismIdentified => "organism from aseptic culture",
        SsiFindingKind::ClinicianDiagnosis => "clinician diagnosis",
        SsiFindingKind::DeliberateOpening { .. } => "deliberate opening",
        SsiFindingKind::Abscess { .. } => "abscess",
        SsiFindingKind::ReoperationPurulence => "frank purulence at reoperation",
        SsiFindingKind::StitchAbscess => "stitch abscess",
    }
}

/// A finding that meets one tier's criteria.
#[derive(Debug, Clone)]
struct Qualifying<'a> {
    index: usize,
    finding: &'a SsiFinding,
    tier: SsiClass,
    grade: ConfidenceLevel,
    reason: String,
    pod: i64,
    sign: Option<&'a IncisionSign>,
}

/// Evaluates SSI criteria against operative and wound findings.
#[derive(Debug, Clone)]
pub struct SsiEngine {
    tables: Arc<KnowledgeTables>,
}

impl SsiEngine {
    pub fn new(tables: Arc<KnowledgeTables>) -> Self {
        Self { tables }
    }

    fn is_compatible_sign(&self, layer: TissueLayer, sign: &IncisionSign) -> bool {
        match (layer, sign.kind) {
            (TissueLayer::Deep, SignKind::Fever) => sign
                .temperature_celsius
                .map_or(true, |t| t > self.tables.ssi.fever_celsius),
            (TissueLayer::Deep, SignKind::LocalizedPain) => true,
            (
                TissueLayer::Superficial,
                SignKind::LocalizedPain | SignKind::Swelling | SignKind::Erythema | SignKind::Heat,
            ) => true,
            _ => false,
        }
    }

    /// Grade a single finding, or explain why it does not qualify.
    fn grade<'a>(
        &self,
        case: &'a SsiCase,
        finding: &'a SsiFinding,
    ) -> Result<(ConfidenceLevel, String, Option<&'a IncisionSign>), String> {
        let layer = finding.layer;
        let definite = |reason: String| Ok((ConfidenceLevel::Definite, reason, None));
        match finding.kind {
            SsiFindingKind::StitchAbscess => {
                Err("stitch abscess alone does not qualify".to_string())
            }
            SsiFindingKind::PurulentDrainage => definite(format!("purulent drainage from {layer} layer")),
            SsiFindingKind::ReoperationPurulence => {
                definite(format!("frank purulence in {layer} layer at reoperation"))
            }
            SsiFindingKind::DrainPurulence => match layer {
                TissueLayer::OrganSpace => {
                    definite("purulent drainage from drain placed into organ/space".to_string())
                }
                _ => Err(format!("drain purulence does not apply to the {layer} layer")),
            },
            SsiFindingKind::OrganismIdentified => match layer {
                TissueLayer::Deep => Err(
                    "organism from deep tissue without deliberate opening does not qualify"
                        .to_string(),
                ),
                _ => definite(format!("organism from aseptic {layer} specimen")),
            },
            SsiFindingKind::ClinicianDiagnosis => match layer {
                TissueLayer::Superficial => Ok((
                    ConfidenceLevel::Probable,
                    "clinician diagnosis of superficial incisional SSI".to_string(),
                    None,
                )),
                _ => Err(format!(
                    "clinician diagnosis alone does not meet {layer} criteria"
                )),
            },
            SsiFindingKind::Abscess { detected_by } => match (layer, detected_by) {
                (TissueLayer::Superficial, _) => {
                    Err("abscess criteria apply to deep and organ/space layers".to_string())
                }
                (_, AbscessDetection::Imaging) => Ok((
                    ConfidenceLevel::Probable,
                    format!("{layer} abscess on imaging"),
                    None,
                )),
                (_, AbscessDetection::Exam) => definite(format!("{layer} abscess on exam")),
                (_, AbscessDetection::Reoperation) => {
                    definite(format!("{layer} abscess at reoperation"))
                }
                (_, AbscessDetection::Histopathology) => {
                    definite(format!("{layer} abscess on histopathology"))
                }
            },
            SsiFindingKind::DeliberateOpening { culture } => {
                if layer == TissueLayer::OrganSpace {
                    return Err("deliberate opening applies to incisional layers".to_string());
                }
                let days = self.tables.ssi.sign_window_days;
                let window = DateWindow::around(finding.observed_on, days, days);
                let Some(sign) = case
                    .signs
                    .iter()
                    .find(|s| window.contains(s.observed_on) && self.is_compatible_sign(layer, s))
                else {
                    return Err(format!(
                        "deliberate {layer} opening without a compatible sign within {days} days"
                    ));
                };
                match culture {
                    CultureStatus::Positive => Ok((
                        ConfidenceLevel::Definite,
                        format!("deliberate {layer} opening, culture positive, {}", sign.kind),
                        Some(sign),
                    )),
                    CultureStatus::NotPerformed => Ok((
                        ConfidenceLevel::Possible,
                        format!("deliberate {layer} opening, culture not performed, {}", sign.kind),
                        Some(sign),
                    )),
                    CultureStatus::Negative => {
                        let diagnosed = case.findings.iter().any(|f| {
                            f.layer == layer && f.kind == SsiFindingKind::ClinicianDiagnosis
                        });
                        if diagnosed {
                            Ok((
                                ConfidenceLevel::Probable,
                                format!(
                                    "deliberate {layer} opening, culture negative with clinician diagnosis, {}",
                                    sign.kind
                                ),
                                Some(sign),
                            ))
                        } else {
                            Err(format!("deliberate {layer} opening with negative culture"))
                        }
                    }
                }
            }
        }
    }

    fn evaluate_tier(tier: SsiClass, qualifying: &[Qualifying<'_>]) -> TierEvaluation<SsiClass> {
        let matches: Vec<&Qualifying<'_>> = qualifying.iter().filter(|q| q.tier == tier).collect();
        let Some(grade) = matches.iter().map(|q| q.grade).max() else {
            return TierEvaluation::unmet(tier).note(format!(
                "findings: no qualifying {} finding",
                Classification::Ssi(tier).label()
            ));
        };
        let earliest: Option<NaiveDate> = matches.iter().map(|q| q.finding.observed_on).min();

        let mut eval = TierEvaluation::met(tier, grade).on(earliest);
        for q in matches {
            let text = if q.finding.text.trim().is_empty() {
                describe(&q.finding.kind).to_string()
            } else {
                q.finding.text.clone()
            };
            eval = eval
                .note(format!(
                    "findings[{}]: {} on POD {} ({})",
                    q.index, q.reason, q.pod, q.grade
                ))
                .support(EvidenceItem::new(text, &q.finding.source).with_relevance("ssi_finding"));
            if let Some(sign) = q.sign {
                eval = eval.support(
                    EvidenceItem::new(sign.kind.to_string(), &sign.source)
                        .with_relevance("ssi_sign"),
                );
            }
        }
        eval
    }
}

impl CriteriaEngine for SsiEngine {
    type Case = SsiCase;

    fn hai_type(&self) -> HaiType {
        HaiType::Ssi
    }

    fn classify(&self, case: &SsiCase) -> ClassificationDecision {
        let t = &self.tables.ssi;
        let mut draft = DecisionDraft::new(HaiType::Ssi, &self.tables);
        let no_ssi = Classification::Ssi(SsiClass::NoSsi);

        let Some(procedure) = &case.procedure else {
            draft.missing("procedure");
            return draft.incomplete();
        };

        if !self.tables.is_operative_category(&procedure.category) {
            draft.note(format!(
                "procedure: {} is not an NHSN operative procedure category",
                procedure.category
            ));
            return draft.finish(DecisionOutcome::NotHai, no_ssi, ConfidenceLevel::Definite, None);
        }

        let window_days = if procedure.implant {
            t.implant_window_days
        } else {
            t.standard_window_days
        };
        draft.note(format!(
            "procedure: {} on {}, {}surveillance window {window_days} days",
            procedure.category,
            procedure.performed_on,
            if procedure.implant { "implant, " } else { "" }
        ));
        draft.support(
            EvidenceItem::new(
                format!("{} performed {}", procedure.category, procedure.performed_on),
                &procedure.source,
            )
            .with_relevance("procedure"),
        );

        if case.findings.is_empty() {
            draft.note("findings: no wound or operative findings recorded");
            return draft.finish(DecisionOutcome::NotHai, no_ssi, ConfidenceLevel::Insufficient, None);
        }

        let mut qualifying = Vec::new();
        let mut outside_window = 0usize;
        for (index, finding) in case.findings.iter().enumerate() {
            let pod = (finding.observed_on - procedure.performed_on).num_days();
            match self.grade(case, finding) {
                Ok((grade, reason, sign)) if (0..window_days).contains(&pod) => {
                    qualifying.push(Qualifying {
                        index,
                        finding,
                        tier: tier_for(finding.layer),
                        grade,
                        reason,
                        pod,
                        sign,
                    });
                }
                Ok(_) => {
                    outside_window += 1;
                    draft.note(format!(
                        "findings[{index}]: {} on POD {pod} is outside the {window_days}-day window",
                        describe(&finding.kind)
                    ));
                    draft.contradict(
                        EvidenceItem::new(describe(&finding.kind), &finding.source)
                            .with_relevance("outside_window"),
                    );
                }
                Err(reason) => draft.note(format!("findings[{index}]: {reason}")),
            }
        }

        if qualifying.is_empty() {
            let confidence = if outside_window > 0 {
                ConfidenceLevel::Definite
            } else {
                ConfidenceLevel::Insufficient
            };
            debug!(hai_type = "SSI", tier = "none", %confidence, "ssi ladder resolved");
            return draft.finish(DecisionOutcome::NotHai, no_ssi, confidence, None);
        }

        let outcome = resolve(vec![
            Self::evaluate_tier(SsiClass::OrganSpace, &qualifying),
            Self::evaluate_tier(SsiClass::DeepIncisional, &qualifying),
            Self::evaluate_tier(SsiClass::SuperficialIncisional, &qualifying),
        ]);
        draft.absorb(&outcome);
        debug!(
            hai_type = "SSI",
            tier = ?outcome.tier,
            confidence = %outcome.confidence,
            "ssi ladder resolved"
        );

        let class = outcome.tier.unwrap_or(SsiClass::NoSsi);
        draft.finish(
            DecisionOutcome::HaiConfirmed,
            Classification::Ssi(class),
            outcome.confidence,
            outcome.event_date,
        )
    }
}
