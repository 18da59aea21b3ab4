//! Central-line-associated bloodstream infection criteria.
//!
//! Ladder: MBI-LCBI, LCBI-1, LCBI-2. MBI-LCBI only reclassifies a case that
//! meets LCBI-1 or LCBI-2. The date of event is anchored on a culture that
//! can meet a criterion: a non-commensal isolate, or the first culture of a
//! matching commensal pair. Anchors are tried in date order; symptoms, host
//! conditions and alternative sites only count inside the infection window
//! around the anchor.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use hai_domain::case::{
    AlternativeSiteFinding, BloodCulture, CentralLine, ClabsiCase, SiteDocumentation, SymptomKind,
    SymptomObservation,
};
use hai_domain::reference::same_organism;
use hai_domain::{
    ClabsiClass, Classification, ClassificationDecision, ConfidenceLevel, DecisionOutcome,
    EvidenceItem, HaiType, KnowledgeTables,
};

use super::ladder::{resolve, DecisionDraft, TierEvaluation};
use super::{CriteriaEngine, DateWindow};

fn organism(culture: &BloodCulture) -> Option<&str> {
    culture
        .organism
        .as_deref()
        .filter(|o| !o.trim().is_empty())
}

fn culture_item(culture: &BloodCulture, relevance: &str) -> EvidenceItem {
    EvidenceItem::new(
        format!(
            "blood culture {} {}: {}",
            culture.accession,
            culture.collected_at.format("%Y-%m-%d %H:%M"),
            organism(culture).unwrap_or("no growth")
        ),
        &culture.source,
    )
    .with_relevance(relevance)
}

/// Evaluates CLABSI criteria against blood cultures and line data.
#[derive(Debug, Clone)]
pub struct ClabsiEngine {
    tables: Arc<KnowledgeTables>,
}

impl ClabsiEngine {
    pub fn new(tables: Arc<KnowledgeTables>) -> Self {
        Self { tables }
    }

    fn is_compatible_symptom(&self, symptom: &SymptomObservation) -> bool {
        match symptom.kind {
            SymptomKind::Fever => symptom
                .temperature_celsius
                .map_or(true, |t| t > self.tables.clabsi.fever_celsius),
            SymptomKind::Chills | SymptomKind::Hypotension => true,
        }
    }

    fn evaluate_mbi(
        &self,
        case: &ClabsiCase,
        positives: &[&BloodCulture],
        window: &DateWindow,
        doe: NaiveDate,
        qualifying: bool,
    ) -> TierEvaluation<ClabsiClass> {
        if !qualifying {
            return TierEvaluation::unmet(ClabsiClass::MbiLcbi)
                .note("blood_cultures: neither LCBI-1 nor LCBI-2 met, MBI-LCBI does not apply");
        }
        let ineligible = positives
            .iter()
            .filter_map(|c| organism(c))
            .find(|o| !self.tables.is_mbi_eligible(o));
        if let Some(organism) = ineligible {
            return TierEvaluation::unmet(ClabsiClass::MbiLcbi)
                .note(format!("blood_cultures: {organism} is not an MBI-eligible organism"));
        }

        let condition = case
            .host_conditions
            .iter()
            .find(|h| window.contains(h.noted_on));
        match condition {
            Some(host) => {
                let mut eval = TierEvaluation::met(ClabsiClass::MbiLcbi, ConfidenceLevel::Definite)
                    .note(format!(
                        "blood_cultures[{}]: MBI-eligible organism isolated",
                        positives[0].accession
                    ))
                    .note(format!(
                        "host_conditions[{}]: {} within infection window",
                        host.noted_on, host.condition
                    ))
                    .support(
                        EvidenceItem::new(host.condition.to_string(), &host.source)
                            .with_relevance("mbi_host_condition"),
                    )
                    .on(Some(doe));
                for culture in positives {
                    eval = eval.support(culture_item(culture, "mbi_organism"));
                }
                eval
            }
            None => TierEvaluation::unmet(ClabsiClass::MbiLcbi).note(format!(
                "host_conditions: no neutropenia, severe mucositis or GVHD between {} and {}",
                window.start, window.end
            )),
        }
    }

    fn evaluate_lcbi1(
        &self,
        positives: &[&BloodCulture],
        doe: NaiveDate,
    ) -> TierEvaluation<ClabsiClass> {
        let non_commensal: Vec<(&BloodCulture, &str)> = positives
            .iter()
            .filter_map(|c| organism(c).map(|o| (*c, o)))
            .filter(|(_, o)| !self.tables.is_common_commensal(o))
            .collect();

        let recognized = non_commensal
            .iter()
            .find(|(_, o)| self.tables.is_recognized_pathogen(o));
        if let Some((culture, organism)) = recognized {
            return TierEvaluation::met(ClabsiClass::Lcbi1, ConfidenceLevel::Definite)
                .note(format!(
                    "blood_cultures[{}]: recognized pathogen {organism}",
                    culture.accession
                ))
                .support(culture_item(culture, "recognized_pathogen"))
                .on(Some(doe));
        }
        if let Some((culture, organism)) = non_commensal.first() {
            return TierEvaluation::met(ClabsiClass::Lcbi1, ConfidenceLevel::Probable)
                .note(format!(
                    "blood_cultures[{}]: {organism} is on neither organism list, treated as a pathogen",
                    culture.accession
                ))
                .support(culture_item(culture, "unlisted_organism"))
                .on(Some(doe));
        }
        TierEvaluation::unmet(ClabsiClass::Lcbi1)
            .note("blood_cultures: only common commensal organisms isolated")
    }

    fn is_commensal(&self, culture: &BloodCulture) -> bool {
        organism(culture).is_some_and(|o| self.tables.is_common_commensal(o))
    }

    /// Two separate draws of the same commensal species within the match window.
    /// `first` must not be collected after `second`.
    fn is_matching_pair(&self, first: &BloodCulture, second: &BloodCulture) -> bool {
        let max_spread = Duration::hours(self.tables.clabsi.commensal_match_window_hours);
        let spread = second.collected_at - first.collected_at;
        let separate = first.accession != second.accession && spread > Duration::zero();
        let same = match (organism(first), organism(second)) {
            (Some(a), Some(b)) => same_organism(a, b),
            _ => false,
        };
        separate && same && spread <= max_spread
    }

    fn matching_commensal_pair<'a>(
        &self,
        positives: &[&'a BloodCulture],
    ) -> Option<(&'a BloodCulture, &'a BloodCulture)> {
        let commensals: Vec<&BloodCulture> = positives
            .iter()
            .copied()
            .filter(|c| self.is_commensal(c))
            .collect();

        for (i, first) in commensals.iter().enumerate() {
            for second in &commensals[i + 1..] {
                if self.is_matching_pair(first, second) {
                    return Some((*first, *second));
                }
            }
        }
        None
    }

    /// Candidate dates of event, ascending and distinct.
    ///
    /// A lone commensal never anchors the infection window.
    fn anchor_dates(&self, positives: &[&BloodCulture]) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = Vec::new();
        for (i, culture) in positives.iter().enumerate() {
            let anchors = if self.is_commensal(culture) {
                positives[i + 1..]
                    .iter()
                    .any(|later| self.is_commensal(later) && self.is_matching_pair(culture, later))
            } else {
                true
            };
            if anchors {
                dates.push(culture.collected_at.date_naive());
            }
        }
        dates.sort();
        dates.dedup();
        dates
    }

    fn evaluate_lcbi2(
        &self,
        case: &ClabsiCase,
        positives: &[&BloodCulture],
        window: &DateWindow,
        doe: NaiveDate,
    ) -> TierEvaluation<ClabsiClass> {
        let commensal_count = positives.iter().filter(|c| self.is_commensal(c)).count();
        if commensal_count == 0 {
            return TierEvaluation::unmet(ClabsiClass::Lcbi2)
                .note("blood_cultures: no common commensal isolated");
        }

        let Some((first, second)) = self.matching_commensal_pair(positives) else {
            let line = if commensal_count == 1 {
                "blood_cultures: single commensal culture is not sufficient".to_string()
            } else {
                format!(
                    "blood_cultures: commensal cultures do not match by genus and species within {} h",
                    self.tables.clabsi.commensal_match_window_hours
                )
            };
            return TierEvaluation::unmet(ClabsiClass::Lcbi2).note(line);
        };

        let symptom = case
            .symptoms
            .iter()
            .find(|s| window.contains(s.observed_at.date_naive()) && self.is_compatible_symptom(s));
        let hours = (second.collected_at - first.collected_at).num_hours();
        let matched = format!(
            "blood_cultures[{}, {}]: {} isolated twice, {hours} h apart",
            first.accession,
            second.accession,
            organism(first).unwrap_or_default()
        );

        match symptom {
            Some(symptom) => TierEvaluation::met(ClabsiClass::Lcbi2, ConfidenceLevel::Probable)
                .note(matched)
                .note(format!(
                    "symptoms[{}]: {} within infection window",
                    symptom.observed_at.format("%Y-%m-%d"),
                    symptom.kind
                ))
                .support(culture_item(first, "commensal_match"))
                .support(culture_item(second, "commensal_match"))
                .support(
                    EvidenceItem::new(symptom.kind.to_string(), &symptom.source)
                        .with_relevance("symptom"),
                )
                .on(Some(doe)),
            None => TierEvaluation::unmet(ClabsiClass::Lcbi2)
                .note(matched)
                .note(format!(
                    "symptoms: no fever, chills or hypotension between {} and {}",
                    window.start, window.end
                )),
        }
    }

    /// Line eligibility, exclusions and the tier ladder around one date of event.
    fn classify_anchored(
        &self,
        case: &ClabsiCase,
        line: &CentralLine,
        positives: &[&BloodCulture],
        doe: NaiveDate,
        mut draft: DecisionDraft,
    ) -> ClassificationDecision {
        let t = &self.tables.clabsi;
        let not_clabsi = Classification::Clabsi(ClabsiClass::NotClabsi);

        let line_days = (doe - line.inserted_on).num_days() + 1;
        if line_days <= t.min_line_days {
            draft.note(format!(
                "central_line: in place {line_days} days on {doe}, more than {} required",
                t.min_line_days
            ));
            draft.contradict(
                EvidenceItem::new(format!("line inserted {}", line.inserted_on), &line.source)
                    .with_relevance("line_days"),
            );
            return draft.finish(DecisionOutcome::NotHai, not_clabsi, ConfidenceLevel::Definite, None);
        }
        if let Some(removed) = line.removed_on.filter(|r| *r < doe - Duration::days(1)) {
            draft.note(format!(
                "central_line: removed {removed}, more than one day before {doe}"
            ));
            draft.contradict(
                EvidenceItem::new(format!("line removed {removed}"), &line.source)
                    .with_relevance("line_removed"),
            );
            return draft.finish(DecisionOutcome::NotHai, not_clabsi, ConfidenceLevel::Definite, None);
        }
        draft.note(format!(
            "central_line: in place {line_days} days on date of event {doe}"
        ));
        draft.support(
            EvidenceItem::new(format!("central line inserted {}", line.inserted_on), &line.source)
                .with_relevance("central_line"),
        );

        let window = DateWindow::around(doe, t.infection_window_days, t.infection_window_days);
        let in_window: Vec<&BloodCulture> = positives
            .iter()
            .copied()
            .filter(|c| window.contains(c.collected_at.date_naive()))
            .collect();

        if let Some(site) = Self::alternative_site(case, &window, SiteDocumentation::Documented) {
            draft.note(format!(
                "alternative_sites[{}]: documented {} infection explains the bacteremia",
                site.noted_on, site.site
            ));
            draft.contradict(
                EvidenceItem::new(format!("{} infection", site.site), &site.source)
                    .with_relevance("alternative_source"),
            );
            draft.alternative_source(site.site.clone());
            debug!(hai_type = "CLABSI", tier = "excluded", "clabsi ladder resolved");
            return draft.finish(DecisionOutcome::NotHai, not_clabsi, ConfidenceLevel::Definite, None);
        }

        let lcbi1 = self.evaluate_lcbi1(&in_window, doe);
        let lcbi2 = self.evaluate_lcbi2(case, &in_window, &window, doe);
        let qualifying = lcbi1.satisfied || lcbi2.satisfied;
        let outcome = resolve(vec![
            self.evaluate_mbi(case, &in_window, &window, doe, qualifying),
            lcbi1,
            lcbi2,
        ]);
        draft.absorb(&outcome);
        debug!(
            hai_type = "CLABSI",
            tier = ?outcome.tier,
            confidence = %outcome.confidence,
            "clabsi ladder resolved"
        );

        let Some(class) = outcome.tier else {
            return draft.finish(
                DecisionOutcome::NotHai,
                not_clabsi,
                ConfidenceLevel::Insufficient,
                None,
            );
        };

        match Self::alternative_site(case, &window, SiteDocumentation::Suspected) {
            Some(site) => {
                draft.note(format!(
                    "alternative_sites[{}]: suspected {} infection, needs review",
                    site.noted_on, site.site
                ));
                draft.contradict(
                    EvidenceItem::new(format!("suspected {} infection", site.site), &site.source)
                        .with_relevance("alternative_source"),
                );
                draft.alternative_source(format!("suspected {}", site.site));
                draft.finish(
                    DecisionOutcome::PendingReview,
                    Classification::Clabsi(class),
                    outcome.confidence.min(ConfidenceLevel::Possible),
                    outcome.event_date,
                )
            }
            None => draft.finish(
                DecisionOutcome::HaiConfirmed,
                Classification::Clabsi(class),
                outcome.confidence,
                outcome.event_date,
            ),
        }
    }

    fn alternative_site<'a>(
        case: &'a ClabsiCase,
        window: &DateWindow,
        documentation: SiteDocumentation,
    ) -> Option<&'a AlternativeSiteFinding> {
        case.alternative_sites
            .iter()
            .find(|a| a.documentation == documentation && window.contains(a.noted_on))
    }
}

impl CriteriaEngine for ClabsiEngine {
    type Case = ClabsiCase;

    fn hai_type(&self) -> HaiType {
        HaiType::Clabsi
    }

    fn classify(&self, case: &ClabsiCase) -> ClassificationDecision {
        let mut draft = DecisionDraft::new(HaiType::Clabsi, &self.tables);
        let not_clabsi = Classification::Clabsi(ClabsiClass::NotClabsi);

        if case.central_line.is_none() {
            draft.missing("central_line");
        }
        if case.blood_cultures.is_empty() {
            draft.missing("blood_cultures");
        }
        let line = match &case.central_line {
            Some(line) if !draft.has_missing() => line,
            _ => return draft.incomplete(),
        };

        let mut positives: Vec<&BloodCulture> = case
            .blood_cultures
            .iter()
            .filter(|c| organism(c).is_some())
            .collect();
        positives.sort_by(|a, b| {
            (a.collected_at, &a.accession).cmp(&(b.collected_at, &b.accession))
        });
        let Some(first) = positives.first() else {
            draft.note(format!(
                "blood_cultures: {} cultures, none positive",
                case.blood_cultures.len()
            ));
            return draft.finish(
                DecisionOutcome::NotHai,
                not_clabsi,
                ConfidenceLevel::Definite,
                None,
            );
        };
        let mut anchors = self.anchor_dates(&positives).into_iter();
        let earliest = anchors
            .next()
            .unwrap_or_else(|| first.collected_at.date_naive());

        let decision = self.classify_anchored(case, line, &positives, earliest, draft.clone());
        if decision.decision != DecisionOutcome::NotHai {
            return decision;
        }
        for doe in anchors {
            let later = self.classify_anchored(case, line, &positives, doe, draft.clone());
            if later.decision != DecisionOutcome::NotHai {
                return later;
            }
        }
        decision
    }
}
