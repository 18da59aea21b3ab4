//! CLABSI criteria: line eligibility, LCBI-1, LCBI-2 commensal matching,
//! MBI-LCBI and alternative sites.

mod common;

use std::sync::Arc;

use common::*;

use hai_core::{ClabsiEngine, CriteriaEngine};
use hai_domain::case::{
    AlternativeSiteFinding, ClabsiCase, HostCondition, HostConditionFinding, SiteDocumentation,
};
use hai_domain::reference::OrganismList;
use hai_domain::{ClabsiClass, Classification, ConfidenceLevel, DecisionOutcome};

fn clabsi_engine() -> ClabsiEngine {
    ClabsiEngine::new(tables())
}

/// Tables where Streptococcus mitis is both a commensal and MBI-eligible.
fn mitis_commensal_engine() -> ClabsiEngine {
    let mut t = (*tables()).clone();
    t.organisms.recognized_pathogens = OrganismList::new(
        t.organisms
            .recognized_pathogens
            .iter()
            .filter(|o| *o != "streptococcus mitis"),
    );
    t.organisms.common_commensals = OrganismList::new(
        t.organisms
            .common_commensals
            .iter()
            .chain(["streptococcus mitis"]),
    );
    t.validate().expect("tables stay consistent");
    ClabsiEngine::new(Arc::new(t))
}

fn neutropenia(noted: u32) -> HostConditionFinding {
    HostConditionFinding {
        condition: HostCondition::Neutropenia,
        noted_on: day(noted),
        source: "cbc".to_string(),
    }
}

/// Two S. epidermidis cultures 36 h apart with fever, line in since March 1.
fn commensal_case() -> ClabsiCase {
    ClabsiCase {
        central_line: Some(line(1)),
        blood_cultures: vec![
            culture("BC-1", at(5, 8), "Staphylococcus epidermidis"),
            culture("BC-2", at(6, 20), "Staphylococcus epidermidis"),
        ],
        symptoms: vec![fever(at(5, 6), 38.6)],
        ..ClabsiCase::default()
    }
}

#[test]
fn test_matching_commensals_with_fever_confirm_lcbi2() {
    let decision = clabsi_engine().classify(&commensal_case());
    assert_eq!(decision.decision, DecisionOutcome::HaiConfirmed);
    assert_eq!(
        decision.classification,
        Classification::Clabsi(ClabsiClass::Lcbi2)
    );
    assert_eq!(decision.confidence, ConfidenceLevel::Probable);
    assert_eq!(decision.event_date, Some(day(5)));
    assert!(decision.reasoning.contains("36 h apart"));
    assert!(!decision.is_mbi_lcbi);
}

#[test]
fn test_differing_commensals_are_insufficient() {
    let mut case = commensal_case();
    case.blood_cultures[1].organism = Some("Staphylococcus hominis".to_string());
    let decision = clabsi_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::NotHai);
    assert_eq!(decision.confidence, ConfidenceLevel::Insufficient);
    assert!(decision.reasoning.contains("do not match"));
}

#[test]
fn test_commensals_too_far_apart_do_not_match() {
    let mut case = commensal_case();
    case.blood_cultures[1].collected_at = at(8, 9);
    let decision = clabsi_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::NotHai);
}

#[test]
fn test_single_commensal_does_not_qualify() {
    let mut case = commensal_case();
    case.blood_cultures.truncate(1);
    let decision = clabsi_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::NotHai);
    assert!(decision.reasoning.contains("single commensal"));
}

#[test]
fn test_low_grade_temperature_is_not_fever() {
    let mut case = commensal_case();
    case.symptoms = vec![fever(at(5, 6), 37.9)];
    let decision = clabsi_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::NotHai);
}

#[test]
fn test_recognized_pathogen_is_definite_lcbi1() {
    let case = ClabsiCase {
        central_line: Some(line(1)),
        blood_cultures: vec![culture("BC-9", at(4, 10), "Staphylococcus aureus")],
        ..ClabsiCase::default()
    };
    let decision = clabsi_engine().classify(&case);
    assert_eq!(
        decision.classification,
        Classification::Clabsi(ClabsiClass::Lcbi1)
    );
    assert_eq!(decision.confidence, ConfidenceLevel::Definite);
}

#[test]
fn test_unlisted_organism_is_capped_at_probable() {
    let case = ClabsiCase {
        central_line: Some(line(1)),
        blood_cultures: vec![culture("BC-9", at(4, 10), "Achromobacter xylosoxidans")],
        ..ClabsiCase::default()
    };
    let decision = clabsi_engine().classify(&case);
    assert_eq!(
        decision.classification,
        Classification::Clabsi(ClabsiClass::Lcbi1)
    );
    assert_eq!(decision.confidence, ConfidenceLevel::Probable);
}

#[test]
fn test_mbi_organism_with_neutropenia_is_mbi_lcbi() {
    let case = ClabsiCase {
        central_line: Some(line(1)),
        blood_cultures: vec![culture("BC-3", at(6, 9), "Escherichia coli")],
        host_conditions: vec![HostConditionFinding {
            condition: HostCondition::Neutropenia,
            noted_on: day(4),
            source: "cbc".to_string(),
        }],
        ..ClabsiCase::default()
    };
    let decision = clabsi_engine().classify(&case);
    assert_eq!(
        decision.classification,
        Classification::Clabsi(ClabsiClass::MbiLcbi)
    );
    assert!(decision.is_mbi_lcbi);
    assert_eq!(decision.confidence, ConfidenceLevel::Definite);
}

#[test]
fn test_line_in_two_days_is_not_eligible() {
    let case = ClabsiCase {
        central_line: Some(line(4)),
        blood_cultures: vec![culture("BC-9", at(5, 10), "Staphylococcus aureus")],
        ..ClabsiCase::default()
    };
    let decision = clabsi_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::NotHai);
    assert_eq!(decision.confidence, ConfidenceLevel::Definite);
    assert!(!decision.contradicting_evidence.is_empty());
}

#[test]
fn test_line_removed_day_before_still_counts() {
    let mut central = line(1);
    central.removed_on = Some(day(4));
    let case = ClabsiCase {
        central_line: Some(central),
        blood_cultures: vec![culture("BC-9", at(5, 10), "Staphylococcus aureus")],
        ..ClabsiCase::default()
    };
    let decision = clabsi_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::HaiConfirmed);
}

#[test]
fn test_documented_alternative_site_excludes() {
    let mut case = commensal_case();
    case.alternative_sites.push(AlternativeSiteFinding {
        site: "urinary tract".to_string(),
        documentation: SiteDocumentation::Documented,
        noted_on: day(6),
        source: "id-consult".to_string(),
    });
    let decision = clabsi_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::NotHai);
    assert_eq!(decision.confidence, ConfidenceLevel::Definite);
    assert_eq!(decision.alternative_source.as_deref(), Some("urinary tract"));
}

#[test]
fn test_suspected_alternative_site_goes_to_review() {
    let mut case = commensal_case();
    case.alternative_sites.push(AlternativeSiteFinding {
        site: "pneumonia".to_string(),
        documentation: SiteDocumentation::Suspected,
        noted_on: day(5),
        source: "progress-note".to_string(),
    });
    let decision = clabsi_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::PendingReview);
    assert_eq!(decision.confidence, ConfidenceLevel::Possible);
    assert_eq!(
        decision.alternative_source.as_deref(),
        Some("suspected pneumonia")
    );
}

#[test]
fn test_no_growth_is_definite_not_hai() {
    let mut case = commensal_case();
    for c in &mut case.blood_cultures {
        c.organism = None;
    }
    let decision = clabsi_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::NotHai);
    assert_eq!(decision.confidence, ConfidenceLevel::Definite);
}

#[test]
fn test_missing_line_is_incomplete() {
    let mut case = commensal_case();
    case.central_line = None;
    let decision = clabsi_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::PendingReview);
    assert_eq!(decision.missing_fields, vec!["central_line".to_string()]);
    assert!(decision.is_incomplete());
}

#[test]
fn test_single_mbi_eligible_commensal_is_not_mbi_lcbi() {
    let case = ClabsiCase {
        central_line: Some(line(1)),
        blood_cultures: vec![culture("BC-1", at(6, 9), "Streptococcus mitis")],
        host_conditions: vec![neutropenia(5)],
        ..ClabsiCase::default()
    };
    let decision = mitis_commensal_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::NotHai);
    assert_eq!(
        decision.classification,
        Classification::Clabsi(ClabsiClass::NotClabsi)
    );
    assert!(!decision.is_mbi_lcbi);
    assert!(decision.reasoning.contains("MBI-LCBI does not apply"));
}

#[test]
fn test_matched_mbi_eligible_commensals_reclassify_to_mbi_lcbi() {
    let case = ClabsiCase {
        central_line: Some(line(1)),
        blood_cultures: vec![
            culture("BC-1", at(5, 8), "Streptococcus mitis"),
            culture("BC-2", at(6, 20), "Streptococcus mitis"),
        ],
        symptoms: vec![fever(at(5, 6), 38.6)],
        host_conditions: vec![neutropenia(4)],
        ..ClabsiCase::default()
    };
    let decision = mitis_commensal_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::HaiConfirmed);
    assert_eq!(
        decision.classification,
        Classification::Clabsi(ClabsiClass::MbiLcbi)
    );
    assert!(decision.is_mbi_lcbi);
    assert_eq!(decision.event_date, Some(day(5)));
}

#[test]
fn test_lone_contaminant_does_not_anchor_the_event() {
    let case = ClabsiCase {
        central_line: Some(line(1)),
        blood_cultures: vec![
            culture("BC-1", at(5, 8), "Staphylococcus epidermidis"),
            culture("BC-7", at(15, 10), "Staphylococcus aureus"),
        ],
        ..ClabsiCase::default()
    };
    let decision = clabsi_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::HaiConfirmed);
    assert_eq!(
        decision.classification,
        Classification::Clabsi(ClabsiClass::Lcbi1)
    );
    assert_eq!(decision.confidence, ConfidenceLevel::Definite);
    assert_eq!(decision.event_date, Some(day(15)));
    assert!(decision.reasoning.contains("on date of event 2024-03-15"));
}

#[test]
fn test_later_pathogen_is_found_after_unconfirmed_pair() {
    // The day-5 pair lacks symptoms; the day-20 pathogen is its own episode.
    let mut case = commensal_case();
    case.symptoms.clear();
    case.blood_cultures
        .push(culture("BC-8", at(20, 7), "Klebsiella pneumoniae"));
    let decision = clabsi_engine().classify(&case);
    assert_eq!(
        decision.classification,
        Classification::Clabsi(ClabsiClass::Lcbi1)
    );
    assert_eq!(decision.event_date, Some(day(20)));
}
