//! End-to-end VAE ladder: VAC, IVAC, possible VAP, probable VAP.

mod common;

use common::*;

use hai_core::{Acceptance, AcceptancePolicy, CriteriaEngine, VaeEngine};
use hai_domain::case::{AlternativeMicrobiology, AlternativeMicrobiologyKind, VaeCase};
use hai_domain::{Classification, ConfidenceLevel, DecisionOutcome, VaeClass};

fn vae_engine() -> VaeEngine {
    VaeEngine::new(tables())
}

fn vac_case() -> VaeCase {
    ventilated_with_peep(&[5.0, 5.0, 9.0, 9.0])
}

fn ivac_case() -> VaeCase {
    let mut case = vac_case();
    case.temperatures.push(temperature(day(3), 38.5));
    case.antimicrobials
        .push(course("Meropenem", day(3), day(6)));
    case
}

fn possible_vap_case() -> VaeCase {
    let mut case = ivac_case();
    case.secretions.push(purulent_secretions(day(3)));
    case
}

fn probable_vap_case() -> VaeCase {
    let mut case = possible_vap_case();
    case.respiratory_cultures
        .push(eta_culture(day(4), "Pseudomonas aeruginosa", 100_000.0));
    case
}

#[test]
fn test_peep_rise_is_vac() {
    let decision = vae_engine().classify(&vac_case());
    assert_eq!(decision.decision, DecisionOutcome::HaiConfirmed);
    assert_eq!(decision.classification, Classification::Vae(VaeClass::Vac));
    assert_eq!(decision.confidence, ConfidenceLevel::Possible);
    assert_eq!(decision.event_date, Some(day(3)));
    assert!(decision.reasoning.contains("PEEP baseline 5.0"));
}

#[test]
fn test_fever_and_new_antimicrobial_is_ivac() {
    let decision = vae_engine().classify(&ivac_case());
    assert_eq!(decision.classification, Classification::Vae(VaeClass::Ivac));
    assert!(decision
        .supporting_evidence
        .iter()
        .any(|e| e.text.contains("Meropenem")));
}

#[test]
fn test_purulent_secretions_is_possible_vap() {
    let decision = vae_engine().classify(&possible_vap_case());
    assert_eq!(
        decision.classification,
        Classification::Vae(VaeClass::PossibleVap)
    );
    assert_eq!(decision.confidence, ConfidenceLevel::Probable);
}

#[test]
fn test_threshold_culture_is_probable_vap() {
    let decision = vae_engine().classify(&probable_vap_case());
    assert_eq!(
        decision.classification,
        Classification::Vae(VaeClass::ProbableVap)
    );
    assert_eq!(decision.confidence, ConfidenceLevel::Definite);
    assert_eq!(decision.event_date, Some(day(3)));
}

#[test]
fn test_culture_below_threshold_stays_possible_vap() {
    let mut case = possible_vap_case();
    case.respiratory_cultures
        .push(eta_culture(day(4), "Pseudomonas aeruginosa", 10_000.0));
    let decision = vae_engine().classify(&case);
    assert_eq!(
        decision.classification,
        Classification::Vae(VaeClass::PossibleVap)
    );
}

#[test]
fn test_excluded_flora_does_not_count() {
    let mut case = ivac_case();
    case.respiratory_cultures
        .push(eta_culture(day(4), "Candida albicans", 1_000_000.0));
    let decision = vae_engine().classify(&case);
    assert_eq!(decision.classification, Classification::Vae(VaeClass::Ivac));
}

#[test]
fn test_alternative_microbiology_is_probable_vap() {
    let mut case = ivac_case();
    case.alternative_microbiology.push(AlternativeMicrobiology {
        kind: AlternativeMicrobiologyKind::LegionellaPositive,
        collected_on: day(4),
        organism: None,
        source: "urine-antigen".to_string(),
    });
    let decision = vae_engine().classify(&case);
    assert_eq!(
        decision.classification,
        Classification::Vae(VaeClass::ProbableVap)
    );
}

#[test]
fn test_short_antimicrobial_course_is_not_ivac() {
    let mut case = vac_case();
    case.temperatures.push(temperature(day(3), 38.5));
    case.antimicrobials
        .push(course("Meropenem", day(3), day(5)));
    let decision = vae_engine().classify(&case);
    assert_eq!(decision.classification, Classification::Vae(VaeClass::Vac));
}

#[test]
fn test_continued_antimicrobial_is_not_new() {
    let mut case = vac_case();
    case.temperatures.push(temperature(day(3), 38.5));
    case.antimicrobials
        .push(course("Meropenem", day(1), day(2)));
    case.antimicrobials
        .push(course("Meropenem", day(3), day(6)));
    let decision = vae_engine().classify(&case);
    assert_eq!(decision.classification, Classification::Vae(VaeClass::Vac));
}

#[test]
fn test_hypothermia_counts_for_ivac() {
    let mut case = vac_case();
    case.temperatures.push(temperature(day(2), 35.5));
    case.antimicrobials
        .push(course("Vancomycin", day(4), day(7)));
    let decision = vae_engine().classify(&case);
    assert_eq!(decision.classification, Classification::Vae(VaeClass::Ivac));
}

#[test]
fn test_low_peep_values_are_floored() {
    // 0 and 3 count as 5, so a rise to 7 is below the +3 threshold.
    let decision = vae_engine().classify(&ventilated_with_peep(&[0.0, 3.0, 7.0, 7.0]));
    assert_eq!(decision.decision, DecisionOutcome::NotHai);
    assert_eq!(decision.confidence, ConfidenceLevel::Insufficient);
}

#[test]
fn test_single_day_rise_is_not_vac() {
    let decision = vae_engine().classify(&ventilated_with_peep(&[5.0, 5.0, 9.0, 5.0]));
    assert_eq!(decision.decision, DecisionOutcome::NotHai);
}

#[test]
fn test_fio2_rise_is_vac() {
    let mut case = ventilated_with_peep(&[5.0, 5.0, 5.0, 5.0]);
    for (settings, fio2) in case.daily_settings.iter_mut().zip([40.0, 40.0, 60.0, 65.0]) {
        settings.min_fio2_percent = Some(fio2);
    }
    let decision = vae_engine().classify(&case);
    assert_eq!(decision.classification, Classification::Vae(VaeClass::Vac));
    assert!(decision.reasoning.contains("FiO2 baseline 40.0"));
}

#[test]
fn test_short_ventilator_series_is_left_for_review() {
    let decision = vae_engine().classify(&ventilated_with_peep(&[5.0, 5.0, 9.0]));
    assert_eq!(decision.decision, DecisionOutcome::NotHai);
    assert_eq!(decision.confidence, ConfidenceLevel::Insufficient);
    assert!(decision.reasoning.contains("3 ventilator days so far"));
    assert!(matches!(
        AcceptancePolicy::standard().evaluate(&decision),
        Acceptance::Review { .. }
    ));
}

#[test]
fn test_missing_settings_is_incomplete() {
    let case = VaeCase {
        ventilation_start: Some(day(1)),
        ..VaeCase::default()
    };
    let decision = vae_engine().classify(&case);
    assert_eq!(decision.decision, DecisionOutcome::PendingReview);
    assert_eq!(decision.confidence, ConfidenceLevel::Insufficient);
    assert_eq!(decision.missing_fields, vec!["daily_settings".to_string()]);
}
