//! Properties shared by all engines: purity, tier monotonicity, dispatch.

mod common;

use common::*;

use hai_core::criteria::ladder::{resolve, TierEvaluation};
use hai_domain::case::{ClabsiCase, SsiCase, SsiFindingKind, TissueLayer, VaeCase};
use hai_domain::{
    CaseData, Classification, ConfidenceLevel, DecisionOutcome, HaiType, VaeClass,
};

fn vae_ladder_cases() -> Vec<VaeCase> {
    let vac = ventilated_with_peep(&[5.0, 5.0, 9.0, 9.0]);
    let mut ivac = vac.clone();
    ivac.temperatures.push(temperature(day(3), 38.5));
    ivac.antimicrobials
        .push(course("Cefepime", day(3), day(6)));
    let mut possible = ivac.clone();
    possible.secretions.push(purulent_secretions(day(3)));
    let mut probable = possible.clone();
    probable
        .respiratory_cultures
        .push(eta_culture(day(3), "Klebsiella pneumoniae", 250_000.0));
    vec![vac, ivac, possible, probable]
}

#[test]
fn test_identical_input_yields_identical_decision() {
    let engine = engine();
    let case = CaseData::Vae(vae_ladder_cases().remove(3));
    let first = engine.classify(&case);
    let second = common::engine().classify(&case);
    assert_eq!(first, second);
    assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_confidence_never_drops_as_tiers_are_added() {
    let engine = engine();
    let levels: Vec<ConfidenceLevel> = vae_ladder_cases()
        .into_iter()
        .map(|c| engine.classify(&CaseData::Vae(c)).confidence)
        .collect();
    assert!(levels.windows(2).all(|w| w[0] <= w[1]), "{levels:?}");
    assert_eq!(levels.last(), Some(&ConfidenceLevel::Definite));
}

#[test]
fn test_probable_vap_is_never_reported_as_lower_tier() {
    let decision = engine().classify(&CaseData::Vae(vae_ladder_cases().remove(3)));
    assert_eq!(decision.classification, Classification::Vae(VaeClass::ProbableVap));
    for lower in [VaeClass::PossibleVap, VaeClass::Ivac, VaeClass::Vac] {
        assert_ne!(decision.classification, Classification::Vae(lower));
    }
}

#[test]
fn test_dispatch_matches_case_type() {
    let engine = engine();
    let cases = [
        CaseData::Clabsi(ClabsiCase::default()),
        CaseData::Ssi(SsiCase::default()),
        CaseData::Vae(VaeCase::default()),
    ];
    for case in &cases {
        let decision = engine.classify(case);
        assert_eq!(decision.hai_type, case.hai_type());
        assert_eq!(decision.decision, DecisionOutcome::PendingReview);
        assert_eq!(decision.reference_version, "nhsn-2024");
    }
    assert_eq!(engine.classify(&cases[0]).hai_type, HaiType::Clabsi);
}

#[test]
fn test_every_reasoning_line_names_a_field() {
    let mut case = SsiCase {
        procedure: Some(procedure("COLO", day(1), false)),
        ..SsiCase::default()
    };
    case.findings.push(finding(
        TissueLayer::Superficial,
        SsiFindingKind::PurulentDrainage,
        day(8),
    ));
    let decision = engine().classify(&CaseData::Ssi(case));
    assert!(decision.reasoning.ends_with('\n'));
    for line in decision.reasoning_lines() {
        let (field, _) = line.split_once(": ").expect("field prefix");
        assert!(!field.is_empty(), "{line}");
    }
}

#[test]
fn test_ladder_confidence_is_max_of_satisfied_tiers() {
    let outcome = resolve(vec![
        TierEvaluation::met(1u8, ConfidenceLevel::Possible),
        TierEvaluation::unmet(2u8),
        TierEvaluation::met(3u8, ConfidenceLevel::Definite),
    ]);
    assert_eq!(outcome.tier, Some(1));
    assert_eq!(outcome.confidence, ConfidenceLevel::Definite);
}
