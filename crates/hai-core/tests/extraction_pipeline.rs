//! Extraction records through normalization into the engines and lifecycle.

mod common;

use std::sync::Arc;

use common::*;

use hai_core::{normalize, LifecycleManager, Transition};
use hai_domain::extraction::{VaeExtraction, VentilatorReading, VitalReading};
use hai_domain::{
    CaseData, EvidenceSpan, Extracted, ExtractionPayload, ExtractionRecord, HaiType, QueueType,
};
use hai_state::MemorySurveillanceStore;

fn vent(d: u32, hour: u32, peep: f64) -> Extracted<VentilatorReading> {
    Extracted::new(VentilatorReading {
        taken_at: at(d, hour),
        fio2_percent: Some(40.0),
        peep_cmh2o: Some(peep),
    })
    .with_span(EvidenceSpan::new(format!("flowsheet-{d}"), "PEEP").with_offsets(0, 4))
}

/// Two notes: days 1-2 from the first, days 3-4 (with a stray high reading
/// on day 2) from the second.
fn records() -> Vec<ExtractionRecord> {
    let first = VaeExtraction {
        ventilation_start: Some(Extracted::new(day(1))),
        ventilator_readings: vec![vent(1, 6, 5.0), vent(1, 18, 6.0), vent(2, 6, 5.0)],
        ..VaeExtraction::default()
    };
    let second = VaeExtraction {
        ventilator_readings: vec![vent(2, 20, 10.0), vent(3, 6, 9.0), vent(4, 6, 9.0)],
        temperatures: vec![Extracted::new(VitalReading {
            taken_at: at(3, 12),
            value: 37.2,
        })],
        ..VaeExtraction::default()
    };
    vec![
        ExtractionRecord::new("note-b", at(5, 0), ExtractionPayload::Vae(second)),
        ExtractionRecord::new("note-a", at(4, 0), ExtractionPayload::Vae(first)),
    ]
}

#[test]
fn test_record_order_does_not_change_case() {
    let mut reversed = records();
    reversed.reverse();
    assert_eq!(
        normalize(HaiType::Vae, &records()).unwrap(),
        normalize(HaiType::Vae, &reversed).unwrap()
    );
}

#[test]
fn test_daily_minimum_drives_vac() {
    let case = normalize(HaiType::Vae, &records()).unwrap();
    let CaseData::Vae(vae) = &case else {
        panic!("expected VAE case");
    };
    assert_eq!(vae.daily_settings.len(), 4);
    assert_eq!(vae.daily_settings[1].min_peep_cmh2o, Some(5.0));
    assert_eq!(vae.temperatures.len(), 1);

    let decision = engine().classify(&case);
    assert_eq!(decision.event_date, Some(day(3)));
    assert!(decision
        .supporting_evidence
        .iter()
        .any(|e| e.source == "flowsheet-3#0..4"));
}

#[tokio::test]
async fn test_records_are_classified_and_queued() {
    let store = Arc::new(MemorySurveillanceStore::new());
    let manager = LifecycleManager::new(store, engine());
    let candidate = manager
        .register_candidate(HaiType::Vae, "patient-9")
        .await
        .unwrap();

    let transition = manager
        .classify_records(&candidate.id, &records())
        .await
        .unwrap();
    match transition {
        Transition::QueuedForReview { review } => assert_eq!(review.queue_type, QueueType::Vae),
        other => panic!("expected review, got {other:?}"),
    }
}
