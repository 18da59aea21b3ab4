//! Shared fixtures for hai-core integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use hai_core::SurveillanceEngine;
use hai_domain::case::{
    AntimicrobialCourse, BloodCulture, CentralLine, DailyVentilatorSettings, GrowthQuantity,
    Measurement, OperativeProcedure, RespiratoryCulture, RespiratorySpecimen, SecretionSample,
    SsiFinding, SsiFindingKind, SymptomKind, SymptomObservation, TissueLayer, VaeCase,
};
use hai_domain::KnowledgeTables;

pub const NHSN_2024: &str = include_str!("../../../../reference/nhsn-2024.json");

pub fn tables() -> Arc<KnowledgeTables> {
    Arc::new(KnowledgeTables::from_json_str(NHSN_2024).expect("reference tables load"))
}

pub fn engine() -> SurveillanceEngine {
    SurveillanceEngine::new(tables())
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).expect("valid date")
}

pub fn at(d: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, d, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

// ---------------------------------------------------------------------------
// CLABSI
// ---------------------------------------------------------------------------

pub fn line(inserted: u32) -> CentralLine {
    CentralLine {
        inserted_on: day(inserted),
        removed_on: None,
        source: "note-line".to_string(),
    }
}

pub fn culture(accession: &str, collected_at: DateTime<Utc>, organism: &str) -> BloodCulture {
    BloodCulture {
        accession: accession.to_string(),
        collected_at,
        organism: Some(organism.to_string()),
        source: format!("lab-{accession}"),
    }
}

pub fn fever(observed_at: DateTime<Utc>, celsius: f64) -> SymptomObservation {
    SymptomObservation {
        kind: SymptomKind::Fever,
        observed_at,
        temperature_celsius: Some(celsius),
        source: "flowsheet".to_string(),
    }
}

// ---------------------------------------------------------------------------
// SSI
// ---------------------------------------------------------------------------

pub fn procedure(category: &str, performed_on: NaiveDate, implant: bool) -> OperativeProcedure {
    OperativeProcedure {
        category: category.to_string(),
        performed_on,
        implant,
        source: "op-note".to_string(),
    }
}

pub fn finding(layer: TissueLayer, kind: SsiFindingKind, observed_on: NaiveDate) -> SsiFinding {
    SsiFinding {
        layer,
        kind,
        observed_on,
        text: String::new(),
        source: format!("wound-{observed_on}"),
    }
}

// ---------------------------------------------------------------------------
// VAE
// ---------------------------------------------------------------------------

/// Ventilated from March 1 with FiO2 40% and the given daily PEEP minimums.
pub fn ventilated_with_peep(peep: &[f64]) -> VaeCase {
    VaeCase {
        ventilation_start: Some(day(1)),
        daily_settings: peep
            .iter()
            .enumerate()
            .map(|(i, p)| DailyVentilatorSettings {
                date: day(1 + i as u32),
                min_fio2_percent: Some(40.0),
                min_peep_cmh2o: Some(*p),
                source: format!("vent-{}", i + 1),
            })
            .collect(),
        ..VaeCase::default()
    }
}

pub fn temperature(observed_on: NaiveDate, value: f64) -> Measurement {
    Measurement {
        observed_on,
        value,
        source: "vitals".to_string(),
    }
}

pub fn course(agent: &str, start: NaiveDate, last_dose: NaiveDate) -> AntimicrobialCourse {
    AntimicrobialCourse {
        agent: agent.to_string(),
        start,
        last_dose,
        source: "mar".to_string(),
    }
}

pub fn purulent_secretions(collected_on: NaiveDate) -> SecretionSample {
    SecretionSample {
        collected_on,
        purulent: Some(true),
        neutrophils_per_lpf: None,
        squamous_cells_per_lpf: None,
        source: "gram-stain".to_string(),
    }
}

pub fn eta_culture(collected_on: NaiveDate, organism: &str, cfu_per_ml: f64) -> RespiratoryCulture {
    RespiratoryCulture {
        collected_on,
        specimen: RespiratorySpecimen::EndotrachealAspirate,
        organism: Some(organism.to_string()),
        growth: GrowthQuantity::Quantitative { cfu_per_ml },
        source: "micro".to_string(),
    }
}
