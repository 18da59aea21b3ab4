//! Extraction normalization.
//!
//! Merges one or more extraction records for a candidate into the
//! engine-ready [`CaseData`]. Records are applied in a stable order
//! (extraction time, then record id) so the same set of records always
//! yields the same case, whatever order they arrive in.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use hai_domain::case::{
    AlternativeMicrobiology, AlternativeSiteFinding, AntimicrobialCourse, BloodCulture,
    CentralLine, ClabsiCase, DailyVentilatorSettings, HostConditionFinding, IncisionSign,
    Measurement, OperativeProcedure, RespiratoryCulture, SecretionSample, SsiCase, SsiFinding,
    SymptomObservation, VaeCase,
};
use hai_domain::extraction::{
    ClabsiExtraction, SsiExtraction, VaeExtraction, VentilatorReading, VitalReading,
};
use hai_domain::reference::normalize_name;
use hai_domain::{
    CaseData, DomainError, DomainResult, Extracted, ExtractionPayload, ExtractionRecord, HaiType,
};

/// Case items that carry a source identifier.
trait Sourced: Clone {
    fn source_mut(&mut self) -> &mut String;
}

macro_rules! impl_sourced {
    ($($ty:ty),* $(,)?) => {
        $(impl Sourced for $ty {
            fn source_mut(&mut self) -> &mut String {
                &mut self.source
            }
        })*
    };
}

impl_sourced!(
    CentralLine,
    BloodCulture,
    SymptomObservation,
    HostConditionFinding,
    AlternativeSiteFinding,
    OperativeProcedure,
    SsiFinding,
    IncisionSign,
    AntimicrobialCourse,
    SecretionSample,
    RespiratoryCulture,
    AlternativeMicrobiology,
);

/// Clone the extracted value, filling an empty source from its provenance.
fn attributed<T: Sourced>(extracted: &Extracted<T>) -> T {
    let mut value = extracted.value.clone();
    if value.source_mut().trim().is_empty() {
        *value.source_mut() = extracted.source_id();
    }
    value
}

fn push_distinct<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Merge `records` into case data for `hai_type`.
///
/// Singleton fields (central line, procedure, ventilation start) take the
/// value from the latest record that carries one; list fields are merged
/// with exact duplicates removed.
pub fn normalize(hai_type: HaiType, records: &[ExtractionRecord]) -> DomainResult<CaseData> {
    let mut ordered: Vec<&ExtractionRecord> = records.iter().collect();
    ordered.sort_by(|a, b| (a.extracted_at, &a.record_id).cmp(&(b.extracted_at, &b.record_id)));

    if let Some(record) = ordered.iter().find(|r| r.hai_type() != hai_type) {
        return Err(DomainError::HaiTypeMismatch {
            record_id: record.record_id.clone(),
            expected: hai_type,
            found: record.hai_type(),
        });
    }

    let case = match hai_type {
        HaiType::Clabsi => CaseData::Clabsi(merge_clabsi(ordered.iter().filter_map(|r| {
            match &r.payload {
                ExtractionPayload::Clabsi(fields) => Some(fields),
                _ => None,
            }
        }))),
        HaiType::Ssi => CaseData::Ssi(merge_ssi(ordered.iter().filter_map(|r| match &r.payload {
            ExtractionPayload::Ssi(fields) => Some(fields),
            _ => None,
        }))),
        HaiType::Vae => CaseData::Vae(merge_vae(ordered.iter().filter_map(|r| match &r.payload {
            ExtractionPayload::Vae(fields) => Some(fields),
            _ => None,
        }))),
    };
    Ok(case)
}

// ---------------------------------------------------------------------------
// CLABSI
// ---------------------------------------------------------------------------

fn merge_clabsi<'a>(records: impl Iterator<Item = &'a ClabsiExtraction>) -> ClabsiCase {
    let mut case = ClabsiCase::default();
    // Same accession and organism is one culture; later records win.
    let mut cultures: BTreeMap<(String, String), BloodCulture> = BTreeMap::new();

    for record in records {
        if let Some(line) = &record.central_line {
            case.central_line = Some(attributed(line));
        }
        for culture in &record.blood_cultures {
            let culture = attributed(culture);
            let key = (
                culture.accession.trim().to_string(),
                normalize_name(culture.organism.as_deref().unwrap_or_default()),
            );
            cultures.insert(key, culture);
        }
        for symptom in &record.symptoms {
            push_distinct(&mut case.symptoms, attributed(symptom));
        }
        for condition in &record.host_conditions {
            push_distinct(&mut case.host_conditions, attributed(condition));
        }
        for site in &record.alternative_sites {
            push_distinct(&mut case.alternative_sites, attributed(site));
        }
    }

    case.blood_cultures = cultures.into_values().collect();
    case.blood_cultures
        .sort_by(|a, b| (a.collected_at, &a.accession).cmp(&(b.collected_at, &b.accession)));
    case.symptoms.sort_by_key(|s| s.observed_at);
    case.host_conditions.sort_by_key(|h| h.noted_on);
    case.alternative_sites.sort_by_key(|a| a.noted_on);
    case
}

// ---------------------------------------------------------------------------
// SSI
// ---------------------------------------------------------------------------

fn merge_ssi<'a>(records: impl Iterator<Item = &'a SsiExtraction>) -> SsiCase {
    let mut case = SsiCase::default();
    for record in records {
        if let Some(procedure) = &record.procedure {
            case.procedure = Some(attributed(procedure));
        }
        for finding in &record.findings {
            push_distinct(&mut case.findings, attributed(finding));
        }
        for sign in &record.signs {
            push_distinct(&mut case.signs, attributed(sign));
        }
    }
    case.findings.sort_by_key(|f| f.observed_on);
    case.signs.sort_by_key(|s| s.observed_on);
    case
}

// ---------------------------------------------------------------------------
// VAE
// ---------------------------------------------------------------------------

fn merge_vae<'a>(records: impl Iterator<Item = &'a VaeExtraction>) -> VaeCase {
    let mut case = VaeCase::default();
    let mut readings: BTreeMap<DateTime<Utc>, (VentilatorReading, String)> = BTreeMap::new();
    let mut temperatures: BTreeMap<DateTime<Utc>, (f64, String)> = BTreeMap::new();
    let mut wbc_counts: BTreeMap<DateTime<Utc>, (f64, String)> = BTreeMap::new();

    for record in records {
        if let Some(start) = &record.ventilation_start {
            case.ventilation_start = Some(start.value);
        }
        for reading in &record.ventilator_readings {
            readings.insert(
                reading.value.taken_at,
                (reading.value.clone(), reading.source_id()),
            );
        }
        collect_vitals(&mut temperatures, &record.temperatures);
        collect_vitals(&mut wbc_counts, &record.wbc_counts);
        for course in &record.antimicrobials {
            push_distinct(&mut case.antimicrobials, attributed(course));
        }
        for sample in &record.secretions {
            push_distinct(&mut case.secretions, attributed(sample));
        }
        for culture in &record.respiratory_cultures {
            push_distinct(&mut case.respiratory_cultures, attributed(culture));
        }
        for finding in &record.alternative_microbiology {
            push_distinct(&mut case.alternative_microbiology, attributed(finding));
        }
    }

    case.daily_settings = daily_minimums(readings.into_values());
    case.temperatures = measurements(temperatures);
    case.wbc_counts = measurements(wbc_counts);
    case.antimicrobials.sort_by_key(|c| c.start);
    case.secretions.sort_by_key(|s| s.collected_on);
    case.respiratory_cultures.sort_by_key(|c| c.collected_on);
    case.alternative_microbiology.sort_by_key(|a| a.collected_on);
    case
}

fn collect_vitals(
    into: &mut BTreeMap<DateTime<Utc>, (f64, String)>,
    readings: &[Extracted<VitalReading>],
) {
    for reading in readings {
        into.insert(reading.value.taken_at, (reading.value.value, reading.source_id()));
    }
}

fn measurements(readings: BTreeMap<DateTime<Utc>, (f64, String)>) -> Vec<Measurement> {
    readings
        .into_iter()
        .map(|(taken_at, (value, source))| Measurement {
            observed_on: taken_at.date_naive(),
            value,
            source,
        })
        .collect()
}

fn min_option(current: Option<f64>, next: Option<f64>) -> Option<f64> {
    match (current, next) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Collapse readings into one daily-minimum FiO2/PEEP per calendar day.
fn daily_minimums(
    readings: impl Iterator<Item = (VentilatorReading, String)>,
) -> Vec<DailyVentilatorSettings> {
    let mut days: BTreeMap<NaiveDate, (Option<f64>, Option<f64>, Vec<String>)> = BTreeMap::new();
    for (reading, source) in readings {
        let entry = days
            .entry(reading.taken_at.date_naive())
            .or_insert((None, None, Vec::new()));
        entry.0 = min_option(entry.0, reading.fio2_percent);
        entry.1 = min_option(entry.1, reading.peep_cmh2o);
        if !entry.2.contains(&source) {
            entry.2.push(source);
        }
    }
    days.into_iter()
        .map(|(date, (fio2, peep, sources))| DailyVentilatorSettings {
            date,
            min_fio2_percent: fio2,
            min_peep_cmh2o: peep,
            source: sources.join(","),
        })
        .collect()
}
