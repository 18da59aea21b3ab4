//! Records produced by the upstream extraction collaborator.
//!
//! Each record is an immutable, per-HAI-type bundle of optional facts. Every
//! fact carries the text spans it was read from so that case data derived
//! from it can cite a source.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::case::{
    AlternativeMicrobiology, AlternativeSiteFinding, AntimicrobialCourse, BloodCulture,
    CentralLine, HostConditionFinding, IncisionSign, OperativeProcedure, RespiratoryCulture,
    SecretionSample, SsiFinding, SymptomObservation,
};
use crate::decision::HaiType;
use crate::evidence::EvidenceSpan;

/// An extracted value plus the spans it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extracted<T> {
    pub value: T,
    #[serde(default)]
    pub provenance: Vec<EvidenceSpan>,
}

impl<T> Extracted<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            provenance: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: EvidenceSpan) -> Self {
        self.provenance.push(span);
        self
    }

    /// Source identifier of the first provenance span.
    pub fn source_id(&self) -> String {
        self.provenance
            .first()
            .map(EvidenceSpan::source_id)
            .unwrap_or_else(|| "unattributed".to_string())
    }
}

/// A single charted ventilator reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VentilatorReading {
    pub taken_at: DateTime<Utc>,
    #[serde(default)]
    pub fio2_percent: Option<f64>,
    #[serde(default)]
    pub peep_cmh2o: Option<f64>,
}

/// A single charted vital sign or lab value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalReading {
    pub taken_at: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClabsiExtraction {
    #[serde(default)]
    pub central_line: Option<Extracted<CentralLine>>,
    #[serde(default)]
    pub blood_cultures: Vec<Extracted<BloodCulture>>,
    #[serde(default)]
    pub symptoms: Vec<Extracted<SymptomObservation>>,
    #[serde(default)]
    pub host_conditions: Vec<Extracted<HostConditionFinding>>,
    #[serde(default)]
    pub alternative_sites: Vec<Extracted<AlternativeSiteFinding>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SsiExtraction {
    #[serde(default)]
    pub procedure: Option<Extracted<OperativeProcedure>>,
    #[serde(default)]
    pub findings: Vec<Extracted<SsiFinding>>,
    #[serde(default)]
    pub signs: Vec<Extracted<IncisionSign>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaeExtraction {
    #[serde(default)]
    pub ventilation_start: Option<Extracted<NaiveDate>>,
    #[serde(default)]
    pub ventilator_readings: Vec<Extracted<VentilatorReading>>,
    #[serde(default)]
    pub temperatures: Vec<Extracted<VitalReading>>,
    #[serde(default)]
    pub wbc_counts: Vec<Extracted<VitalReading>>,
    #[serde(default)]
    pub antimicrobials: Vec<Extracted<AntimicrobialCourse>>,
    #[serde(default)]
    pub secretions: Vec<Extracted<SecretionSample>>,
    #[serde(default)]
    pub respiratory_cultures: Vec<Extracted<RespiratoryCulture>>,
    #[serde(default)]
    pub alternative_microbiology: Vec<Extracted<AlternativeMicrobiology>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hai_type", content = "fields", rename_all = "snake_case")]
pub enum ExtractionPayload {
    Clabsi(ClabsiExtraction),
    Ssi(SsiExtraction),
    Vae(VaeExtraction),
}

/// One immutable extraction pass over a patient's documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub record_id: String,
    pub extracted_at: DateTime<Utc>,
    pub payload: ExtractionPayload,
}

impl ExtractionRecord {
    pub fn new(
        record_id: impl Into<String>,
        extracted_at: DateTime<Utc>,
        payload: ExtractionPayload,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            extracted_at,
            payload,
        }
    }

    pub fn hai_type(&self) -> HaiType {
        match self.payload {
            ExtractionPayload::Clabsi(_) => HaiType::Clabsi,
            ExtractionPayload::Ssi(_) => HaiType::Ssi,
            ExtractionPayload::Vae(_) => HaiType::Vae,
        }
    }
}
