//! Engine-ready structured case data.
//!
//! Case data is derived from one or more extraction records and is never
//! mutated by an engine. Every item carries a `source` identifier so each
//! reasoning statement can be traced back to the span it came from.

pub mod clabsi;
pub mod ssi;
pub mod vae;

use serde::{Deserialize, Serialize};

use crate::decision::HaiType;

pub use clabsi::{
    AlternativeSiteFinding, BloodCulture, CentralLine, ClabsiCase, HostCondition,
    HostConditionFinding, SiteDocumentation, SymptomKind, SymptomObservation,
};
pub use ssi::{
    AbscessDetection, CultureStatus, IncisionSign, OperativeProcedure, SignKind, SsiCase,
    SsiFinding, SsiFindingKind, TissueLayer,
};
pub use vae::{
    AlternativeMicrobiology, AlternativeMicrobiologyKind, AntimicrobialCourse,
    DailyVentilatorSettings, GrowthQuantity, Measurement, RespiratoryCulture,
    RespiratorySpecimen, SecretionSample, SemiQuantGrowth, VaeCase,
};

/// Structured case data for any supported HAI type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hai_type", content = "case", rename_all = "snake_case")]
pub enum CaseData {
    Clabsi(ClabsiCase),
    Ssi(SsiCase),
    Vae(VaeCase),
}

impl CaseData {
    pub fn hai_type(&self) -> HaiType {
        match self {
            Self::Clabsi(_) => HaiType::Clabsi,
            Self::Ssi(_) => HaiType::Ssi,
            Self::Vae(_) => HaiType::Vae,
        }
    }
}
