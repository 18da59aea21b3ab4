//! Surgical site infection case data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperativeProcedure {
    /// NHSN operative procedure category code, e.g. `COLO`.
    pub category: String,
    pub performed_on: NaiveDate,
    #[serde(default)]
    pub implant: bool,
    #[serde(default)]
    pub source: String,
}

/// Anatomical depth a finding involves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TissueLayer {
    /// Skin and subcutaneous tissue of the incision.
    Superficial,
    /// Fascia and muscle layers.
    Deep,
    /// Any part of the body deeper than fascia/muscle opened or manipulated.
    OrganSpace,
}

impl std::fmt::Display for TissueLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Superficial => write!(f, "superficial"),
            Self::Deep => write!(f, "deep"),
            Self::OrganSpace => write!(f, "organ/space"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbscessDetection {
    Exam,
    Imaging,
    Reoperation,
    Histopathology,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CultureStatus {
    Positive,
    NotPerformed,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SsiFindingKind {
    PurulentDrainage,
    /// Purulent drainage from a drain placed into the organ/space.
    DrainPurulence,
    /// Organism from an aseptically obtained culture or aspirate.
    OrganismIdentified,
    ClinicianDiagnosis,
    /// Incision deliberately opened, aspirated or spontaneously dehisced.
    DeliberateOpening { culture: CultureStatus },
    Abscess { detected_by: AbscessDetection },
    /// Frank purulence seen at reoperation.
    ReoperationPurulence,
    StitchAbscess,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsiFinding {
    pub layer: TissueLayer,
    pub kind: SsiFindingKind,
    pub observed_on: NaiveDate,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignKind {
    Fever,
    LocalizedPain,
    Swelling,
    Erythema,
    Heat,
}

impl std::fmt::Display for SignKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fever => write!(f, "fever"),
            Self::LocalizedPain => write!(f, "localized pain"),
            Self::Swelling => write!(f, "swelling"),
            Self::Erythema => write!(f, "erythema"),
            Self::Heat => write!(f, "heat"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncisionSign {
    pub kind: SignKind,
    pub observed_on: NaiveDate,
    #[serde(default)]
    pub temperature_celsius: Option<f64>,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SsiCase {
    pub procedure: Option<OperativeProcedure>,
    #[serde(default)]
    pub findings: Vec<SsiFinding>,
    #[serde(default)]
    pub signs: Vec<IncisionSign>,
}
