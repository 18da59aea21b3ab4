//! Ventilator-associated event case data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily minimum ventilator settings for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyVentilatorSettings {
    pub date: NaiveDate,
    /// Daily minimum FiO2 in percentage points (21-100).
    pub min_fio2_percent: Option<f64>,
    /// Daily minimum PEEP in cmH2O.
    pub min_peep_cmh2o: Option<f64>,
    #[serde(default)]
    pub source: String,
}

/// A dated numeric observation (temperature in °C, WBC in 10^3 cells/mm3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub observed_on: NaiveDate,
    pub value: f64,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntimicrobialCourse {
    pub agent: String,
    pub start: NaiveDate,
    /// Last calendar day the agent was administered (inclusive).
    pub last_dose: NaiveDate,
    #[serde(default)]
    pub source: String,
}

impl AntimicrobialCourse {
    /// Consecutive calendar days of administration.
    pub fn days(&self) -> i64 {
        (self.last_dose - self.start).num_days() + 1
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.last_dose
    }
}

/// Gram stain or description of respiratory secretions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretionSample {
    pub collected_on: NaiveDate,
    /// Explicit purulence statement from the report, when given.
    #[serde(default)]
    pub purulent: Option<bool>,
    #[serde(default)]
    pub neutrophils_per_lpf: Option<u32>,
    #[serde(default)]
    pub squamous_cells_per_lpf: Option<u32>,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RespiratorySpecimen {
    EndotrachealAspirate,
    BronchoalveolarLavage,
    ProtectedSpecimenBrush,
    LungTissue,
    Sputum,
}

impl RespiratorySpecimen {
    /// Key used by the reference tables' culture threshold map.
    pub fn as_key(self) -> &'static str {
        match self {
            Self::EndotrachealAspirate => "endotracheal_aspirate",
            Self::BronchoalveolarLavage => "bronchoalveolar_lavage",
            Self::ProtectedSpecimenBrush => "protected_specimen_brush",
            Self::LungTissue => "lung_tissue",
            Self::Sputum => "sputum",
        }
    }
}

impl std::fmt::Display for RespiratorySpecimen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndotrachealAspirate => write!(f, "endotracheal aspirate"),
            Self::BronchoalveolarLavage => write!(f, "bronchoalveolar lavage"),
            Self::ProtectedSpecimenBrush => write!(f, "protected specimen brush"),
            Self::LungTissue => write!(f, "lung tissue"),
            Self::Sputum => write!(f, "sputum"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemiQuantGrowth {
    Rare,
    Light,
    Moderate,
    Heavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrowthQuantity {
    Quantitative { cfu_per_ml: f64 },
    SemiQuantitative { growth: SemiQuantGrowth },
    Qualitative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespiratoryCulture {
    pub collected_on: NaiveDate,
    pub specimen: RespiratorySpecimen,
    /// `None` means no growth.
    pub organism: Option<String>,
    pub growth: GrowthQuantity,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternativeMicrobiologyKind {
    PleuralFluidCulture,
    LungHistopathology,
    LegionellaPositive,
    RespiratoryVirusPositive,
}

impl std::fmt::Display for AlternativeMicrobiologyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PleuralFluidCulture => write!(f, "positive pleural fluid culture"),
            Self::LungHistopathology => write!(f, "lung histopathology consistent with pneumonia"),
            Self::LegionellaPositive => write!(f, "positive Legionella test"),
            Self::RespiratoryVirusPositive => write!(f, "positive respiratory virus test"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeMicrobiology {
    pub kind: AlternativeMicrobiologyKind,
    pub collected_on: NaiveDate,
    #[serde(default)]
    pub organism: Option<String>,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaeCase {
    pub ventilation_start: Option<NaiveDate>,
    #[serde(default)]
    pub daily_settings: Vec<DailyVentilatorSettings>,
    #[serde(default)]
    pub temperatures: Vec<Measurement>,
    #[serde(default)]
    pub wbc_counts: Vec<Measurement>,
    #[serde(default)]
    pub antimicrobials: Vec<AntimicrobialCourse>,
    #[serde(default)]
    pub secretions: Vec<SecretionSample>,
    #[serde(default)]
    pub respiratory_cultures: Vec<RespiratoryCulture>,
    #[serde(default)]
    pub alternative_microbiology: Vec<AlternativeMicrobiology>,
}
