//! Bloodstream infection case data.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralLine {
    pub inserted_on: NaiveDate,
    pub removed_on: Option<NaiveDate>,
    #[serde(default)]
    pub source: String,
}

/// One blood culture result. `organism == None` means no growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodCulture {
    pub accession: String,
    pub collected_at: DateTime<Utc>,
    pub organism: Option<String>,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymptomKind {
    Fever,
    Chills,
    Hypotension,
}

impl std::fmt::Display for SymptomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fever => write!(f, "fever"),
            Self::Chills => write!(f, "chills"),
            Self::Hypotension => write!(f, "hypotension"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomObservation {
    pub kind: SymptomKind,
    pub observed_at: DateTime<Utc>,
    /// Recorded temperature for fever observations, when charted.
    #[serde(default)]
    pub temperature_celsius: Option<f64>,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostCondition {
    Neutropenia,
    SevereMucositis,
    GraftVersusHostDisease,
}

impl std::fmt::Display for HostCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neutropenia => write!(f, "neutropenia"),
            Self::SevereMucositis => write!(f, "severe mucositis"),
            Self::GraftVersusHostDisease => write!(f, "graft-versus-host disease"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConditionFinding {
    pub condition: HostCondition,
    pub noted_on: NaiveDate,
    #[serde(default)]
    pub source: String,
}

/// How firmly an infection at another site is documented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteDocumentation {
    Documented,
    Suspected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeSiteFinding {
    pub site: String,
    pub documentation: SiteDocumentation,
    pub noted_on: NaiveDate,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClabsiCase {
    pub central_line: Option<CentralLine>,
    #[serde(default)]
    pub blood_cultures: Vec<BloodCulture>,
    #[serde(default)]
    pub symptoms: Vec<SymptomObservation>,
    #[serde(default)]
    pub host_conditions: Vec<HostConditionFinding>,
    #[serde(default)]
    pub alternative_sites: Vec<AlternativeSiteFinding>,
}
