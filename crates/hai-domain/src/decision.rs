//! Classification decisions produced by the criteria engines.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::confidence::ConfidenceLevel;
use crate::error::DomainResult;
use crate::evidence::EvidenceItem;

/// Healthcare-associated infection type under surveillance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaiType {
    Clabsi,
    Ssi,
    Vae,
}

impl HaiType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clabsi => "CLABSI",
            Self::Ssi => "SSI",
            Self::Vae => "VAE",
        }
    }
}

impl std::fmt::Display for HaiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decision literal an engine (or the extraction collaborator) emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    HaiConfirmed,
    NotHai,
    PendingReview,
}

impl DecisionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HaiConfirmed => "hai_confirmed",
            Self::NotHai => "not_hai",
            Self::PendingReview => "pending_review",
        }
    }
}

impl std::fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CLABSI classification vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClabsiClass {
    /// Mucosal barrier injury laboratory-confirmed bloodstream infection.
    MbiLcbi,
    /// Recognized pathogen from at least one blood culture.
    Lcbi1,
    /// Common commensal from two or more cultures plus a compatible symptom.
    Lcbi2,
    NotClabsi,
}

/// SSI classification vocabulary, deepest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SsiClass {
    OrganSpace,
    DeepIncisional,
    SuperficialIncisional,
    NoSsi,
}

/// VAE classification vocabulary, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaeClass {
    ProbableVap,
    PossibleVap,
    Ivac,
    Vac,
    NoVae,
}

/// Engine-specific classification value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "hai_type", content = "value", rename_all = "snake_case")]
pub enum Classification {
    Clabsi(ClabsiClass),
    Ssi(SsiClass),
    Vae(VaeClass),
}

impl Classification {
    pub fn hai_type(&self) -> HaiType {
        match self {
            Self::Clabsi(_) => HaiType::Clabsi,
            Self::Ssi(_) => HaiType::Ssi,
            Self::Vae(_) => HaiType::Vae,
        }
    }

    /// The "nothing met" value for a HAI type.
    pub fn none_for(hai_type: HaiType) -> Self {
        match hai_type {
            HaiType::Clabsi => Self::Clabsi(ClabsiClass::NotClabsi),
            HaiType::Ssi => Self::Ssi(SsiClass::NoSsi),
            HaiType::Vae => Self::Vae(VaeClass::NoVae),
        }
    }

    /// Whether this value names a reportable event tier.
    pub fn is_reportable(&self) -> bool {
        !matches!(
            self,
            Self::Clabsi(ClabsiClass::NotClabsi) | Self::Ssi(SsiClass::NoSsi) | Self::Vae(VaeClass::NoVae)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Clabsi(ClabsiClass::MbiLcbi) => "MBI-LCBI",
            Self::Clabsi(ClabsiClass::Lcbi1) => "LCBI-1",
            Self::Clabsi(ClabsiClass::Lcbi2) => "LCBI-2",
            Self::Clabsi(ClabsiClass::NotClabsi) => "not CLABSI",
            Self::Ssi(SsiClass::OrganSpace) => "organ/space SSI",
            Self::Ssi(SsiClass::DeepIncisional) => "deep incisional SSI",
            Self::Ssi(SsiClass::SuperficialIncisional) => "superficial incisional SSI",
            Self::Ssi(SsiClass::NoSsi) => "no SSI",
            Self::Vae(VaeClass::ProbableVap) => "probable VAP",
            Self::Vae(VaeClass::PossibleVap) => "possible VAP",
            Self::Vae(VaeClass::Ivac) => "IVAC",
            Self::Vae(VaeClass::Vac) => "VAC",
            Self::Vae(VaeClass::NoVae) => "no VAE",
        }
    }

    /// Parse a tier label as emitted by the extraction collaborator
    /// (`"deep_incisional"`, `"probable_vap"`, `"lcbi_1"` ...).
    pub fn parse_for(hai_type: HaiType, value: &str) -> Option<Self> {
        let key = value.trim().to_ascii_lowercase().replace(['-', ' ', '/'], "_");
        let parsed = match (hai_type, key.as_str()) {
            (HaiType::Clabsi, "mbi_lcbi") => Self::Clabsi(ClabsiClass::MbiLcbi),
            (HaiType::Clabsi, "lcbi_1" | "lcbi1") => Self::Clabsi(ClabsiClass::Lcbi1),
            (HaiType::Clabsi, "lcbi_2" | "lcbi2") => Self::Clabsi(ClabsiClass::Lcbi2),
            (HaiType::Clabsi, "not_clabsi") => Self::Clabsi(ClabsiClass::NotClabsi),
            (HaiType::Ssi, "organ_space") => Self::Ssi(SsiClass::OrganSpace),
            (HaiType::Ssi, "deep_incisional") => Self::Ssi(SsiClass::DeepIncisional),
            (HaiType::Ssi, "superficial_incisional") => Self::Ssi(SsiClass::SuperficialIncisional),
            (HaiType::Ssi, "no_ssi") => Self::Ssi(SsiClass::NoSsi),
            (HaiType::Vae, "probable_vap") => Self::Vae(VaeClass::ProbableVap),
            (HaiType::Vae, "possible_vap") => Self::Vae(VaeClass::PossibleVap),
            (HaiType::Vae, "ivac") => Self::Vae(VaeClass::Ivac),
            (HaiType::Vae, "vac") => Self::Vae(VaeClass::Vac),
            (HaiType::Vae, "no_vae") => Self::Vae(VaeClass::NoVae),
            _ => return None,
        };
        Some(parsed)
    }
}

/// The immutable result of one engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationDecision {
    pub hai_type: HaiType,
    pub decision: DecisionOutcome,
    pub classification: Classification,
    pub confidence: ConfidenceLevel,
    /// One statement per line; every line names the field it was derived from.
    pub reasoning: String,
    pub supporting_evidence: Vec<EvidenceItem>,
    pub contradicting_evidence: Vec<EvidenceItem>,
    pub alternative_source: Option<String>,
    pub is_mbi_lcbi: bool,
    /// Date of event used for the reportable record, when one was determined.
    pub event_date: Option<NaiveDate>,
    /// Required case-data fields that were absent.
    pub missing_fields: Vec<String>,
    /// Version of the reference tables the decision was computed against.
    pub reference_version: String,
}

impl ClassificationDecision {
    /// SHA-256 hex digest over the canonical JSON form of the decision.
    pub fn digest(&self) -> DomainResult<String> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn reasoning_lines(&self) -> impl Iterator<Item = &str> {
        self.reasoning.lines().filter(|l| !l.is_empty())
    }

    pub fn is_incomplete(&self) -> bool {
        !self.missing_fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClassificationDecision {
        ClassificationDecision {
            hai_type: HaiType::Ssi,
            decision: DecisionOutcome::HaiConfirmed,
            classification: Classification::Ssi(SsiClass::DeepIncisional),
            confidence: ConfidenceLevel::Definite,
            reasoning: "findings[0]: fascial abscess at reoperation\n".to_string(),
            supporting_evidence: vec![EvidenceItem::new("abscess", "op-note#1..9")],
            contradicting_evidence: Vec::new(),
            alternative_source: None,
            is_mbi_lcbi: false,
            event_date: NaiveDate::from_ymd_opt(2024, 3, 11),
            missing_fields: Vec::new(),
            reference_version: "test".to_string(),
        }
    }

    #[test]
    fn test_digest_is_stable() {
        let d = sample();
        assert_eq!(d.digest().unwrap(), d.clone().digest().unwrap());
        assert_eq!(d.digest().unwrap().len(), 64);
    }

    #[test]
    fn test_digest_changes_with_content() {
        let a = sample();
        let mut b = sample();
        b.confidence = ConfidenceLevel::Probable;
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn test_reportable() {
        assert!(Classification::Vae(VaeClass::Vac).is_reportable());
        assert!(!Classification::none_for(HaiType::Vae).is_reportable());
        assert!(!Classification::none_for(HaiType::Clabsi).is_reportable());
    }

    #[test]
    fn test_parse_for_respects_hai_type() {
        assert_eq!(
            Classification::parse_for(HaiType::Ssi, "Organ/Space"),
            Some(Classification::Ssi(SsiClass::OrganSpace))
        );
        assert_eq!(
            Classification::parse_for(HaiType::Clabsi, "LCBI-2"),
            Some(Classification::Clabsi(ClabsiClass::Lcbi2))
        );
        assert_eq!(Classification::parse_for(HaiType::Vae, "deep_incisional"), None);
    }

    #[test]
    fn test_reasoning_lines_skip_blank() {
        let d = sample();
        assert_eq!(d.reasoning_lines().count(), 1);
    }

    #[test]
    fn test_classification_serde_shape() {
        let json = serde_json::to_value(Classification::Vae(VaeClass::Ivac)).unwrap();
        assert_eq!(json["hai_type"], "vae");
        assert_eq!(json["value"], "ivac");
    }
}
