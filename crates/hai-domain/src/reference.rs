//! Versioned reference knowledge tables.
//!
//! Tables are plain data: organism lists, qualifying antimicrobial agents,
//! operative procedure categories and the numeric thresholds each engine
//! applies. They are loaded once from JSON, normalized, validated, and then
//! shared read-only with every engine.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::case::RespiratorySpecimen;
use crate::error::{DomainError, DomainResult};

/// Normalize an organism or agent name: lower-case, trimmed, single spaces.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Genus and (optional) species tokens of a normalized organism name.
///
/// `"staphylococcus spp."` and `"staphylococcus"` both yield a genus-only key.
fn genus_species(normalized: &str) -> (&str, Option<&str>) {
    let mut tokens = normalized.split(' ');
    let genus = tokens.next().unwrap_or_default();
    let species = tokens
        .next()
        .filter(|t| !matches!(*t, "spp." | "spp" | "sp." | "sp" | "species"));
    (genus, species)
}

/// Whether two organism identifications name the same genus and species.
///
/// A genus-only identification never matches: repeat-culture confirmation
/// needs the species on both sides.
pub fn same_organism(a: &str, b: &str) -> bool {
    let (a, b) = (normalize_name(a), normalize_name(b));
    match (genus_species(&a), genus_species(&b)) {
        ((ga, Some(sa)), (gb, Some(sb))) => ga == gb && sa == sb,
        _ => false,
    }
}

/// A set of organism names with genus-level wildcard entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganismList(BTreeSet<String>);

impl OrganismList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(names.into_iter().map(|n| normalize_name(n.as_ref())).collect())
    }

    /// Exact match, or a genus-only entry covering the organism's genus.
    pub fn contains(&self, organism: &str) -> bool {
        let normalized = normalize_name(organism);
        if normalized.is_empty() {
            return false;
        }
        if self.0.contains(&normalized) {
            return true;
        }
        let (genus, _) = genus_species(&normalized);
        self.0.iter().any(|entry| {
            let (entry_genus, entry_species) = genus_species(entry);
            entry_species.is_none() && entry_genus == genus
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn normalized(self) -> Self {
        Self::new(self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganismTables {
    #[serde(default)]
    pub recognized_pathogens: OrganismList,
    #[serde(default)]
    pub common_commensals: OrganismList,
    #[serde(default)]
    pub mbi_eligible: OrganismList,
    /// Normal respiratory/oral flora that never count toward VAP.
    #[serde(default)]
    pub excluded_respiratory_flora: OrganismList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClabsiThresholds {
    pub fever_celsius: f64,
    /// Maximum spread between matching commensal cultures, inclusive.
    pub commensal_match_window_hours: i64,
    /// Days either side of the first positive culture.
    pub infection_window_days: i64,
    /// Line must be in place on more than this many days before the event.
    pub min_line_days: i64,
}

impl Default for ClabsiThresholds {
    fn default() -> Self {
        Self {
            fever_celsius: 38.0,
            commensal_match_window_hours: 72,
            infection_window_days: 3,
            min_line_days: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsiThresholds {
    /// Surveillance window without an implant, counted from the procedure day.
    pub standard_window_days: i64,
    pub implant_window_days: i64,
    /// Days either side of a deliberate opening in which a sign counts.
    pub sign_window_days: i64,
    pub fever_celsius: f64,
}

impl Default for SsiThresholds {
    fn default() -> Self {
        Self {
            standard_window_days: 30,
            implant_window_days: 90,
            sign_window_days: 3,
            fever_celsius: 38.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaeThresholds {
    pub min_ventilation_days: i64,
    pub baseline_days: usize,
    pub worsening_days: usize,
    pub fio2_increase_points: f64,
    pub peep_increase_cmh2o: f64,
    /// Daily minimum PEEP values below this are treated as equal to it.
    pub peep_floor_cmh2o: f64,
    pub fever_celsius: f64,
    pub hypothermia_celsius: f64,
    pub wbc_low: f64,
    pub wbc_high: f64,
    pub window_days_before: i64,
    pub window_days_after: i64,
    pub min_antimicrobial_days: i64,
    pub new_antimicrobial_lookback_days: i64,
    pub purulent_min_neutrophils: u32,
    pub purulent_max_squamous: u32,
}

impl Default for VaeThresholds {
    fn default() -> Self {
        Self {
            min_ventilation_days: 4,
            baseline_days: 2,
            worsening_days: 2,
            fio2_increase_points: 20.0,
            peep_increase_cmh2o: 3.0,
            peep_floor_cmh2o: 5.0,
            fever_celsius: 38.0,
            hypothermia_celsius: 36.0,
            wbc_low: 4.0,
            wbc_high: 12.0,
            window_days_before: 2,
            window_days_after: 2,
            min_antimicrobial_days: 4,
            new_antimicrobial_lookback_days: 2,
            purulent_min_neutrophils: 25,
            purulent_max_squamous: 10,
        }
    }
}

/// The complete reference configuration consulted by the criteria engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeTables {
    pub version: String,
    #[serde(default)]
    pub organisms: OrganismTables,
    #[serde(default)]
    pub qualifying_antimicrobials: BTreeSet<String>,
    /// NHSN operative procedure category code to description.
    #[serde(default)]
    pub operative_categories: BTreeMap<String, String>,
    /// Minimum CFU/ml (CFU/g for tissue) per respiratory specimen key.
    #[serde(default)]
    pub respiratory_culture_thresholds: BTreeMap<String, f64>,
    #[serde(default)]
    pub clabsi: ClabsiThresholds,
    #[serde(default)]
    pub ssi: SsiThresholds,
    #[serde(default)]
    pub vae: VaeThresholds,
}

impl KnowledgeTables {
    /// Parse, normalize and validate tables from a JSON document.
    pub fn from_json_str(json: &str) -> DomainResult<Self> {
        let tables: Self = serde_json::from_str(json)?;
        let tables = tables.normalized();
        tables.validate()?;
        Ok(tables)
    }

    pub fn from_path(path: impl AsRef<Path>) -> DomainResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> DomainResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn normalized(mut self) -> Self {
        self.version = self.version.trim().to_string();
        self.organisms = OrganismTables {
            recognized_pathogens: self.organisms.recognized_pathogens.normalized(),
            common_commensals: self.organisms.common_commensals.normalized(),
            mbi_eligible: self.organisms.mbi_eligible.normalized(),
            excluded_respiratory_flora: self.organisms.excluded_respiratory_flora.normalized(),
        };
        self.qualifying_antimicrobials = self
            .qualifying_antimicrobials
            .iter()
            .map(|a| normalize_name(a))
            .collect();
        self.operative_categories = self
            .operative_categories
            .into_iter()
            .map(|(code, desc)| (code.trim().to_ascii_uppercase(), desc))
            .collect();
        self
    }

    /// Check internal consistency of the tables.
    pub fn validate(&self) -> DomainResult<()> {
        let invalid = |reason: String| DomainError::InvalidReferenceTable {
            version: self.version.clone(),
            reason,
        };

        if self.version.is_empty() {
            return Err(invalid("version must not be empty".to_string()));
        }

        let commensals = &self.organisms.common_commensals;
        let pathogens = &self.organisms.recognized_pathogens;
        // Either side may hold a genus-only entry covering the other's species.
        let overlap = commensals
            .iter()
            .find(|c| pathogens.contains(c))
            .or_else(|| pathogens.iter().find(|p| commensals.contains(p)));
        if let Some(both) = overlap {
            return Err(invalid(format!(
                "organism {both:?} is listed as both commensal and recognized pathogen"
            )));
        }

        let positive = [
            ("clabsi.fever_celsius", self.clabsi.fever_celsius),
            ("ssi.fever_celsius", self.ssi.fever_celsius),
            ("vae.fever_celsius", self.vae.fever_celsius),
            ("vae.hypothermia_celsius", self.vae.hypothermia_celsius),
            ("vae.fio2_increase_points", self.vae.fio2_increase_points),
            ("vae.peep_increase_cmh2o", self.vae.peep_increase_cmh2o),
            ("vae.wbc_low", self.vae.wbc_low),
            ("vae.wbc_high", self.vae.wbc_high),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if self.vae.wbc_low >= self.vae.wbc_high {
            return Err(invalid("vae.wbc_low must be below vae.wbc_high".to_string()));
        }
        if self.vae.hypothermia_celsius >= self.vae.fever_celsius {
            return Err(invalid(
                "vae.hypothermia_celsius must be below vae.fever_celsius".to_string(),
            ));
        }

        let windows = [
            ("clabsi.commensal_match_window_hours", self.clabsi.commensal_match_window_hours),
            ("clabsi.infection_window_days", self.clabsi.infection_window_days),
            ("ssi.standard_window_days", self.ssi.standard_window_days),
            ("ssi.implant_window_days", self.ssi.implant_window_days),
            ("vae.min_ventilation_days", self.vae.min_ventilation_days),
            ("vae.min_antimicrobial_days", self.vae.min_antimicrobial_days),
            ("vae.baseline_days", self.vae.baseline_days as i64),
            ("vae.worsening_days", self.vae.worsening_days as i64),
        ];
        for (name, value) in windows {
            if value < 1 {
                return Err(invalid(format!("{name} must be at least 1, got {value}")));
            }
        }
        let non_negative = [
            ("clabsi.min_line_days", self.clabsi.min_line_days),
            ("ssi.sign_window_days", self.ssi.sign_window_days),
            ("vae.window_days_before", self.vae.window_days_before),
            ("vae.window_days_after", self.vae.window_days_after),
            ("vae.new_antimicrobial_lookback_days", self.vae.new_antimicrobial_lookback_days),
        ];
        for (name, value) in non_negative {
            if value < 0 {
                return Err(invalid(format!("{name} must not be negative, got {value}")));
            }
        }

        for (specimen, threshold) in &self.respiratory_culture_thresholds {
            if !(threshold.is_finite() && *threshold > 0.0) {
                return Err(invalid(format!(
                    "culture threshold for {specimen} must be positive, got {threshold}"
                )));
            }
        }

        Ok(())
    }

    pub fn is_recognized_pathogen(&self, organism: &str) -> bool {
        self.organisms.recognized_pathogens.contains(organism)
    }

    pub fn is_common_commensal(&self, organism: &str) -> bool {
        self.organisms.common_commensals.contains(organism)
    }

    pub fn is_mbi_eligible(&self, organism: &str) -> bool {
        self.organisms.mbi_eligible.contains(organism)
    }

    pub fn is_excluded_respiratory_flora(&self, organism: &str) -> bool {
        self.organisms.excluded_respiratory_flora.contains(organism)
    }

    pub fn is_qualifying_antimicrobial(&self, agent: &str) -> bool {
        self.qualifying_antimicrobials.contains(&normalize_name(agent))
    }

    pub fn is_operative_category(&self, code: &str) -> bool {
        self.operative_categories
            .contains_key(&code.trim().to_ascii_uppercase())
    }

    pub fn culture_threshold(&self, specimen: RespiratorySpecimen) -> Option<f64> {
        self.respiratory_culture_thresholds
            .get(specimen.as_key())
            .copied()
    }
}
