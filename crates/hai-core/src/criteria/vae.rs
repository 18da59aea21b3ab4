//! Ventilator-associated event criteria.
//!
//! Ladder, most specific first: probable VAP, possible VAP, IVAC, VAC. Every
//! tier above VAC is anchored to the VAC onset day, so nothing above VAC is
//! evaluated when no VAC is found.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use hai_domain::case::{
    AntimicrobialCourse, GrowthQuantity, Measurement, RespiratoryCulture, RespiratorySpecimen,
    SecretionSample, SemiQuantGrowth, VaeCase,
};
use hai_domain::reference::normalize_name;
use hai_domain::{
    Classification, ClassificationDecision, ConfidenceLevel, DecisionOutcome, EvidenceItem,
    HaiType, KnowledgeTables, VaeClass,
};

use super::ladder::{resolve, DecisionDraft, TierEvaluation};
use super::{CriteriaEngine, DateWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parameter {
    Fio2,
    Peep,
}

impl Parameter {
    fn label(self) -> &'static str {
        match self {
            Self::Fio2 => "FiO2",
            Self::Peep => "PEEP",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Day<'a> {
    date: NaiveDate,
    fio2: Option<f64>,
    peep: Option<f64>,
    source: &'a str,
}

impl Day<'_> {
    fn value(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Fio2 => self.fio2,
            Parameter::Peep => self.peep,
        }
    }
}

#[derive(Debug, Clone)]
struct VacFinding<'a> {
    onset: NaiveDate,
    parameter: Parameter,
    baseline: f64,
    worsening: Vec<Day<'a>>,
}

/// Evaluates VAE criteria against daily ventilator settings.
#[derive(Debug, Clone)]
pub struct VaeEngine {
    tables: Arc<KnowledgeTables>,
}

impl VaeEngine {
    pub fn new(tables: Arc<KnowledgeTables>) -> Self {
        Self { tables }
    }

    fn daily_series<'a>(&self, case: &'a VaeCase, start: NaiveDate) -> Vec<Day<'a>> {
        let floor = self.tables.vae.peep_floor_cmh2o;
        let mut days: Vec<Day<'a>> = case
            .daily_settings
            .iter()
            .filter(|s| s.date >= start)
            .map(|s| Day {
                date: s.date,
                fio2: s.min_fio2_percent,
                peep: s.min_peep_cmh2o.map(|p| p.max(floor)),
                source: &s.source,
            })
            .collect();
        days.sort_by_key(|d| d.date);
        days.dedup_by_key(|d| d.date);
        days
    }

    /// Earliest baseline window of stable-or-improving settings followed by
    /// a sustained rise in one parameter.
    fn find_vac<'a>(&self, days: &[Day<'a>]) -> Option<VacFinding<'a>> {
        let t = &self.tables.vae;
        let span = t.baseline_days + t.worsening_days;

        for window in days.windows(span) {
            let consecutive = window
                .windows(2)
                .all(|pair| pair[1].date - pair[0].date == Duration::days(1));
            if !consecutive {
                continue;
            }
            let (baseline, worsening) = window.split_at(t.baseline_days);
            let stable = baseline.windows(2).all(|pair| {
                [Parameter::Fio2, Parameter::Peep].iter().all(|p| {
                    match (pair[0].value(*p), pair[1].value(*p)) {
                        (Some(prev), Some(next)) => next <= prev,
                        _ => true,
                    }
                })
            });
            if !stable {
                continue;
            }

            for parameter in [Parameter::Fio2, Parameter::Peep] {
                let Some(reference) = baseline
                    .iter()
                    .map(|d| d.value(parameter))
                    .collect::<Option<Vec<f64>>>()
                    .and_then(|values| values.into_iter().reduce(f64::min))
                else {
                    continue;
                };
                let increase = match parameter {
                    Parameter::Fio2 => t.fio2_increase_points,
                    Parameter::Peep => t.peep_increase_cmh2o,
                };
                let sustained = worsening
                    .iter()
                    .all(|d| d.value(parameter).is_some_and(|v| v >= reference + increase));
                if sustained {
                    return Some(VacFinding {
                        onset: worsening[0].date,
                        parameter,
                        baseline: reference,
                        worsening: worsening.to_vec(),
                    });
                }
            }
        }
        None
    }

    fn abnormal_temperature<'a>(
        &self,
        case: &'a VaeCase,
        window: &DateWindow,
    ) -> Option<&'a Measurement> {
        let t = &self.tables.vae;
        case.temperatures.iter().find(|m| {
            window.contains(m.observed_on)
                && (m.value > t.fever_celsius || m.value < t.hypothermia_celsius)
        })
    }

    fn abnormal_wbc<'a>(&self, case: &'a VaeCase, window: &DateWindow) -> Option<&'a Measurement> {
        let t = &self.tables.vae;
        case.wbc_counts.iter().find(|m| {
            window.contains(m.observed_on) && (m.value >= t.wbc_high || m.value <= t.wbc_low)
        })
    }

    /// A qualifying agent not given in the lookback days before its start.
    fn is_new_course(&self, case: &VaeCase, course: &AntimicrobialCourse) -> bool {
        let agent = normalize_name(&course.agent);
        let lookback = self.tables.vae.new_antimicrobial_lookback_days;
        !case.antimicrobials.iter().any(|other| {
            !std::ptr::eq(other, course)
                && normalize_name(&other.agent) == agent
                && (1..=lookback).any(|k| other.covers(course.start - Duration::days(k)))
        })
    }

    fn new_antimicrobial<'a>(
        &self,
        case: &'a VaeCase,
        window: &DateWindow,
    ) -> Option<&'a AntimicrobialCourse> {
        let min_days = self.tables.vae.min_antimicrobial_days;
        case.antimicrobials.iter().find(|course| {
            self.tables.is_qualifying_antimicrobial(&course.agent)
                && window.contains(course.start)
                && course.days() >= min_days
                && self.is_new_course(case, course)
        })
    }

    fn is_purulent(&self, sample: &SecretionSample) -> bool {
        let t = &self.tables.vae;
        match sample.purulent {
            Some(flag) => flag,
            None => match sample.neutrophils_per_lpf {
                Some(neutrophils) => {
                    neutrophils >= t.purulent_min_neutrophils
                        && sample
                            .squamous_cells_per_lpf
                            .map_or(true, |sq| sq <= t.purulent_max_squamous)
                }
                None => false,
            },
        }
    }

    /// Organism that counts toward VAP; normal flora only counts from lung tissue.
    fn countable_organism<'a>(&self, culture: &'a RespiratoryCulture) -> Option<&'a str> {
        let organism = culture.organism.as_deref().filter(|o| !o.trim().is_empty())?;
        if culture.specimen != RespiratorySpecimen::LungTissue
            && self.tables.is_excluded_respiratory_flora(organism)
        {
            return None;
        }
        Some(organism)
    }

    fn meets_growth_threshold(&self, culture: &RespiratoryCulture) -> bool {
        let threshold = self.tables.culture_threshold(culture.specimen);
        match culture.growth {
            GrowthQuantity::Quantitative { cfu_per_ml } => {
                threshold.is_some_and(|min| cfu_per_ml >= min)
            }
            GrowthQuantity::SemiQuantitative { growth } => {
                threshold.is_some() && growth >= SemiQuantGrowth::Moderate
            }
            GrowthQuantity::Qualitative => false,
        }
    }

    fn evaluate_vap_tiers(
        &self,
        case: &VaeCase,
        vac: &VacFinding<'_>,
        window: &DateWindow,
    ) -> Vec<TierEvaluation<VaeClass>> {
        let onset = Some(vac.onset);

        // VAC
        let mut vac_eval = TierEvaluation::met(VaeClass::Vac, ConfidenceLevel::Possible)
            .note(format!(
                "daily_settings[{}]: {} baseline {:.1} followed by {} days at or above +{:.1}",
                vac.onset,
                vac.parameter.label(),
                vac.baseline,
                vac.worsening.len(),
                match vac.parameter {
                    Parameter::Fio2 => self.tables.vae.fio2_increase_points,
                    Parameter::Peep => self.tables.vae.peep_increase_cmh2o,
                },
            ))
            .on(onset);
        for day in &vac.worsening {
            let value = day.value(vac.parameter).unwrap_or_default();
            vac_eval = vac_eval.support(
                EvidenceItem::new(
                    format!("{} {} daily minimum {value:.1}", day.date, vac.parameter.label()),
                    day.source,
                )
                .with_relevance("vac"),
            );
        }

        // IVAC
        let temperature = self.abnormal_temperature(case, window);
        let wbc = self.abnormal_wbc(case, window);
        let antimicrobial = self.new_antimicrobial(case, window);
        let ivac_met = (temperature.is_some() || wbc.is_some()) && antimicrobial.is_some();
        let mut ivac_eval = if ivac_met {
            TierEvaluation::met(VaeClass::Ivac, ConfidenceLevel::Possible).on(onset)
        } else {
            TierEvaluation::unmet(VaeClass::Ivac)
        };
        match (temperature, wbc) {
            (Some(m), _) => {
                ivac_eval = ivac_eval
                    .note(format!("temperatures[{}]: {:.1} C outside normal range", m.observed_on, m.value))
                    .support(
                        EvidenceItem::new(format!("temperature {:.1} C", m.value), &m.source)
                            .with_relevance("ivac"),
                    );
            }
            (None, Some(m)) => {
                ivac_eval = ivac_eval
                    .note(format!("wbc_counts[{}]: {:.1} outside leukocyte band", m.observed_on, m.value))
                    .support(
                        EvidenceItem::new(format!("WBC {:.1}", m.value), &m.source)
                            .with_relevance("ivac"),
                    );
            }
            (None, None) => {
                ivac_eval = ivac_eval.note(format!(
                    "temperatures/wbc_counts: no abnormal value between {} and {}",
                    window.start, window.end
                ));
            }
        }
        match antimicrobial {
            Some(course) => {
                ivac_eval = ivac_eval
                    .note(format!(
                        "antimicrobials[{}]: new {} started {} for {} days",
                        course.agent,
                        course.agent,
                        course.start,
                        course.days()
                    ))
                    .support(
                        EvidenceItem::new(
                            format!("{} {}..{}", course.agent, course.start, course.last_dose),
                            &course.source,
                        )
                        .with_relevance("ivac"),
                    );
            }
            None => {
                ivac_eval = ivac_eval.note(format!(
                    "antimicrobials: no new qualifying agent started between {} and {} for at least {} days",
                    window.start, window.end, self.tables.vae.min_antimicrobial_days
                ));
            }
        }

        // Respiratory findings inside the window.
        let purulent = case
            .secretions
            .iter()
            .find(|s| window.contains(s.collected_on) && self.is_purulent(s));
        let positive_culture = case
            .respiratory_cultures
            .iter()
            .filter(|c| window.contains(c.collected_on))
            .find_map(|c| self.countable_organism(c).map(|o| (c, o)));
        let threshold_culture = case
            .respiratory_cultures
            .iter()
            .filter(|c| window.contains(c.collected_on) && self.meets_growth_threshold(c))
            .find_map(|c| self.countable_organism(c).map(|o| (c, o)));
        let alternative = case
            .alternative_microbiology
            .iter()
            .find(|a| window.contains(a.collected_on));

        let purulent_item = purulent.map(|s| {
            EvidenceItem::new(format!("purulent secretions {}", s.collected_on), &s.source)
                .with_relevance("vap")
        });
        let culture_item = |c: &RespiratoryCulture, organism: &str| {
            EvidenceItem::new(format!("{} from {}", organism, c.specimen), &c.source)
                .with_relevance("vap")
        };

        // Possible VAP
        let possible_met = ivac_met && (purulent.is_some() || positive_culture.is_some());
        let mut possible_eval = if possible_met {
            TierEvaluation::met(VaeClass::PossibleVap, ConfidenceLevel::Probable).on(onset)
        } else {
            TierEvaluation::unmet(VaeClass::PossibleVap)
        };
        if !ivac_met {
            possible_eval = possible_eval.note("ivac: not met, VAP tiers cannot be reported");
        }
        if let (Some(sample), Some(item)) = (purulent, &purulent_item) {
            possible_eval = possible_eval
                .note(format!(
                    "secretions[{}]: purulent respiratory secretions",
                    sample.collected_on
                ))
                .support(item.clone());
        }
        if let Some((culture, organism)) = positive_culture {
            possible_eval = possible_eval
                .note(format!(
                    "respiratory_cultures[{}]: {} from {}",
                    culture.collected_on, organism, culture.specimen
                ))
                .support(culture_item(culture, organism));
        }
        if purulent.is_none() && positive_culture.is_none() {
            possible_eval = possible_eval.note(
                "secretions/respiratory_cultures: no purulent secretions or countable organism in window",
            );
        }

        // Probable VAP
        let probable_met =
            ivac_met && ((purulent.is_some() && threshold_culture.is_some()) || alternative.is_some());
        let mut probable_eval = if probable_met {
            TierEvaluation::met(VaeClass::ProbableVap, ConfidenceLevel::Definite).on(onset)
        } else {
            TierEvaluation::unmet(VaeClass::ProbableVap)
        };
        match (threshold_culture, alternative) {
            (_, Some(alt)) => {
                probable_eval = probable_eval
                    .note(format!("alternative_microbiology[{}]: {}", alt.collected_on, alt.kind))
                    .support(
                        EvidenceItem::new(alt.kind.to_string(), &alt.source).with_relevance("vap"),
                    );
            }
            (Some((culture, organism)), None) => {
                probable_eval = probable_eval
                    .note(format!(
                        "respiratory_cultures[{}]: {} growth meets {} threshold",
                        culture.collected_on, organism, culture.specimen
                    ))
                    .support(culture_item(culture, organism));
                if let Some(item) = &purulent_item {
                    probable_eval = probable_eval.support(item.clone());
                } else {
                    probable_eval = probable_eval
                        .note("secretions: threshold culture without purulent secretions");
                }
            }
            (None, None) => {
                probable_eval = probable_eval.note(
                    "respiratory_cultures: no culture meeting the specimen threshold and no alternative microbiology",
                );
            }
        }

        vec![probable_eval, possible_eval, ivac_eval, vac_eval]
    }
}

impl CriteriaEngine for VaeEngine {
    type Case = VaeCase;

    fn hai_type(&self) -> HaiType {
        HaiType::Vae
    }

    fn classify(&self, case: &VaeCase) -> ClassificationDecision {
        let t = &self.tables.vae;
        let mut draft = DecisionDraft::new(HaiType::Vae, &self.tables);

        if case.ventilation_start.is_none() {
            draft.missing("ventilation_start");
        }
        if case.daily_settings.is_empty() {
            draft.missing("daily_settings");
        }
        let start = match case.ventilation_start {
            Some(start) if !draft.has_missing() => start,
            _ => return draft.incomplete(),
        };

        let days = self.daily_series(case, start);
        let ventilated = days
            .last()
            .map(|last| (last.date - start).num_days() + 1)
            .unwrap_or(0);
        if ventilated < t.min_ventilation_days {
            draft.note(format!(
                "ventilation_start: {ventilated} ventilator days so far, fewer than the required {}",
                t.min_ventilation_days
            ));
            // The series may end only because extraction ran mid-course.
            return draft.finish(
                DecisionOutcome::NotHai,
                Classification::Vae(VaeClass::NoVae),
                ConfidenceLevel::Insufficient,
                None,
            );
        }

        let Some(vac) = self.find_vac(&days) else {
            draft.note(format!(
                "daily_settings: no {} day stable baseline followed by {} days of sustained FiO2/PEEP worsening",
                t.baseline_days, t.worsening_days
            ));
            debug!(hai_type = "VAE", tier = "none", "vae ladder resolved");
            return draft.finish(
                DecisionOutcome::NotHai,
                Classification::Vae(VaeClass::NoVae),
                ConfidenceLevel::Insufficient,
                None,
            );
        };

        let window = DateWindow::around(vac.onset, t.window_days_before, t.window_days_after);
        let outcome = resolve(self.evaluate_vap_tiers(case, &vac, &window));
        draft.absorb(&outcome);

        let class = outcome.tier.unwrap_or(VaeClass::Vac);
        debug!(
            hai_type = "VAE",
            tier = ?class,
            confidence = %outcome.confidence,
            "vae ladder resolved"
        );
        draft.finish(
            DecisionOutcome::HaiConfirmed,
            Classification::Vae(class),
            outcome.confidence,
            outcome.event_date,
        )
    }
}
