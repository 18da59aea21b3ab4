//! Criteria engines.
//!
//! One engine per HAI type, all sharing the tier ladder in [`ladder`].
//! Engines are constructed with a shared, read-only [`KnowledgeTables`] and
//! are pure: the same case against the same tables always yields a
//! byte-identical decision.

pub mod clabsi;
pub mod ladder;
pub mod ssi;
pub mod vae;

use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use hai_domain::{CaseData, ClassificationDecision, HaiType, KnowledgeTables};

pub use clabsi::ClabsiEngine;
pub use ssi::SsiEngine;
pub use vae::VaeEngine;

/// A stateless evaluator for one HAI type.
pub trait CriteriaEngine: Send + Sync {
    type Case;

    fn hai_type(&self) -> HaiType;

    /// Classify a case. Never fails: incomplete input degrades to the
    /// lowest confidence with the missing fields named.
    fn classify(&self, case: &Self::Case) -> ClassificationDecision;
}

/// Inclusive calendar-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn around(anchor: NaiveDate, days_before: i64, days_after: i64) -> Self {
        Self {
            start: anchor - Duration::days(days_before),
            end: anchor + Duration::days(days_after),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Dispatches structured case data to the engine for its HAI type.
#[derive(Debug, Clone)]
pub struct SurveillanceEngine {
    tables: Arc<KnowledgeTables>,
    clabsi: ClabsiEngine,
    ssi: SsiEngine,
    vae: VaeEngine,
}

impl SurveillanceEngine {
    pub fn new(tables: Arc<KnowledgeTables>) -> Self {
        Self {
            clabsi: ClabsiEngine::new(Arc::clone(&tables)),
            ssi: SsiEngine::new(Arc::clone(&tables)),
            vae: VaeEngine::new(Arc::clone(&tables)),
            tables,
        }
    }

    pub fn tables(&self) -> &KnowledgeTables {
        &self.tables
    }

    pub fn classify(&self, case: &CaseData) -> ClassificationDecision {
        match case {
            CaseData::Clabsi(case) => self.clabsi.classify(case),
            CaseData::Ssi(case) => self.ssi.classify(case),
            CaseData::Vae(case) => self.vae.classify(case),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_window_is_inclusive() {
        let w = DateWindow::around(date(10), 2, 2);
        assert!(w.contains(date(8)));
        assert!(w.contains(date(12)));
        assert!(!w.contains(date(7)));
        assert!(!w.contains(date(13)));
    }

    #[test]
    fn test_dispatch_by_hai_type() {
        let tables = Arc::new(KnowledgeTables::from_json_str(r#"{"version": "t"}"#).unwrap());
        let engine = SurveillanceEngine::new(tables);
        for case in [
            CaseData::Clabsi(Default::default()),
            CaseData::Ssi(Default::default()),
            CaseData::Vae(Default::default()),
        ] {
            let decision = engine.classify(&case);
            assert_eq!(decision.hai_type, case.hai_type());
            assert!(decision.is_incomplete());
        }
    }
}
