//! HAI-Domain: Surveillance Data Model
//!
//! Shared types for healthcare-associated infection surveillance: the
//! evidence and confidence vocabulary, classification decisions, candidate
//! and review records, finalized reportable events, versioned reference
//! tables and the structured case data the criteria engines consume.
//!
//! ## Layer 0 - Data
//!
//! Focus: plain data with serde shapes, validation at load boundaries.
//!
//! ## Key Components
//!
//! - `KnowledgeTables`: versioned organism lists, procedure categories and thresholds
//! - `CaseData`: engine-ready CLABSI / SSI / VAE case records
//! - `ClassificationDecision`: immutable, digestible engine output
//! - `Candidate` / `Review` / `NhsnEvent`: lifecycle records

pub mod case;
pub mod candidate;
pub mod confidence;
pub mod decision;
mod error;
pub mod event;
pub mod evidence;
pub mod extraction;
mod ids;
pub mod reference;
pub mod review;
pub mod schema;

pub use candidate::{Candidate, CandidateStatus, DecisionEntry};
pub use case::CaseData;
pub use confidence::ConfidenceLevel;
pub use decision::{
    ClabsiClass, Classification, ClassificationDecision, DecisionOutcome, HaiType, SsiClass,
    VaeClass,
};
pub use error::{DomainError, DomainResult};
pub use event::NhsnEvent;
pub use evidence::{EvidenceItem, EvidenceSpan};
pub use extraction::{ExtractionPayload, ExtractionRecord, Extracted};
pub use ids::{CandidateId, NhsnEventId, ReviewId};
pub use reference::KnowledgeTables;
pub use review::{QueueType, Review, ReviewDecision};
pub use schema::ClassificationPayload;
