//! HAI-State: Persistence Contract for Surveillance
//!
//! Defines the storage trait the lifecycle manager runs against, the error
//! taxonomy backends report through, and an in-memory fake.
//!
//! ## Layer 1 - Persistence
//!
//! Focus: per-call atomicity, typed duplicate detection, retry classes.
//!
//! ## Key Components
//!
//! - `SurveillanceStore`: candidates, reviews and reportable events
//! - `StorageError` / `FailureClass`: retryable vs permanent failures
//! - `MemorySurveillanceStore`: in-memory fake with fault injection

mod error;
pub mod fakes;
pub mod storage_traits;

pub use error::{FailureClass, StorageError};
pub use fakes::{MemorySurveillanceStore, StoreOperation};
pub use storage_traits::{ReviewCompletion, StorageResult, SurveillanceStore};
