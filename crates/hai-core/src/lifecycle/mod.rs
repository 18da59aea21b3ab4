//! Candidate and review lifecycle.
//!
//! - [`policy`]: when an engine decision may finalize without review
//! - [`manager`]: the state machine over a [`hai_state::SurveillanceStore`]
//! - [`locks`]: per-candidate mutual exclusion
//! - [`clock`]: injectable time source

pub mod clock;
pub mod error;
pub mod locks;
pub mod manager;
pub mod policy;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{LifecycleError, LifecycleResult};
pub use locks::{CandidateGuard, CandidateLocks};
pub use manager::{CompletedReview, FinalizeOutcome, LifecycleManager, Transition, ENGINE_REVIEWER};
pub use policy::{Acceptance, AcceptancePolicy, AcceptanceRule};
