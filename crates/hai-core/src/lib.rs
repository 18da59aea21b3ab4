//! HAI surveillance core.
//!
//! - [`criteria`]: NHSN criteria engines for CLABSI, SSI and VAE behind one
//!   tier-ladder abstraction, plus the [`SurveillanceEngine`] dispatcher
//! - [`normalize`]: merges extraction records into structured case data
//! - [`lifecycle`]: acceptance policy and the candidate/review state machine
//! - [`obs`], [`metrics`], [`telemetry`]: structured logging and counters

pub mod criteria;
pub mod lifecycle;
pub mod metrics;
pub mod normalize;
pub mod obs;
pub mod telemetry;

pub use criteria::{ClabsiEngine, CriteriaEngine, DateWindow, SsiEngine, SurveillanceEngine, VaeEngine};
pub use lifecycle::{
    Acceptance, AcceptancePolicy, AcceptanceRule, Clock, CompletedReview, FinalizeOutcome,
    FixedClock, LifecycleError, LifecycleManager, LifecycleResult, SystemClock, Transition,
};
pub use metrics::METRICS;
pub use normalize::normalize;
pub use telemetry::init_tracing;
