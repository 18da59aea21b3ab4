//! Global atomic counters for lifecycle observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit the current values as one `info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    decisions_recorded: AtomicU64,
    reviews_enqueued: AtomicU64,
    reviews_completed: AtomicU64,
    events_created: AtomicU64,
    persistence_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            decisions_recorded: AtomicU64::new(0),
            reviews_enqueued: AtomicU64::new(0),
            reviews_completed: AtomicU64::new(0),
            events_created: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
        }
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = name, "counter incremented");
    }

    pub fn inc_decisions(&self) {
        Self::bump(&self.decisions_recorded, "decisions_recorded");
    }

    pub fn inc_reviews_enqueued(&self) {
        Self::bump(&self.reviews_enqueued, "reviews_enqueued");
    }

    pub fn inc_reviews_completed(&self) {
        Self::bump(&self.reviews_completed, "reviews_completed");
    }

    pub fn inc_events_created(&self) {
        Self::bump(&self.events_created, "events_created");
    }

    pub fn inc_persistence_failures(&self) {
        Self::bump(&self.persistence_failures, "persistence_failures");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            decisions_recorded = self.decisions_recorded(),
            reviews_enqueued = self.reviews_enqueued(),
            reviews_completed = self.reviews_completed(),
            events_created = self.events_created(),
            persistence_failures = self.persistence_failures(),
        );
    }

    pub fn decisions_recorded(&self) -> u64 {
        self.decisions_recorded.load(Ordering::Relaxed)
    }

    pub fn reviews_enqueued(&self) -> u64 {
        self.reviews_enqueued.load(Ordering::Relaxed)
    }

    pub fn reviews_completed(&self) -> u64 {
        self.reviews_completed.load(Ordering::Relaxed)
    }

    pub fn events_created(&self) -> u64 {
        self.events_created.load(Ordering::Relaxed)
    }

    pub fn persistence_failures(&self) -> u64 {
        self.persistence_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.decisions_recorded,
            &self.reviews_enqueued,
            &self.reviews_completed,
            &self.events_created,
            &self.persistence_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
