//! Lamport logical clock.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotone non-decreasing logical clock.
///
/// `tick` stamps every outgoing snippet; `observe` merges the timestamp
/// of every incoming one before it is enqueued, so locally observed
/// snippets carry a total order consistent with causality. Operations
/// are atomic; no ordering is promised between `tick` and `observe` on
/// different tasks beyond monotonicity of individual updates.
#[derive(Debug, Default)]
pub struct LamportClock(AtomicU64);

impl LamportClock {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Advance by one and return the new value.
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Merge a remote timestamp: the clock becomes `max(current, t)`.
    pub fn observe(&self, t: u64) {
        self.0.fetch_max(t, Ordering::SeqCst);
    }
}
