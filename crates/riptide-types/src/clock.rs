//! The shard's coarse clock.
//!
//! Riptide never reads ambient wall-clock time from core code: the owning
//! reactor drives a shared millisecond counter once per poll loop, and every
//! deadline check reads that counter. This keeps deadline behavior
//! deterministic under test (time moves only when the driver moves it) and
//! cheap at runtime (one atomic load per check).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A millisecond timestamp on the shard's coarse clock.
///
/// Timestamps are opaque points on the driving clock's axis; they are only
/// meaningful relative to the [`Clock`] that produced them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The earliest representable instant.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// This instant shifted `millis` into the future, saturating at the
    /// clock's horizon.
    #[must_use]
    pub const fn saturating_add_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

/// Cloneable handle to the shard's coarse clock.
///
/// All clones observe the same counter. The counter is monotone: `set` with
/// an older timestamp is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    millis: Arc<AtomicU64>,
}

impl Clock {
    /// A clock starting at [`Timestamp::ZERO`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock starting at `start`.
    #[must_use]
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start.as_millis())),
        }
    }

    /// The current instant.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        Timestamp(self.millis.load(Ordering::Acquire))
    }

    /// Move the clock forward to `t`. Never moves it backwards.
    pub fn set(&self, t: Timestamp) {
        self.millis.fetch_max(t.as_millis(), Ordering::AcqRel);
    }

    /// Advance the clock by `millis`.
    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::AcqRel);
    }
}
