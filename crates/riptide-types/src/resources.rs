//! Reader resource accounting.
//!
//! Every admitted read consumes a pair of resources: one reader **slot**
//! (the `count` dimension) and a **memory** budget in bytes. [`Resources`]
//! is the additive value type both the semaphore's available pool and each
//! permit's base cost are expressed in.
//!
//! `memory` is signed: the pool is allowed to go transiently negative when
//! reads over-commit (admission treats memory as a soft limit) and when a
//! memory-units resize debits the new amount before crediting the old one.
//! `count` is signed only so that arithmetic cannot silently wrap; the
//! semaphore treats a negative slot count as a fatal invariant violation.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Resources consumed by one admitted read: a reader slot count and a
/// memory budget in bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    /// Reader slots.
    pub count: i64,
    /// Memory budget in bytes. May be negative in the available pool.
    pub memory: i64,
}

impl Resources {
    /// Zero resources (identity for `+` and `-`).
    pub const ZERO: Self = Self::new(0, 0);

    /// Create a resource pair.
    #[must_use]
    pub const fn new(count: i64, memory: i64) -> Self {
        Self { count, memory }
    }

    /// Resources consisting only of reader slots.
    #[must_use]
    pub const fn with_count(count: i64) -> Self {
        Self::new(count, 0)
    }

    /// Resources consisting only of memory.
    #[must_use]
    pub const fn with_memory(memory: i64) -> Self {
        Self::new(0, memory)
    }

    /// Both dimensions are zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.count == 0 && self.memory == 0
    }

    /// Whether this request fits within `capacity` on both dimensions.
    #[must_use]
    pub const fn fits_in(self, capacity: Self) -> bool {
        self.count <= capacity.count && self.memory <= capacity.memory
    }
}

impl Add for Resources {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.count + rhs.count, self.memory + rhs.memory)
    }
}

impl Sub for Resources {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.count - rhs.count, self.memory - rhs.memory)
    }
}

impl AddAssign for Resources {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Resources {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl fmt::Display for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{count: {}, memory: {}}}", self.count, self.memory)
    }
}
