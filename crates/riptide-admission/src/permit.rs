//! Admission permits and scoped memory charges.
//!
//! A [`ReadPermit`] proves a reader was admitted and owns the resources
//! reserved at admission (`base_cost`, typically one slot plus the caller's
//! memory estimate). Permits are cheaply cloneable so several collaborators
//! (the reader itself, the tracking file it spawned) can hold the same
//! logical permit; the **last** clone to drop returns `base_cost` to the
//! semaphore, exactly once.
//!
//! [`MemoryUnits`] is the incremental companion: a move-only handle over a
//! memory delta debited from the same semaphore, resizable as the real cost
//! of an operation becomes known, credited back on drop.

use std::fmt;
use std::rc::Rc;

use riptide_types::Resources;

use crate::semaphore::SemInner;

// ---------------------------------------------------------------------------
// ReadPermit
// ---------------------------------------------------------------------------

pub(crate) struct PermitInner {
    sem: Rc<SemInner>,
    base_cost: std::cell::Cell<Resources>,
}

impl Drop for PermitInner {
    fn drop(&mut self) {
        // Last holder gone: return whatever release() has not already
        // returned.
        let cost = self.base_cost.replace(Resources::ZERO);
        if !cost.is_zero() {
            SemInner::signal(&self.sem, cost);
        }
    }
}

/// Shared handle over an admitted read's reserved resources.
///
/// The null permit ([`ReadPermit::untracked`]) carries no semaphore and no
/// cost; every operation on it is inert. It is used for readers that bypass
/// admission control (internal maintenance reads, cache-only shards).
#[derive(Clone, Default)]
pub struct ReadPermit {
    inner: Option<Rc<PermitInner>>,
}

impl ReadPermit {
    /// The null permit: proves nothing, charges nothing.
    #[must_use]
    pub fn untracked() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_parts(sem: Rc<SemInner>, base_cost: Resources) -> Self {
        Self {
            inner: Some(Rc::new(PermitInner {
                sem,
                base_cost: std::cell::Cell::new(base_cost),
            })),
        }
    }

    /// Whether this permit is bound to a semaphore.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.inner.is_some()
    }

    /// The resources this permit still owes back to its semaphore.
    #[must_use]
    pub fn base_cost(&self) -> Resources {
        self.inner
            .as_ref()
            .map_or(Resources::ZERO, |inner| inner.base_cost.get())
    }

    /// Return the reserved resources immediately.
    ///
    /// Subsequent drops of this permit (and of every clone) are no-ops: the
    /// base cost is returned exactly once over the permit's lifetime.
    pub fn release(&self) {
        if let Some(inner) = &self.inner {
            let cost = inner.base_cost.replace(Resources::ZERO);
            if !cost.is_zero() {
                SemInner::signal(&inner.sem, cost);
            }
        }
    }

    /// Acquire `memory` bytes from this permit's semaphore, scoped to the
    /// returned handle.
    ///
    /// On the null permit the returned units are unbound and account for
    /// nothing.
    #[must_use]
    pub fn get_memory_units(&self, memory: u64) -> MemoryUnits {
        MemoryUnits::new(
            self.inner.as_ref().map(|inner| Rc::clone(&inner.sem)),
            clamp_to_i64(memory),
        )
    }
}

impl fmt::Debug for ReadPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadPermit")
            .field("tracked", &self.is_tracked())
            .field("base_cost", &self.base_cost())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// MemoryUnits
// ---------------------------------------------------------------------------

pub(crate) fn clamp_to_i64(memory: u64) -> i64 {
    i64::try_from(memory).unwrap_or(i64::MAX)
}

/// A scoped memory debit against a semaphore.
///
/// Move-only. Construction debits, drop credits, and [`MemoryUnits::reset`]
/// re-sizes the debit in place. Unbound units (from the null permit) are a
/// pure no-op in every path and cannot be rebound.
pub struct MemoryUnits {
    sem: Option<Rc<SemInner>>,
    memory: i64,
}

impl MemoryUnits {
    pub(crate) fn new(sem: Option<Rc<SemInner>>, memory: i64) -> Self {
        match sem {
            Some(sem) => {
                if memory != 0 {
                    sem.consume_memory(memory);
                }
                Self {
                    sem: Some(sem),
                    memory,
                }
            }
            None => Self {
                sem: None,
                memory: 0,
            },
        }
    }

    /// The bytes currently held by this handle.
    #[must_use]
    pub fn memory(&self) -> i64 {
        self.memory
    }

    /// Resize the debit to `memory` bytes.
    ///
    /// The new amount is debited **before** the old amount is credited:
    /// crediting first could wake waiters into headroom that is about to
    /// disappear.
    pub fn reset(&mut self, memory: u64) {
        let Some(sem) = &self.sem else { return };
        let memory = clamp_to_i64(memory);
        sem.consume_memory(memory);
        let old = std::mem::replace(&mut self.memory, memory);
        SemInner::signal(sem, Resources::with_memory(old));
    }
}

impl Drop for MemoryUnits {
    fn drop(&mut self) {
        self.reset(0);
    }
}

impl fmt::Debug for MemoryUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryUnits")
            .field("bound", &self.sem.is_some())
            .field("memory", &self.memory)
            .finish()
    }
}
