//! Inactive-read registration.
//!
//! A reader that is admitted but currently not making progress (for
//! example, parked behind a higher-level cache or waiting for its consumer)
//! can hand itself to the semaphore as an **inactive read**. Under memory
//! pressure the semaphore reclaims resources by *evicting* registered
//! readers, oldest registration first, instead of queueing new work behind
//! idle holders.

/// An evictable capability over an idle reader.
///
/// `evict` must make the underlying reader release its permit promptly,
/// typically by dropping it. The consuming receiver makes "called at most
/// once" structural: the registry always removes the entry before invoking
/// it, and an evicted reader cannot be evicted again.
///
/// `evict` runs synchronously on the owning shard and may re-enter the
/// semaphore (the released permit triggers the wake loop, and the callback
/// may register *other* readers); it must not attempt to re-register the
/// reader being evicted.
pub trait InactiveRead {
    fn evict(self: Box<Self>);
}

/// Token referring to a registered inactive read.
///
/// A default-constructed handle is the **empty** handle and refers to
/// nothing; unregistering it yields `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InactiveReadHandle(Option<u64>);

impl InactiveReadHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(Some(id))
    }

    /// Whether this handle refers to nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub(crate) fn id(&self) -> Option<u64> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handle_is_empty() {
        let handle = InactiveReadHandle::default();
        assert!(handle.is_empty());
        assert_eq!(handle.id(), None);
    }

    #[test]
    fn registered_handle_carries_its_id() {
        let handle = InactiveReadHandle::new(7);
        assert!(!handle.is_empty());
        assert_eq!(handle.id(), Some(7));
    }
}
