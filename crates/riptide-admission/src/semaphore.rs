//! The read-admission semaphore.
//!
//! Admission is two-dimensional: each read consumes one reader **slot** and
//! a **memory** estimate. Slots are a hard cap; memory is soft — a request
//! whose estimate exceeds the remaining bytes is still admitted while *any*
//! memory headroom remains, because read-ahead estimates routinely overshoot.
//! Only a fully depleted pool blocks.
//!
//! Blocked admissions first reclaim resources from registered idle readers
//! (oldest registration first), then queue FIFO. Every resource credit —
//! permit drop, memory-units shrink, eviction — runs the **wake loop**:
//! admit from the queue head, in order, until the head no longer fits.
//!
//! A semaphore instance is confined to its owning shard: state lives behind
//! `Cell`/`RefCell` with no locking, and its handles ([`ReadPermit`],
//! [`MemoryUnits`], [`Admission`]) must be dropped on that shard.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use serde::Serialize;
use tracing::{debug, trace};

use riptide_error::{Result, RiptideError};
use riptide_types::{Clock, Cx, Resources, Timestamp};

use crate::config::SemaphoreConfig;
use crate::inactive::{InactiveRead, InactiveReadHandle};
use crate::permit::{clamp_to_i64, ReadPermit};

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Counters over the inactive-read registry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InactiveReadStats {
    /// Readers currently registered as inactive.
    pub population: u64,
    /// Readers evicted to make room for admissions.
    pub permit_based_evictions: u64,
}

// ---------------------------------------------------------------------------
// Wait list
// ---------------------------------------------------------------------------

struct WaitEntry {
    res: Resources,
    deadline: Option<Timestamp>,
    waker: Option<Waker>,
    /// Written exactly once, by the wake loop; consumed by the future.
    outcome: Option<Result<ReadPermit>>,
    /// Still occupying a FIFO position. False once an outcome is stored.
    queued: bool,
}

/// FIFO of waiters with O(1) detach.
///
/// Order lives in `order`; detached ids stay behind as tombstones that head
/// scans discard, so removal never disturbs the relative order of live
/// entries.
#[derive(Default)]
struct WaitList {
    entries: HashMap<u64, WaitEntry>,
    order: VecDeque<u64>,
    next_waiter: u64,
    /// Live queued entries (excludes tombstones and completed entries).
    queued: usize,
}

impl WaitList {
    fn enqueue(&mut self, res: Resources, deadline: Option<Timestamp>) -> u64 {
        let id = self.next_waiter;
        self.next_waiter += 1;
        self.entries.insert(
            id,
            WaitEntry {
                res,
                deadline,
                waker: None,
                outcome: None,
                queued: true,
            },
        );
        self.order.push_back(id);
        self.queued += 1;
        id
    }

    /// The id of the first live queued entry, discarding tombstones.
    fn front(&mut self) -> Option<u64> {
        loop {
            let id = *self.order.front()?;
            if self.entries.get(&id).is_some_and(|entry| entry.queued) {
                return Some(id);
            }
            self.order.pop_front();
        }
    }

    fn remove(&mut self, id: u64) -> Option<WaitEntry> {
        let entry = self.entries.remove(&id)?;
        if entry.queued {
            self.queued -= 1;
        }
        Some(entry)
    }
}

// ---------------------------------------------------------------------------
// Semaphore internals
// ---------------------------------------------------------------------------

pub(crate) struct SemInner {
    capacity: Resources,
    /// Available (not consumed) resources. Memory may go negative; a
    /// negative slot count is a fatal accounting bug.
    resources: Cell<Resources>,
    wait_list: RefCell<WaitList>,
    /// Ordered by registration id, so `pop_first` evicts the stalest reader.
    inactive: RefCell<BTreeMap<u64, Box<dyn InactiveRead>>>,
    next_id: Cell<u64>,
    max_queue_length: usize,
    prethrow_action: RefCell<Option<Box<dyn Fn()>>>,
    name: String,
    stats: Cell<InactiveReadStats>,
    clock: Clock,
}

impl SemInner {
    /// Admission predicate: slots are hard-capped, memory only has to have
    /// headroom left.
    fn may_proceed(&self, r: Resources) -> bool {
        let available = self.resources.get();
        r.count <= available.count && (available.memory > 0 || r.memory == 0)
    }

    /// Debit `r` from the pool.
    fn consume(&self, r: Resources) {
        let next = self.resources.get() - r;
        assert!(
            next.count >= 0,
            "semaphore '{}': reader slot count underflow ({} requested, {} available)",
            self.name,
            r.count,
            self.resources.get().count
        );
        self.resources.set(next);
    }

    /// Debit memory only, without waking anyone.
    pub(crate) fn consume_memory(&self, memory: i64) {
        let mut available = self.resources.get();
        available.memory -= memory;
        self.resources.set(available);
    }

    /// Credit `r` back and admit from the queue head until it no longer
    /// fits.
    pub(crate) fn signal(this: &Rc<Self>, r: Resources) {
        this.resources.set(this.resources.get() + r);
        debug_assert!(
            this.resources.get().count <= this.capacity.count,
            "semaphore '{}': more reader slots returned than exist",
            this.name
        );
        Self::run_wake_loop(this);
    }

    /// The synchronous wake pass: runs to quiescence in one cooperative
    /// turn. Expired heads are failed and skipped; a live head that does
    /// not fit stops the pass.
    fn run_wake_loop(this: &Rc<Self>) {
        let now = this.clock.now();
        let mut to_wake = Vec::new();
        {
            let mut wait_list = this.wait_list.borrow_mut();
            while let Some(id) = wait_list.front() {
                let (res, deadline) = {
                    let entry = &wait_list.entries[&id];
                    (entry.res, entry.deadline)
                };
                let outcome = if deadline.is_some_and(|d| d <= now) {
                    Err(RiptideError::AdmissionTimeout {
                        semaphore: this.name.clone(),
                    })
                } else if this.may_proceed(res) {
                    this.consume(res);
                    Ok(ReadPermit::from_parts(Rc::clone(this), res))
                } else {
                    break;
                };
                let entry = wait_list
                    .entries
                    .get_mut(&id)
                    .expect("front returned a live id");
                entry.outcome = Some(outcome);
                entry.queued = false;
                let waker = entry.waker.take();
                wait_list.queued -= 1;
                if let Some(waker) = waker {
                    to_wake.push(waker);
                }
                wait_list.order.pop_front();
            }
            // Here: the queue is empty, or its head does not fit.
        }
        for waker in to_wake {
            waker.wake();
        }
    }

    fn update_stats(&self, f: impl FnOnce(&mut InactiveReadStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

// ---------------------------------------------------------------------------
// ReadSemaphore
// ---------------------------------------------------------------------------

/// Admission-control semaphore for read operations.
///
/// Cheaply cloneable; clones share the same pool. See the module docs for
/// the admission model.
#[derive(Clone)]
pub struct ReadSemaphore {
    inner: Rc<SemInner>,
}

impl ReadSemaphore {
    /// Create a semaphore with fixed capacity. The clock is read on every
    /// deadline check; the owning reactor drives it.
    #[must_use]
    pub fn new(config: SemaphoreConfig, clock: Clock) -> Self {
        let capacity = Resources::new(i64::from(config.count), clamp_to_i64(config.memory));
        debug!(
            semaphore = %config.name,
            count = capacity.count,
            memory = capacity.memory,
            "created read admission semaphore"
        );
        Self {
            inner: Rc::new(SemInner {
                capacity,
                resources: Cell::new(capacity),
                wait_list: RefCell::new(WaitList::default()),
                inactive: RefCell::new(BTreeMap::new()),
                next_id: Cell::new(0),
                max_queue_length: config.max_queue_length,
                prethrow_action: RefCell::new(None),
                name: config.name,
                stats: Cell::new(InactiveReadStats::default()),
                clock,
            }),
        }
    }

    /// Install a diagnostic hook invoked just before a queue-overload
    /// rejection. The hook must not itself install a hook.
    pub fn set_prethrow_action(&self, action: impl Fn() + 'static) {
        *self.inner.prethrow_action.borrow_mut() = Some(Box::new(action));
    }

    /// Request admission for one reader with a `memory` estimate.
    ///
    /// Resolution order: reject if the queue is at its cap; otherwise evict
    /// idle readers (oldest first) while the request does not fit; admit
    /// immediately if it now fits; otherwise queue FIFO until resources
    /// free up, `deadline` passes, or `cx` is cancelled.
    pub fn wait_admission(
        &self,
        cx: &Cx,
        memory: u64,
        deadline: Option<Timestamp>,
    ) -> Admission {
        let inner = &self.inner;

        if inner.wait_list.borrow().queued >= inner.max_queue_length {
            trace!(semaphore = %inner.name, "admission queue overload");
            if let Some(action) = inner.prethrow_action.borrow().as_ref() {
                action();
            }
            return Admission::finished(
                inner,
                cx,
                Err(RiptideError::QueueOverload {
                    semaphore: inner.name.clone(),
                }),
            );
        }

        let request = Resources::new(1, clamp_to_i64(memory));

        // Prefer displacing idle readers over waiting behind them. (Once a
        // waiter exists, new registrations short-circuit instead — see
        // `register_inactive_read` — so nobody jumps the queue.)
        while !inner.may_proceed(request) {
            let evicted = inner.inactive.borrow_mut().pop_first();
            let Some((id, reader)) = evicted else { break };
            inner.update_stats(|stats| {
                stats.permit_based_evictions += 1;
                stats.population -= 1;
            });
            trace!(semaphore = %inner.name, id, "evicting inactive read under resource pressure");
            // The entry has left the registry; the callback may re-enter
            // the semaphore freely.
            reader.evict();
        }

        if inner.may_proceed(request) {
            inner.consume(request);
            return Admission::finished(
                inner,
                cx,
                Ok(ReadPermit::from_parts(Rc::clone(inner), request)),
            );
        }

        if deadline.is_some_and(|d| d <= inner.clock.now()) {
            return Admission::finished(
                inner,
                cx,
                Err(RiptideError::AdmissionTimeout {
                    semaphore: inner.name.clone(),
                }),
            );
        }

        let id = inner.wait_list.borrow_mut().enqueue(request, deadline);
        Admission {
            sem: Rc::clone(inner),
            cx: cx.clone(),
            state: AdmissionState::Queued { id },
        }
    }

    /// Synchronous fast path for callers that reserved `r` out of band.
    ///
    /// # Panics
    ///
    /// Panics if the debit would drive the slot count negative.
    pub fn consume_resources(&self, r: Resources) -> ReadPermit {
        self.inner.consume(r);
        ReadPermit::from_parts(Rc::clone(&self.inner), r)
    }

    /// Park an idle reader so its resources can be reclaimed under
    /// pressure.
    ///
    /// With waiters queued, parking would put new work behind an idle
    /// holder; the reader is evicted on the spot instead and the **empty**
    /// handle is returned.
    pub fn register_inactive_read(&self, reader: Box<dyn InactiveRead>) -> InactiveReadHandle {
        let inner = &self.inner;
        if inner.wait_list.borrow().queued == 0 {
            let id = inner.next_id.get();
            inner.next_id.set(id + 1);
            inner.inactive.borrow_mut().insert(id, reader);
            inner.update_stats(|stats| stats.population += 1);
            trace!(semaphore = %inner.name, id, "registered inactive read");
            return InactiveReadHandle::new(id);
        }

        inner.update_stats(|stats| stats.permit_based_evictions += 1);
        trace!(semaphore = %inner.name, "waiters queued; evicting reader at registration");
        // The released permit may admit the queue head.
        reader.evict();
        InactiveReadHandle::default()
    }

    /// Take a parked reader back for resumption. Does **not** evict it.
    pub fn unregister_inactive_read(
        &self,
        handle: InactiveReadHandle,
    ) -> Option<Box<dyn InactiveRead>> {
        let id = handle.id()?;
        let reader = self.inner.inactive.borrow_mut().remove(&id)?;
        self.inner.update_stats(|stats| stats.population -= 1);
        Some(reader)
    }

    /// Evict the stalest parked reader, if any. Returns whether an
    /// eviction happened.
    pub fn try_evict_one_inactive_read(&self) -> bool {
        let evicted = self.inner.inactive.borrow_mut().pop_first();
        let Some((id, reader)) = evicted else {
            return false;
        };
        self.inner.update_stats(|stats| {
            stats.permit_based_evictions += 1;
            stats.population -= 1;
        });
        trace!(semaphore = %self.inner.name, id, "evicted one inactive read");
        reader.evict();
        true
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn capacity(&self) -> Resources {
        self.inner.capacity
    }

    /// The currently available (not consumed) resources.
    #[must_use]
    pub fn available_resources(&self) -> Resources {
        self.inner.resources.get()
    }

    /// Live queued admissions.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.inner.wait_list.borrow().queued
    }

    #[must_use]
    pub fn inactive_read_stats(&self) -> InactiveReadStats {
        self.inner.stats.get()
    }
}

impl std::fmt::Debug for ReadSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadSemaphore")
            .field("name", &self.inner.name)
            .field("capacity", &self.inner.capacity)
            .field("available", &self.inner.resources.get())
            .field("waiters", &self.inner.wait_list.borrow().queued)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Admission future
// ---------------------------------------------------------------------------

enum AdmissionState {
    /// Resolved at call time (immediate grant, overload, expired deadline).
    Finished(Option<Result<ReadPermit>>),
    Queued { id: u64 },
    Consumed,
}

/// Future returned by [`ReadSemaphore::wait_admission`].
///
/// Dropping an unresolved admission detaches it from the queue; dropping a
/// granted-but-unobserved one returns the granted resources.
#[must_use = "admissions do nothing unless polled"]
pub struct Admission {
    sem: Rc<SemInner>,
    cx: Cx,
    state: AdmissionState,
}

impl Admission {
    fn finished(sem: &Rc<SemInner>, cx: &Cx, outcome: Result<ReadPermit>) -> Self {
        Self {
            sem: Rc::clone(sem),
            cx: cx.clone(),
            state: AdmissionState::Finished(Some(outcome)),
        }
    }

    /// Take the stored outcome for `id`, removing the entry, if the wake
    /// loop has resolved it.
    fn take_outcome(sem: &Rc<SemInner>, id: u64) -> Option<Result<ReadPermit>> {
        let mut wait_list = sem.wait_list.borrow_mut();
        if !wait_list
            .entries
            .get(&id)
            .is_some_and(|entry| entry.outcome.is_some())
        {
            return None;
        }
        let mut entry = wait_list.remove(id).expect("entry checked above");
        entry.outcome.take()
    }

    /// Remove a still-queued entry. Any granted permit inside is dropped
    /// outside the wait-list borrow so its credit can re-enter the
    /// semaphore.
    fn detach(sem: &Rc<SemInner>, id: u64) {
        let removed = sem.wait_list.borrow_mut().remove(id);
        drop(removed);
    }
}

impl Future for Admission {
    type Output = Result<ReadPermit>;

    fn poll(self: Pin<&mut Self>, task: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            AdmissionState::Finished(slot) => {
                let outcome = slot.take().expect("admission polled after completion");
                this.state = AdmissionState::Consumed;
                Poll::Ready(outcome)
            }
            AdmissionState::Queued { id } => {
                let id = *id;
                if let Some(outcome) = Self::take_outcome(&this.sem, id) {
                    this.state = AdmissionState::Consumed;
                    return Poll::Ready(outcome);
                }
                if this.cx.checkpoint().is_err() {
                    Self::detach(&this.sem, id);
                    this.state = AdmissionState::Consumed;
                    return Poll::Ready(Err(RiptideError::Cancelled));
                }
                let deadline = {
                    let wait_list = this.sem.wait_list.borrow();
                    wait_list.entries.get(&id).and_then(|entry| entry.deadline)
                };
                if deadline.is_some_and(|d| d <= this.sem.clock.now()) {
                    Self::detach(&this.sem, id);
                    this.state = AdmissionState::Consumed;
                    return Poll::Ready(Err(RiptideError::AdmissionTimeout {
                        semaphore: this.sem.name.clone(),
                    }));
                }
                if let Some(entry) = this.sem.wait_list.borrow_mut().entries.get_mut(&id) {
                    entry.waker = Some(task.waker().clone());
                }
                Poll::Pending
            }
            AdmissionState::Consumed => panic!("admission polled after completion"),
        }
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        if let AdmissionState::Queued { id } = self.state {
            Self::detach(&self.sem, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell as StdCell;

    use crate::test_util::poll_once;

    use super::*;

    fn semaphore(count: u32, memory: u64) -> (ReadSemaphore, Clock) {
        let clock = Clock::new();
        (
            ReadSemaphore::new(SemaphoreConfig::new("test", count, memory), clock.clone()),
            clock,
        )
    }

    struct TestReader {
        permit: Option<ReadPermit>,
        evictions: Rc<StdCell<u64>>,
    }

    impl TestReader {
        fn boxed(permit: Option<ReadPermit>, evictions: &Rc<StdCell<u64>>) -> Box<Self> {
            Box::new(Self {
                permit,
                evictions: Rc::clone(evictions),
            })
        }
    }

    impl InactiveRead for TestReader {
        fn evict(self: Box<Self>) {
            self.evictions.set(self.evictions.get() + 1);
            drop(self.permit);
        }
    }

    #[test]
    fn immediate_admission_debits_and_drop_returns() {
        let (sem, _clock) = semaphore(2, 1024);
        let cx = Cx::new();
        let mut admission = sem.wait_admission(&cx, 100, None);
        let permit = match poll_once(&mut admission) {
            Poll::Ready(Ok(permit)) => permit,
            other => panic!("expected immediate grant, got {other:?}"),
        };
        assert_eq!(sem.available_resources(), Resources::new(1, 924));
        drop(permit);
        assert_eq!(sem.available_resources(), Resources::new(2, 1024));
    }

    #[test]
    fn waiters_admit_in_fifo_order() {
        let (sem, _clock) = semaphore(1, 1024);
        let cx = Cx::new();
        let p1 = poll_once(&mut sem.wait_admission(&cx, 100, None));
        let Poll::Ready(Ok(p1)) = p1 else {
            panic!("first admission should be immediate");
        };

        let mut a2 = sem.wait_admission(&cx, 100, None);
        let mut a3 = sem.wait_admission(&cx, 100, None);
        assert!(poll_once(&mut a2).is_pending());
        assert!(poll_once(&mut a3).is_pending());
        assert_eq!(sem.waiter_count(), 2);

        drop(p1);
        let Poll::Ready(Ok(p2)) = poll_once(&mut a2) else {
            panic!("second admission should be granted after first drop");
        };
        assert!(poll_once(&mut a3).is_pending());

        drop(p2);
        assert!(matches!(poll_once(&mut a3), Poll::Ready(Ok(_))));
    }

    #[test]
    fn memory_is_a_soft_limit() {
        let (sem, _clock) = semaphore(10, 64);
        let cx = Cx::new();
        let Poll::Ready(Ok(_permit)) = poll_once(&mut sem.wait_admission(&cx, 10_000, None))
        else {
            panic!("oversized estimate should be admitted while headroom remains");
        };
        assert_eq!(sem.available_resources(), Resources::new(9, -9936));

        let mut blocked = sem.wait_admission(&cx, 1, None);
        assert!(poll_once(&mut blocked).is_pending());
    }

    #[test]
    fn zero_memory_request_ignores_depleted_pool() {
        let (sem, _clock) = semaphore(10, 64);
        let cx = Cx::new();
        let Poll::Ready(Ok(_big)) = poll_once(&mut sem.wait_admission(&cx, 10_000, None)) else {
            panic!("setup admission failed");
        };
        // Memory is exhausted, but a zero-memory request only needs a slot.
        assert!(matches!(
            poll_once(&mut sem.wait_admission(&cx, 0, None)),
            Poll::Ready(Ok(_))
        ));
    }

    #[test]
    fn admission_evicts_idle_readers_oldest_first() {
        let (sem, _clock) = semaphore(1, 1024);
        let cx = Cx::new();
        let evictions = Rc::new(StdCell::new(0));

        let Poll::Ready(Ok(p1)) = poll_once(&mut sem.wait_admission(&cx, 100, None)) else {
            panic!("setup admission failed");
        };
        let h1 = sem.register_inactive_read(TestReader::boxed(Some(p1), &evictions));
        let h2 = sem.register_inactive_read(TestReader::boxed(None, &evictions));
        assert!(!h1.is_empty());
        assert!(!h2.is_empty());
        assert_eq!(sem.inactive_read_stats().population, 2);

        // Evicting the oldest reader drops its permit, freeing the slot.
        let Poll::Ready(Ok(_p2)) = poll_once(&mut sem.wait_admission(&cx, 100, None)) else {
            panic!("eviction should have made room");
        };
        assert_eq!(evictions.get(), 1);
        let stats = sem.inactive_read_stats();
        assert_eq!(stats.permit_based_evictions, 1);
        assert_eq!(stats.population, 1);
        // The younger registration survived.
        assert!(sem.unregister_inactive_read(h2).is_some());
    }

    #[test]
    fn registration_with_waiters_evicts_immediately() {
        let (sem, _clock) = semaphore(1, 1024);
        let cx = Cx::new();
        let evictions = Rc::new(StdCell::new(0));

        let Poll::Ready(Ok(_p1)) = poll_once(&mut sem.wait_admission(&cx, 100, None)) else {
            panic!("setup admission failed");
        };
        let mut waiting = sem.wait_admission(&cx, 100, None);
        assert!(poll_once(&mut waiting).is_pending());

        let handle = sem.register_inactive_read(TestReader::boxed(None, &evictions));
        assert!(handle.is_empty());
        assert_eq!(evictions.get(), 1);
        let stats = sem.inactive_read_stats();
        assert_eq!(stats.permit_based_evictions, 1);
        assert_eq!(stats.population, 0);
    }

    #[test]
    fn queue_overload_invokes_prethrow_hook_once() {
        let cx = Cx::new();
        let config = SemaphoreConfig::new("overload", 1, 1024).with_max_queue_length(1);
        let sem = ReadSemaphore::new(config, Clock::new());
        let hook_calls = Rc::new(StdCell::new(0_u32));
        {
            let hook_calls = Rc::clone(&hook_calls);
            sem.set_prethrow_action(move || hook_calls.set(hook_calls.get() + 1));
        }

        let Poll::Ready(Ok(_p1)) = poll_once(&mut sem.wait_admission(&cx, 100, None)) else {
            panic!("setup admission failed");
        };
        let mut queued = sem.wait_admission(&cx, 100, None);
        assert!(poll_once(&mut queued).is_pending());

        let mut rejected = sem.wait_admission(&cx, 100, None);
        match poll_once(&mut rejected) {
            Poll::Ready(Err(RiptideError::QueueOverload { semaphore })) => {
                assert_eq!(semaphore, "overload");
            }
            other => panic!("expected queue overload, got {other:?}"),
        }
        assert_eq!(hook_calls.get(), 1);
    }

    #[test]
    fn waiter_times_out_at_its_deadline() {
        let (sem, clock) = semaphore(1, 1024);
        let cx = Cx::new();
        let Poll::Ready(Ok(_p1)) = poll_once(&mut sem.wait_admission(&cx, 100, None)) else {
            panic!("setup admission failed");
        };

        let mut waiting = sem.wait_admission(&cx, 100, Some(Timestamp::from_millis(500)));
        assert!(poll_once(&mut waiting).is_pending());

        clock.advance(499);
        assert!(poll_once(&mut waiting).is_pending());

        clock.advance(1);
        match poll_once(&mut waiting) {
            Poll::Ready(Err(RiptideError::AdmissionTimeout { .. })) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(sem.waiter_count(), 0);
    }

    #[test]
    fn wake_loop_skips_expired_heads() {
        let (sem, clock) = semaphore(1, 1024);
        let cx = Cx::new();
        let Poll::Ready(Ok(p1)) = poll_once(&mut sem.wait_admission(&cx, 100, None)) else {
            panic!("setup admission failed");
        };

        let mut doomed = sem.wait_admission(&cx, 100, Some(Timestamp::from_millis(100)));
        let mut patient = sem.wait_admission(&cx, 100, None);
        assert!(poll_once(&mut doomed).is_pending());
        assert!(poll_once(&mut patient).is_pending());

        clock.advance(200);
        drop(p1);

        // The expired head was failed; the live waiter behind it admitted.
        match poll_once(&mut doomed) {
            Poll::Ready(Err(RiptideError::AdmissionTimeout { .. })) => {}
            other => panic!("expected timeout for the expired head, got {other:?}"),
        }
        assert!(matches!(poll_once(&mut patient), Poll::Ready(Ok(_))));
    }

    #[test]
    fn expired_deadline_fails_without_queueing() {
        let (sem, clock) = semaphore(1, 1024);
        let cx = Cx::new();
        let Poll::Ready(Ok(_p1)) = poll_once(&mut sem.wait_admission(&cx, 100, None)) else {
            panic!("setup admission failed");
        };
        clock.advance(50);
        let mut late = sem.wait_admission(&cx, 100, Some(Timestamp::from_millis(10)));
        assert!(matches!(
            poll_once(&mut late),
            Poll::Ready(Err(RiptideError::AdmissionTimeout { .. }))
        ));
        assert_eq!(sem.waiter_count(), 0);
    }

    #[test]
    fn cancellation_fails_a_queued_waiter() {
        let (sem, _clock) = semaphore(1, 1024);
        let cx = Cx::new();
        let Poll::Ready(Ok(_p1)) = poll_once(&mut sem.wait_admission(&cx, 100, None)) else {
            panic!("setup admission failed");
        };
        let mut waiting = sem.wait_admission(&cx, 100, None);
        assert!(poll_once(&mut waiting).is_pending());

        cx.cancel();
        assert!(matches!(
            poll_once(&mut waiting),
            Poll::Ready(Err(RiptideError::Cancelled))
        ));
        assert_eq!(sem.waiter_count(), 0);
    }

    #[test]
    fn dropping_a_pending_admission_detaches_it() {
        let (sem, _clock) = semaphore(1, 1024);
        let cx = Cx::new();
        let Poll::Ready(Ok(p1)) = poll_once(&mut sem.wait_admission(&cx, 100, None)) else {
            panic!("setup admission failed");
        };
        let mut abandoned = sem.wait_admission(&cx, 100, None);
        assert!(poll_once(&mut abandoned).is_pending());
        let mut persistent = sem.wait_admission(&cx, 100, None);
        assert!(poll_once(&mut persistent).is_pending());

        drop(abandoned);
        assert_eq!(sem.waiter_count(), 1);

        // The abandoned waiter no longer blocks the one behind it.
        drop(p1);
        assert!(matches!(poll_once(&mut persistent), Poll::Ready(Ok(_))));
    }

    #[test]
    fn dropping_a_granted_unobserved_admission_returns_resources() {
        let (sem, _clock) = semaphore(1, 1024);
        let cx = Cx::new();
        let Poll::Ready(Ok(p1)) = poll_once(&mut sem.wait_admission(&cx, 100, None)) else {
            panic!("setup admission failed");
        };
        let mut unobserved = sem.wait_admission(&cx, 100, None);
        assert!(poll_once(&mut unobserved).is_pending());

        // The wake loop grants into the entry; the future is then dropped
        // without ever being polled again.
        drop(p1);
        drop(unobserved);
        assert_eq!(sem.available_resources(), Resources::new(1, 1024));
    }

    #[test]
    fn consume_resources_is_an_unconditional_debit() {
        let (sem, _clock) = semaphore(2, 100);
        let permit = sem.consume_resources(Resources::new(1, 500));
        assert_eq!(sem.available_resources(), Resources::new(1, -400));
        drop(permit);
        assert_eq!(sem.available_resources(), Resources::new(2, 100));
    }

    #[test]
    #[should_panic(expected = "reader slot count underflow")]
    fn slot_underflow_is_fatal() {
        let (sem, _clock) = semaphore(1, 1024);
        let _p1 = sem.consume_resources(Resources::new(1, 0));
        let _p2 = sem.consume_resources(Resources::new(1, 0));
    }

    #[test]
    fn unregister_returns_the_reader_without_evicting() {
        let (sem, _clock) = semaphore(1, 1024);
        let evictions = Rc::new(StdCell::new(0));
        let handle = sem.register_inactive_read(TestReader::boxed(None, &evictions));
        assert_eq!(sem.inactive_read_stats().population, 1);

        let reader = sem.unregister_inactive_read(handle);
        assert!(reader.is_some());
        assert_eq!(evictions.get(), 0);
        assert_eq!(sem.inactive_read_stats().population, 0);

        // A second unregistration of the same handle finds nothing.
        assert!(sem.unregister_inactive_read(handle).is_none());
        // The empty handle refers to nothing.
        assert!(sem
            .unregister_inactive_read(InactiveReadHandle::default())
            .is_none());
    }

    #[test]
    fn try_evict_one_pops_oldest_and_reports() {
        let (sem, _clock) = semaphore(4, 1024);
        let evictions = Rc::new(StdCell::new(0));
        assert!(!sem.try_evict_one_inactive_read());

        sem.register_inactive_read(TestReader::boxed(None, &evictions));
        sem.register_inactive_read(TestReader::boxed(None, &evictions));
        assert!(sem.try_evict_one_inactive_read());
        assert_eq!(evictions.get(), 1);
        let stats = sem.inactive_read_stats();
        assert_eq!(stats.population, 1);
        assert_eq!(stats.permit_based_evictions, 1);
    }

    #[test]
    fn at_rest_the_pool_equals_capacity() {
        let (sem, _clock) = semaphore(3, 4096);
        let cx = Cx::new();
        {
            let Poll::Ready(Ok(p)) = poll_once(&mut sem.wait_admission(&cx, 1000, None)) else {
                panic!("admission failed");
            };
            let q = sem.consume_resources(Resources::new(1, 2000));
            let units = p.get_memory_units(512);
            drop(units);
            drop(q);
            drop(p);
        }
        assert_eq!(sem.available_resources(), sem.capacity());
    }
}
