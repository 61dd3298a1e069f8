use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdmissionSnapshot {
    pub capacity: usize,
    pub inflight: usize,
    /// Slots free right now; zero while a capacity cut is draining.
    pub available: usize,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no admission slot within {waited:?}")]
pub struct AdmissionTimedOut {
    pub waited: Duration,
}

#[derive(Debug)]
struct State {
    capacity: usize,
    inflight: usize,
}

/// Bounded-concurrency gate with a reconfigurable capacity.
///
/// - `inflight` and `capacity` live behind one mutex
/// - every release and every capacity change wakes *all* waiters, which then
///   race to re-check `inflight < capacity`; losers go back to sleep
/// - admission order is therefore not FIFO and must not be relied upon
pub struct AdmissionLimiter {
    state: Mutex<State>,
    changed: Notify,
}

impl AdmissionLimiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                capacity: capacity.max(1),
                inflight: 0,
            }),
            changed: Notify::new(),
        }
    }

    // Critical sections never panic, so a poisoned lock still holds consistent counters.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until `inflight < capacity`, then take a slot.
    ///
    /// Cancel-safe: dropping the future while it waits takes no slot and leaves
    /// other waiters untouched, so it can be raced against a deadline.
    /// Each completed `acquire` must be paired with exactly one [`release`](Self::release).
    pub async fn acquire(&self) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before checking so a wake between check and await is not lost.
            notified.as_mut().enable();

            if self.try_acquire() {
                return;
            }
            notified.await;
        }
    }

    /// Take a slot if one is free right now.
    pub fn try_acquire(&self) -> bool {
        let mut st = self.lock();
        if st.inflight < st.capacity {
            st.inflight += 1;
            true
        } else {
            false
        }
    }

    /// Give a slot back. Never blocks, never fails; floored at zero.
    pub fn release(&self) {
        {
            let mut st = self.lock();
            st.inflight = st.inflight.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    /// Change capacity (floored at 1) and make every blocked waiter re-evaluate.
    pub fn set_capacity(&self, capacity: usize) {
        {
            let mut st = self.lock();
            st.capacity = capacity.max(1);
        }
        self.changed.notify_waiters();
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// [`acquire`](Self::acquire) bounded by `timeout`, returning a permit that
    /// releases the slot when dropped.
    pub async fn admit(&self, timeout: Duration) -> Result<AdmissionPermit<'_>, AdmissionTimedOut> {
        match tokio::time::timeout(timeout, self.acquire()).await {
            Ok(()) => Ok(AdmissionPermit { limiter: self }),
            Err(_) => Err(AdmissionTimedOut { waited: timeout }),
        }
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        let st = self.lock();
        AdmissionSnapshot {
            capacity: st.capacity,
            inflight: st.inflight,
            available: st.capacity.saturating_sub(st.inflight),
        }
    }
}

impl Default for AdmissionLimiter {
    fn default() -> Self {
        Self::new(1)
    }
}

/// A held admission slot. Released exactly once, on drop.
#[must_use = "dropping the permit releases the admission slot"]
pub struct AdmissionPermit<'a> {
    limiter: &'a AdmissionLimiter,
}

impl std::fmt::Debug for AdmissionPermit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionPermit").finish_non_exhaustive()
    }
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
