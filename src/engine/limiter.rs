//! Concurrency limiter
//!
//! Semaphore-backed gate granting up to N execution slots. Waiters are served
//! in arrival order (tokio's semaphore is fair), not by task index.
//!
//! A slot is an RAII [`Permit`]: dropping it returns the slot and wakes the
//! oldest waiter. Waiting races against a [`CancellationToken`], so tasks
//! queued behind the limiter leave without a slot once the run is tripped.
//!
//! # Example
//!
//! ```rust,ignore
//! use fanout::engine::Limiter;
//!
//! let limiter = Limiter::bounded(NonZeroUsize::new(5).unwrap());
//! if let Some(permit) = limiter.acquire(&token).await {
//!     // run the operation...
//!     drop(permit);
//! }
//! ```

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Bounded (or unbounded) slot pool shared by every task of one run
#[derive(Debug, Clone)]
pub struct Limiter {
    /// `None` in unbounded mode: acquire never waits
    semaphore: Option<Arc<Semaphore>>,
    capacity: Option<usize>,
}

/// One unit of permission to run; released on drop
#[derive(Debug)]
#[must_use = "dropping the permit releases the slot immediately"]
pub struct Permit {
    _slot: Option<OwnedSemaphorePermit>,
}

impl Limiter {
    /// Every acquire succeeds immediately
    pub fn unbounded() -> Self {
        Self {
            semaphore: None,
            capacity: None,
        }
    }

    /// At most `capacity` permits outstanding.
    ///
    /// Capacity is clamped to the semaphore's maximum permit count.
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get().min(Semaphore::MAX_PERMITS);
        Self {
            semaphore: Some(Arc::new(Semaphore::new(capacity))),
            capacity: Some(capacity),
        }
    }

    /// Configured slot count, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Slots currently free, `None` when unbounded
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    /// Wait for a slot.
    ///
    /// Returns `None` instead of a slot if `token` is (or becomes) cancelled
    /// first. A waiter that gives up is removed from the queue without
    /// consuming a slot.
    pub async fn acquire(&self, token: &CancellationToken) -> Option<Permit> {
        if token.is_cancelled() {
            return None;
        }

        let Some(semaphore) = &self.semaphore else {
            return Some(Permit { _slot: None });
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            slot = Arc::clone(semaphore).acquire_owned() => {
                // The semaphore is never closed, so Err cannot happen here
                slot.ok().map(|slot| Permit { _slot: Some(slot) })
            }
        }
    }

    /// Take a slot without waiting
    pub fn try_acquire(&self) -> Option<Permit> {
        match &self.semaphore {
            None => Some(Permit { _slot: None }),
            Some(semaphore) => Arc::clone(semaphore)
                .try_acquire_owned()
                .ok()
                .map(|slot| Permit { _slot: Some(slot) }),
        }
    }
}
