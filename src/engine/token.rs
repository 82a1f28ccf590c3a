//! Run-wide cancellation token with a first-failure slot
//!
//! One [`TripToken`] is created per run and shared by reference with every
//! task. It combines:
//! - a broadcast [`CancellationToken`] that tasks observe without blocking
//! - a write-once cause: the first failure claims it with a compare-and-set,
//!   later failures are dropped
//!
//! The token can also be tripped from outside (parent token cancelled) with
//! no cause recorded.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::TraverseError;

/// Shared, one-shot cancellation signal for a single run
#[derive(Debug)]
pub struct TripToken<E> {
    cancellation: CancellationToken,
    /// Set by the single winning `trip`
    claimed: AtomicBool,
    cause: Mutex<Option<TraverseError<E>>>,
}

impl<E> TripToken<E> {
    pub fn new() -> Self {
        Self::from_cancellation(CancellationToken::new())
    }

    /// Token that also trips when `parent` is cancelled.
    ///
    /// Tripping this token never cancels the parent.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self::from_cancellation(parent.child_token())
    }

    fn from_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            claimed: AtomicBool::new(false),
            cause: Mutex::new(None),
        }
    }

    /// The broadcast half, for `select!` checkpoints
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// True once tripped by a failure or by the parent
    pub fn is_tripped(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// True once a failure has claimed the cause slot
    pub fn has_cause(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Record `cause` and cancel every observer.
    ///
    /// Returns `true` only for the first caller; every later cause is
    /// discarded and the token is left untouched.
    pub fn trip(&self, cause: TraverseError<E>) -> bool {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        *self.cause.lock() = Some(cause);
        self.cancellation.cancel();
        true
    }

    /// Take the recorded cause (only meaningful after every task settled)
    pub fn take_cause(&self) -> Option<TraverseError<E>> {
        self.cause.lock().take()
    }
}

impl<E> Default for TripToken<E> {
    fn default() -> Self {
        Self::new()
    }
}
