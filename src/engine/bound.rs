//! Concurrency bound selection
//!
//! A traversal either gives every element its own slot ([`Bound::Unbounded`])
//! or queues excess tasks behind a fixed number of slots ([`Bound::Limited`]).
//! The bound only changes how many operations run at once, never ordering
//! or cancellation.

use std::fmt;
use std::num::NonZeroUsize;

use crate::error::FanoutError;

use super::limiter::Limiter;

/// Maximum number of operations allowed in flight within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Bound {
    /// Every task starts immediately
    #[default]
    Unbounded,
    /// At most N tasks hold a limiter slot at any instant
    Limited(NonZeroUsize),
}

impl Bound {
    /// Build a limited bound from a raw count.
    ///
    /// Returns [`FanoutError::InvalidBound`] for zero.
    pub fn limited(n: usize) -> Result<Self, FanoutError> {
        NonZeroUsize::new(n)
            .map(Self::Limited)
            .ok_or(FanoutError::InvalidBound { bound: n })
    }

    /// Slot count, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Limited(n) => Some(n.get()),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }

    /// Limiter sized for this bound
    pub(crate) fn limiter(&self) -> Limiter {
        match self {
            Self::Unbounded => Limiter::unbounded(),
            Self::Limited(n) => Limiter::bounded(*n),
        }
    }
}

impl From<NonZeroUsize> for Bound {
    fn from(n: NonZeroUsize) -> Self {
        Self::Limited(n)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Limited(n) => write!(f, "{}", n),
        }
    }
}
