//! Ordered result slots
//!
//! Outcomes arrive in completion order; the collector files each one under
//! its input index and hands back the values in input order. The engine owns
//! the collector outright: tasks return their values through the join set
//! and only the engine loop writes, so no locking is needed.

use crate::error::FanoutError;

/// Fixed-size slot array indexed by input position
#[derive(Debug)]
pub struct ResultCollector<T> {
    slots: Vec<Option<T>>,
    filled: usize,
}

impl<T> ResultCollector<T> {
    /// Pre-size one empty slot per input element
    pub fn new(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Self { slots, filled: 0 }
    }

    /// Store `value` at `index`.
    ///
    /// Each index is written at most once; a second write or an out-of-range
    /// index is rejected and returns `false`.
    pub fn write(&mut self, index: usize, value: T) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(value);
                self.filled += 1;
                true
            }
            _ => {
                debug_assert!(false, "slot {} written twice or out of range", index);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots written so far
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Values in input order.
    ///
    /// Fails with [`FanoutError::IncompleteResults`] if any slot is still
    /// empty; never returns a partial sequence.
    pub fn drain(self) -> Result<Vec<T>, FanoutError> {
        if !self.is_complete() {
            return Err(FanoutError::IncompleteResults {
                missing: self.slots.len() - self.filled,
                expected: self.slots.len(),
            });
        }
        Ok(self.slots.into_iter().flatten().collect())
    }
}
