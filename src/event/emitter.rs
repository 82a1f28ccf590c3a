//! EventEmitter Trait - abstraction for event emission
//!
//! The engine emits through `Arc<dyn EventEmitter>`: `NoopEmitter` by default,
//! `EventLog` when a caller wants the trace.

use super::log::{EventKind, EventLog};

/// Trait for emitting events during a traversal
pub trait EventEmitter: Send + Sync {
    /// Record `kind`; the returned id is meaningful only for logging emitters
    fn emit(&self, kind: EventKind) -> u64;
}

impl EventEmitter for EventLog {
    fn emit(&self, kind: EventKind) -> u64 {
        EventLog::emit(self, kind)
    }
}

/// No-op emitter (zero allocation, always returns 0)
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl EventEmitter for NoopEmitter {
    fn emit(&self, _kind: EventKind) -> u64 {
        0
    }
}
