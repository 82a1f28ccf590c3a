//! EventLog - in-memory trace of a traversal
//!
//! - Event: one record (sequence id, offset from log creation, kind)
//! - EventKind: run-level and task-level transitions
//! - EventLog: shared append-only trace of one or more runs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in the traversal log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Position in the log, starting at 0
    pub id: u64,
    /// Time since log creation (ms)
    pub timestamp_ms: u64,
    /// What happened
    pub kind: EventKind,
}

/// All possible event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // TRAVERSAL LEVEL
    // ═══════════════════════════════════════════
    TraversalStarted {
        task_count: usize,
        /// `None` when unbounded
        bound: Option<usize>,
    },
    TraversalCompleted {
        task_count: usize,
        duration_ms: u64,
    },
    /// Terminal event when an operation failed; carries the winning failure only
    TraversalFailed {
        failed_index: Option<usize>,
        error: String,
        succeeded: usize,
        cancelled: usize,
        duration_ms: u64,
    },
    /// Terminal event when the parent token cancelled the run
    TraversalCancelled {
        succeeded: usize,
        cancelled: usize,
        duration_ms: u64,
    },

    // ═══════════════════════════════════════════
    // TASK LEVEL
    // ═══════════════════════════════════════════
    /// Task acquired a limiter slot and its operation began
    TaskStarted { index: usize },
    TaskCompleted { index: usize, duration_ms: u64 },
    TaskFailed {
        index: usize,
        error: String,
        duration_ms: u64,
    },
    TaskCancelled {
        index: usize,
        /// False if the task never left Pending
        was_running: bool,
    },
}

impl EventKind {
    /// Extract the task index if event is task-related
    pub fn task_index(&self) -> Option<usize> {
        match self {
            Self::TaskStarted { index }
            | Self::TaskCompleted { index, .. }
            | Self::TaskFailed { index, .. }
            | Self::TaskCancelled { index, .. } => Some(*index),
            Self::TraversalStarted { .. }
            | Self::TraversalCompleted { .. }
            | Self::TraversalFailed { .. }
            | Self::TraversalCancelled { .. } => None,
        }
    }

    /// Check if this is a traversal-level event
    pub fn is_traversal_event(&self) -> bool {
        self.task_index().is_none()
    }
}

/// Append-only trace shared between the engine and the caller
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append `kind` and return its sequence id
    pub fn emit(&self, kind: EventKind) -> u64 {
        let mut events = self.events.write();
        // Assign the id under the lock so ids follow push order
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        events.push(Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        });
        id
    }

    /// Snapshot of every recorded event
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Borrow the recorded events without cloning them.
    ///
    /// The read lock is held while `f` runs, so emitters block until it returns.
    pub fn with_events<T>(&self, f: impl FnOnce(&[Event]) -> T) -> T {
        f(&self.events.read())
    }

    /// Events for one task index
    pub fn filter_task(&self, index: usize) -> Vec<Event> {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.task_index() == Some(index))
                .cloned()
                .collect()
        })
    }

    pub fn traversal_events(&self) -> Vec<Event> {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.is_traversal_event())
                .cloned()
                .collect()
        })
    }

    /// Count events matching a predicate (no allocation)
    pub fn count(&self, predicate: impl Fn(&EventKind) -> bool) -> usize {
        self.with_events(|events| events.iter().filter(|e| predicate(&e.kind)).count())
    }

    /// Serialize to JSON for debugging
    pub fn to_json(&self) -> Value {
        self.with_events(|events| serde_json::to_value(events).unwrap_or(Value::Null))
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .finish()
    }
}
