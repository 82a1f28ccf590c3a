//! Event module - traversal trace
//!
//! - `log`: EventLog, Event, EventKind
//! - `emitter`: EventEmitter trait, NoopEmitter

pub mod emitter;
pub mod log;

pub use emitter::{EventEmitter, NoopEmitter};
pub use log::{Event, EventKind, EventLog};
