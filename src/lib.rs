//! Fanout - bounded parallel traverse/sequence for tokio
//!
//! Runs a sequence of independent operations concurrently, at most N at a
//! time, returns their values in input order, and cancels everything else as
//! soon as one operation fails.
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         ENGINE                               │
//! │  engine/    Traversal, traverse/sequence entry points        │
//! │             Limiter → Task → ResultCollector, TripToken      │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE                            │
//! │  event/     Traversal trace (EventLog, EventEmitter)         │
//! │  config/    TOML + env defaults (FanoutConfig)               │
//! │  error/     Coded errors (FanoutError, TraverseError)        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use fanout::{traverse, Bound};
//!
//! let lengths = traverse(urls, Bound::limited(8)?, |url| async move {
//!     let body = fetch(&url).await?;
//!     Ok::<_, FetchError>(body.len())
//! })
//! .await?;
//! ```
//!
//! ## Cancellation
//!
//! Operations are cancelled cooperatively: a running operation is abandoned
//! the next time it yields after the run trips. Operations that block without
//! yielding cannot be stopped and delay the result until they return.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;

// Error types
pub use error::{FanoutError, FixSuggestion, TraverseError};

// Config types
pub use config::FanoutConfig;

// Engine types
pub use engine::{
    sequence, sequence_n, traverse, traverse_n, Bound, Limiter, Permit, ResultCollector,
    TaskState, Traversal, TripToken,
};

// Event types
pub use event::{Event, EventEmitter, EventKind, EventLog, NoopEmitter};

// Cancellation handle accepted by `Traversal::with_cancellation`
pub use tokio_util::sync::CancellationToken;
