//! Engine module - bounded parallel traversal
//!
//! - `bound`: Bound (unbounded or N slots)
//! - `limiter`: Limiter, Permit (FIFO slot pool)
//! - `token`: TripToken (run-wide cancellation + first-failure slot)
//! - `collector`: ResultCollector (ordered slots)
//! - `task`: task wrapper and TaskState
//! - `traversal`: Traversal engine and the traverse/sequence entry points

pub mod bound;
pub mod collector;
pub mod limiter;
pub mod task;
pub mod token;
pub mod traversal;

pub use bound::Bound;
pub use collector::ResultCollector;
pub use limiter::{Limiter, Permit};
pub use task::TaskState;
pub use token::TripToken;
pub use traversal::{sequence, sequence_n, traverse, traverse_n, Traversal};
