//! Task wrapper
//!
//! Binds an input index to its operation and drives it through
//! `Pending → Running → {Succeeded | Failed}`, or to `Cancelled` from either
//! non-terminal state when the run token trips.
//!
//! Cancellation checkpoints:
//! - before waiting on the limiter
//! - while waiting on the limiter
//! - every time the operation yields (`select!` against the token)
//!
//! An operation that never yields cannot be preempted; it runs to completion
//! and its result is simply discarded if the run was tripped meanwhile.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::TraverseError;
use crate::event::{EventEmitter, EventKind};

use super::limiter::Limiter;
use super::token::TripToken;

/// Lifecycle state of one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// State shared by every task of one run; created once, never per task
pub(crate) struct RunContext<E> {
    pub limiter: Limiter,
    pub token: TripToken<E>,
    pub emitter: Arc<dyn EventEmitter>,
}

/// Terminal result of one task
pub(crate) struct TaskOutcome<T> {
    pub index: usize,
    pub settled: Settled<T>,
}

pub(crate) enum Settled<T> {
    Succeeded(T),
    /// The failure itself lives in the run token (or was discarded)
    Failed,
    Cancelled,
}

impl<T> Settled<T> {
    pub fn state(&self) -> TaskState {
        match self {
            Self::Succeeded(_) => TaskState::Succeeded,
            Self::Failed => TaskState::Failed,
            Self::Cancelled => TaskState::Cancelled,
        }
    }
}

/// One input element's unit of work
pub(crate) struct Task<G> {
    index: usize,
    operation: G,
}

impl<G> Task<G> {
    pub fn new(index: usize, operation: G) -> Self {
        Self { index, operation }
    }

    /// Run the operation once under a limiter slot.
    ///
    /// The slot is held until the outcome (including a trip) is recorded.
    pub async fn run<Fut, T, E>(self, ctx: Arc<RunContext<E>>) -> TaskOutcome<T>
    where
        G: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let Task { index, operation } = self;
        let cancellation = ctx.token.cancellation();

        let Some(_permit) = ctx.limiter.acquire(cancellation).await else {
            return cancelled(&ctx, index, TaskState::Pending);
        };

        trace!(index, "task running");
        ctx.emitter.emit(EventKind::TaskStarted { index });
        let started = Instant::now();

        // Calling the operation inside the guarded future also catches panics
        // raised before its first await
        let guarded = AssertUnwindSafe(async move { operation().await }).catch_unwind();

        let finished = tokio::select! {
            biased;
            _ = cancellation.cancelled() => None,
            result = guarded => Some(result),
        };

        let duration_ms = started.elapsed().as_millis() as u64;

        match finished {
            None => cancelled(&ctx, index, TaskState::Running),
            Some(Ok(Ok(value))) => {
                trace!(index, duration_ms, "task succeeded");
                ctx.emitter
                    .emit(EventKind::TaskCompleted { index, duration_ms });
                TaskOutcome {
                    index,
                    settled: Settled::Succeeded(value),
                }
            }
            Some(Ok(Err(error))) => {
                let message = error.to_string();
                failed(
                    &ctx,
                    TraverseError::Operation { index, error },
                    index,
                    message,
                    duration_ms,
                )
            }
            Some(Err(payload)) => {
                let message = panic_message(payload.as_ref());
                failed(
                    &ctx,
                    TraverseError::Panicked {
                        index,
                        message: message.clone(),
                    },
                    index,
                    message,
                    duration_ms,
                )
            }
        }
    }
}

fn cancelled<T, E>(ctx: &RunContext<E>, index: usize, from: TaskState) -> TaskOutcome<T> {
    trace!(index, ?from, "task cancelled");
    ctx.emitter.emit(EventKind::TaskCancelled {
        index,
        was_running: from == TaskState::Running,
    });
    TaskOutcome {
        index,
        settled: Settled::Cancelled,
    }
}

/// Offer the failure to the token; only the winner is recorded and reported.
fn failed<T, E>(
    ctx: &RunContext<E>,
    cause: TraverseError<E>,
    index: usize,
    message: String,
    duration_ms: u64,
) -> TaskOutcome<T> {
    if ctx.token.trip(cause) {
        trace!(index, duration_ms, "task failed first, run tripped");
        ctx.emitter.emit(EventKind::TaskFailed {
            index,
            error: message,
            duration_ms,
        });
    }
    TaskOutcome {
        index,
        settled: Settled::Failed,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
