//! Traversal engine
//!
//! Spawns one task per input element into a `JoinSet`, lets the limiter
//! decide how many run at once, and waits on the join set as a counting
//! barrier until every task has settled. Scheduling and waiting are flat
//! loops over a pre-sized collection, so stack depth does not grow with the
//! input length.
//!
//! Outcome:
//! - a failure claimed the run token → that failure, no partial results
//! - otherwise a task was cancelled (parent token) → `TraverseError::Cancelled`
//! - otherwise → the collector's values in input order
//!
//! Dropping the traversal future (e.g. under `tokio::time::timeout`) trips the
//! run token and drops the join set, which aborts every task still queued or
//! running.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::FanoutConfig;
use crate::error::{FanoutError, TraverseError};
use crate::event::{EventEmitter, EventKind, NoopEmitter};

use super::bound::Bound;
use super::collector::ResultCollector;
use super::task::{RunContext, Settled, Task, TaskOutcome};
use super::token::TripToken;

/// Configured traversal engine.
///
/// Cheap to clone; each `traverse`/`sequence` call is an independent run
/// with its own limiter, token and collector.
#[derive(Clone)]
pub struct Traversal {
    bound: Bound,
    parent: Option<CancellationToken>,
    handle: Option<Handle>,
    emitter: Arc<dyn EventEmitter>,
}

/// Per-state counts for one run
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    succeeded: usize,
    failed: usize,
    cancelled: usize,
}

impl Traversal {
    /// Unbounded engine on the current runtime
    pub fn new() -> Self {
        Self {
            bound: Bound::Unbounded,
            parent: None,
            handle: None,
            emitter: Arc::new(NoopEmitter::new()),
        }
    }

    /// Engine using the bound from `config`
    pub fn from_config(config: &FanoutConfig) -> Result<Self, FanoutError> {
        Ok(Self::new().with_bound(config.bound()?))
    }

    pub fn with_bound(mut self, bound: Bound) -> Self {
        self.bound = bound;
        self
    }

    /// Trip every run when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.parent = Some(token);
        self
    }

    /// Run operations on `handle` instead of the caller's runtime
    pub fn on(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn bound(&self) -> Bound {
        self.bound
    }

    /// Apply `op` to every item concurrently, keeping input order.
    ///
    /// `op` is only invoked once its task holds a limiter slot; an empty
    /// input returns immediately without invoking it.
    pub async fn traverse<I, F, Fut, T, E>(
        &self,
        items: I,
        op: F,
    ) -> Result<Vec<T>, TraverseError<E>>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let op = Arc::new(op);
        let operations: Vec<_> = items
            .into_iter()
            .map(|item| {
                let op = Arc::clone(&op);
                move || op(item)
            })
            .collect();

        self.run(operations).await
    }

    /// Run pre-built operations concurrently, keeping input order.
    pub async fn sequence<I, Fut, T, E>(&self, operations: I) -> Result<Vec<T>, TraverseError<E>>
    where
        I: IntoIterator<Item = Fut>,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let operations: Vec<_> = operations.into_iter().map(|fut| move || fut).collect();
        self.run(operations).await
    }

    #[instrument(skip_all, fields(tasks = operations.len(), bound = %self.bound))]
    async fn run<G, Fut, T, E>(&self, operations: Vec<G>) -> Result<Vec<T>, TraverseError<E>>
    where
        G: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let task_count = operations.len();
        if task_count == 0 {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let token = match &self.parent {
            Some(parent) => TripToken::child_of(parent),
            None => TripToken::new(),
        };
        let ctx = Arc::new(RunContext {
            limiter: self.bound.limiter(),
            token,
            emitter: Arc::clone(&self.emitter),
        });

        debug!("starting traversal");
        self.emitter.emit(EventKind::TraversalStarted {
            task_count,
            bound: self.bound.capacity(),
        });

        let mut join_set = JoinSet::new();
        for (index, operation) in operations.into_iter().enumerate() {
            let task = Task::new(index, operation).run(Arc::clone(&ctx));
            match &self.handle {
                Some(handle) => join_set.spawn_on(task, handle),
                None => join_set.spawn(task),
            };
        }

        // Declared after the join set so it drops first: if this future is
        // dropped mid-run, queued tasks see the trip before the aborts land
        let _trip_on_drop = ctx.token.cancellation().clone().drop_guard();

        // Completion barrier: drain the join set until every task settled
        let mut collector = ResultCollector::new(task_count);
        let mut tally = Tally::default();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(TaskOutcome { index, settled }) => match settled {
                    Settled::Succeeded(value) => {
                        tally.succeeded += 1;
                        collector.write(index, value);
                    }
                    Settled::Failed => tally.failed += 1,
                    Settled::Cancelled => tally.cancelled += 1,
                },
                // Operation panics are caught inside the task; a panic here
                // is an engine bug and keeps unwinding.
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                // Aborted from outside, e.g. the target runtime shut down
                Err(_) => tally.cancelled += 1,
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;

        if let Some(cause) = ctx.token.take_cause() {
            debug!(
                failed_index = ?cause.index(),
                succeeded = tally.succeeded,
                failed = tally.failed,
                cancelled = tally.cancelled,
                duration_ms,
                "traversal failed"
            );
            self.emitter.emit(EventKind::TraversalFailed {
                failed_index: cause.index(),
                error: cause.to_string(),
                succeeded: tally.succeeded,
                cancelled: tally.cancelled,
                duration_ms,
            });
            return Err(cause);
        }

        if tally.cancelled > 0 {
            debug!(
                succeeded = tally.succeeded,
                cancelled = tally.cancelled,
                duration_ms,
                "traversal cancelled"
            );
            self.emitter.emit(EventKind::TraversalCancelled {
                succeeded: tally.succeeded,
                cancelled: tally.cancelled,
                duration_ms,
            });
            return Err(TraverseError::Cancelled);
        }

        let values = collector.drain()?;
        debug!(duration_ms, "traversal completed");
        self.emitter.emit(EventKind::TraversalCompleted {
            task_count,
            duration_ms,
        });
        Ok(values)
    }
}

impl Default for Traversal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traversal")
            .field("bound", &self.bound)
            .field("cancellable", &self.parent.is_some())
            .field("handle", &self.handle.is_some())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════
// FREE FUNCTIONS
// ═══════════════════════════════════════════════════════════════

/// Apply `op` to every item with at most `bound` in flight.
///
/// ```rust,ignore
/// let sizes = fanout::traverse(urls, Bound::limited(8)?, |url| fetch_len(url)).await?;
/// ```
pub async fn traverse<I, F, Fut, T, E>(
    items: I,
    bound: Bound,
    op: F,
) -> Result<Vec<T>, TraverseError<E>>
where
    I: IntoIterator,
    I::Item: Send + 'static,
    F: Fn(I::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    Traversal::new().with_bound(bound).traverse(items, op).await
}

/// [`traverse`] with a raw count; zero fails before any task is scheduled.
pub async fn traverse_n<I, F, Fut, T, E>(
    items: I,
    n: usize,
    op: F,
) -> Result<Vec<T>, TraverseError<E>>
where
    I: IntoIterator,
    I::Item: Send + 'static,
    F: Fn(I::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let bound = Bound::limited(n)?;
    traverse(items, bound, op).await
}

/// Run pre-built operations with at most `bound` in flight.
pub async fn sequence<I, Fut, T, E>(operations: I, bound: Bound) -> Result<Vec<T>, TraverseError<E>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    Traversal::new().with_bound(bound).sequence(operations).await
}

/// [`sequence`] with a raw count; zero fails before any task is scheduled.
pub async fn sequence_n<I, Fut, T, E>(operations: I, n: usize) -> Result<Vec<T>, TraverseError<E>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let bound = Bound::limited(n)?;
    sequence(operations, bound).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLog;
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_input_never_invokes_op() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let out: Vec<u8> = traverse(Vec::<u8>::new(), Bound::limited(3).unwrap(), move |x| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, Infallible>(x) }
        })
        .await
        .unwrap();

        assert!(out.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_bound_fails_fast() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let err = traverse_n(0..10, 0, move |x| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, String>(x) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.code(), "FANOUT-001");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let err = sequence_n(vec![async { Ok::<_, String>(1) }], 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TraverseError::Engine(FanoutError::InvalidBound { bound: 0 })
        ));
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let out = traverse(0..10u64, Bound::Unbounded, |i| async move {
            // Later indices finish first
            tokio::time::sleep(Duration::from_millis(20 - 2 * i)).await;
            Ok::<_, Infallible>(i * i)
        })
        .await
        .unwrap();

        assert_eq!(out, (0..10u64).map(|i| i * i).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_sequence_runs_prebuilt_operations() {
        let ops = (0..5).map(|i| async move { Ok::<_, String>(format!("op-{}", i)) });
        let out = sequence(ops, Bound::limited(2).unwrap()).await.unwrap();
        assert_eq!(out, vec!["op-0", "op-1", "op-2", "op-3", "op-4"]);
    }

    #[tokio::test]
    async fn test_from_config_uses_bound() {
        let config = FanoutConfig {
            max_concurrency: Some(4),
        };
        let engine = Traversal::from_config(&config).unwrap();
        assert_eq!(engine.bound().capacity(), Some(4));

        let bad = FanoutConfig {
            max_concurrency: Some(0),
        };
        assert!(Traversal::from_config(&bad).is_err());
    }

    #[tokio::test]
    async fn test_event_log_records_run() {
        let log = EventLog::new();
        let engine = Traversal::new()
            .with_bound(Bound::limited(2).unwrap())
            .with_emitter(Arc::new(log.clone()));

        engine
            .traverse(0..3, |i| async move { Ok::<_, Infallible>(i) })
            .await
            .unwrap();

        let events = log.events();
        assert_eq!(
            events.first().map(|e| e.kind.clone()),
            Some(EventKind::TraversalStarted {
                task_count: 3,
                bound: Some(2)
            })
        );
        assert!(matches!(
            events.last().map(|e| &e.kind),
            Some(EventKind::TraversalCompleted { task_count: 3, .. })
        ));
        assert_eq!(
            log.count(|k| matches!(k, EventKind::TaskCompleted { .. })),
            3
        );
    }

    #[tokio::test]
    async fn test_failure_event_names_winner_only() {
        let log = EventLog::new();
        let engine = Traversal::new().with_emitter(Arc::new(log.clone()));

        let err = engine
            .traverse(0..4, |i| async move {
                if i == 2 {
                    Err(format!("bad {}", i))
                } else {
                    Ok(i)
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.index(), Some(2));
        assert_eq!(
            log.count(|k| matches!(k, EventKind::TaskFailed { .. })),
            1
        );
        assert!(matches!(
            log.events().last().map(|e| &e.kind),
            Some(EventKind::TraversalFailed {
                failed_index: Some(2),
                ..
            })
        ));
    }

    #[test]
    fn test_debug_hides_internals() {
        let engine = Traversal::new().with_bound(Bound::limited(7).unwrap());
        let debug = format!("{:?}", engine);
        assert!(debug.contains("Limited(7)"));
        assert!(debug.contains("cancellable: false"));
    }
}
