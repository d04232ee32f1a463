//! Query admission and batching for querygate.
//!
//! Callers submit queries one at a time; the batcher decides between
//! immediate pass-through and queued execution, accumulates a short window
//! of queued requests, groups them by normalized shape, and dispatches each
//! group against the executor.
//!
//! # Architecture
//!
//! ```text
//! submit(request)
//!        │
//!        ▼
//! ┌──────────────┐  bypass (DDL / session / oversized / disabled)
//! │ Bypass rules │ ────────────────────────────────▶ executor
//! └──────┬───────┘
//!        │ queue
//!        ▼
//! ┌──────────────┐  batch_window timer, or max_batch_size reached
//! │ PendingBatch │ ────────────────────────────────┐
//! └──────────────┘                                 ▼
//!                                        ┌──────────────────┐
//!                                        │     Dispatch     │ one in flight
//!                                        │  group by shape  │
//!                                        │  run each group  │
//!                                        └──────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - A queued request waits at most `batch_window` before dispatch.
//! - At most one dispatch cycle is in flight at any instant, so batches
//!   reach the executor in FIFO order.
//! - Every request is settled exactly once: with its executor outcome, a
//!   batch-level failure, or `ConnectorDestroyed` on shutdown.
//! - Bypassed requests have no ordering relationship to in-flight batches.

mod bypass;
mod config;
mod metrics;
mod shape;

pub use bypass::BypassReason;
pub use config::BatcherConfig;
pub use metrics::{BatcherMetrics, BatcherStats};
pub use shape::shape_key;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::QueryError;
use crate::executor::{QueryExecutor, QueryRequest, QueryValue};

/// A queued request paired with its completion handle.
struct QueuedQuery {
    request: QueryRequest,
    reply: oneshot::Sender<Result<QueryValue, QueryError>>,
}

/// Mutable batcher state. Guarded by one mutex that is never held across an
/// await, which keeps the original's cooperative sequencing: accumulation
/// and dispatch bookkeeping never interleave mid-step.
struct BatcherState {
    queue: Vec<QueuedQuery>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the pending timer is superseded (re-arm, drain,
    /// shutdown); a woken timer task that observes a stale epoch no-ops.
    timer_epoch: u64,
    executing: bool,
    enabled: bool,
    destroyed: bool,
}

struct Shared {
    executor: Arc<dyn QueryExecutor>,
    config: BatcherConfig,
    metrics: BatcherMetrics,
    state: Mutex<BatcherState>,
}

/// The batching scheduler. Cheap to clone; all clones share one queue.
#[derive(Clone)]
pub struct QueryBatcher {
    shared: Arc<Shared>,
}

impl QueryBatcher {
    /// Create a batcher in front of the given executor.
    ///
    /// Must be called inside a tokio runtime: the batch-window timer and
    /// dispatch cycles run as spawned tasks.
    pub fn new(executor: Arc<dyn QueryExecutor>, config: BatcherConfig) -> Self {
        let enabled = config.enabled;
        Self {
            shared: Arc::new(Shared {
                executor,
                config,
                metrics: BatcherMetrics::new(),
                state: Mutex::new(BatcherState {
                    queue: Vec::new(),
                    timer: None,
                    timer_epoch: 0,
                    executing: false,
                    enabled,
                    destroyed: false,
                }),
            }),
        }
    }

    /// Submit one query and wait for its outcome.
    ///
    /// Equivalent to executing directly against the executor; batching never
    /// changes the logical result of a query, only when it runs.
    pub async fn submit(&self, request: QueryRequest) -> Result<QueryValue, QueryError> {
        {
            let state = self.shared.state.lock().unwrap();
            if state.destroyed {
                return Err(QueryError::ConnectorDestroyed);
            }
        }
        self.shared.metrics.record_request();

        if let Some(reason) = self.bypass_reason(&request) {
            self.shared.metrics.record_bypass();
            debug!(reason = ?reason, "query bypassing batch queue");
            return self.shared.executor.execute(&request).await;
        }

        let (tx, rx) = oneshot::channel();
        let trigger = {
            let mut state = self.shared.state.lock().unwrap();
            if state.destroyed {
                return Err(QueryError::ConnectorDestroyed);
            }
            state.queue.push(QueuedQuery { request, reply: tx });
            if state.queue.len() >= self.shared.config.max_batch_size {
                Trigger::Dispatch
            } else if state.queue.len() == 1 {
                Trigger::ArmTimer
            } else {
                Trigger::None
            }
        };
        match trigger {
            Trigger::Dispatch => self.spawn_dispatch(),
            Trigger::ArmTimer => self.arm_timer(),
            Trigger::None => {}
        }

        match rx.await {
            Ok(outcome) => outcome,
            // The dispatch task died without settling this request. Coarse
            // failure mode: a batch-level fault invalidates the whole batch.
            Err(_) => Err(QueryError::BatchFailed(
                "batch dropped before completion".to_string(),
            )),
        }
    }

    /// Enable or disable batching. Disabling flushes the current queue to
    /// the executor immediately; nothing is discarded.
    pub fn set_enabled(&self, enabled: bool) {
        let flush = {
            let mut state = self.shared.state.lock().unwrap();
            state.enabled = enabled;
            !enabled && !state.queue.is_empty()
        };
        info!(enabled, "query batching toggled");
        if flush {
            self.spawn_dispatch();
        }
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> BatcherStats {
        let (depth, enabled) = {
            let state = self.shared.state.lock().unwrap();
            (state.queue.len(), state.enabled)
        };
        self.shared.metrics.snapshot(depth, enabled)
    }

    /// Cancel the pending timer and fail every queued request with
    /// [`QueryError::ConnectorDestroyed`]. Later submits fail the same way.
    /// Executor calls already dispatched are not interrupted.
    pub fn shutdown(&self) {
        let drained = {
            let mut state = self.shared.state.lock().unwrap();
            state.destroyed = true;
            state.timer_epoch += 1;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            std::mem::take(&mut state.queue)
        };
        let failed = drained.len();
        for queued in drained {
            let _ = queued.reply.send(Err(QueryError::ConnectorDestroyed));
        }
        info!(failed, "batcher shut down");
    }

    /// Ordered bypass evaluation; the disabled flag is rule one.
    fn bypass_reason(&self, request: &QueryRequest) -> Option<BypassReason> {
        {
            let state = self.shared.state.lock().unwrap();
            if !state.enabled {
                return Some(BypassReason::Disabled);
            }
        }
        bypass::bypass_reason(&request.sql, self.shared.config.max_sql_len)
    }

    /// Arm the batch-window timer. At most one timer is alive at a time.
    ///
    /// The lock is held across spawn-and-store so the timer task cannot
    /// observe the slot before its own handle is in it. On waking, the task
    /// checks its epoch and removes its own handle before dispatching: a
    /// timer superseded while sleeping (re-armed, drained, or shut down)
    /// no-ops, and the drain step's abort only ever targets tasks that are
    /// still sleeping, never one that is about to dispatch.
    fn arm_timer(&self) {
        let batcher = self.clone();
        let window = self.shared.config.batch_window;
        let mut state = self.shared.state.lock().unwrap();
        state.timer_epoch += 1;
        let epoch = state.timer_epoch;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            {
                let mut state = batcher.shared.state.lock().unwrap();
                if state.timer_epoch != epoch {
                    return;
                }
                state.timer.take();
            }
            batcher.dispatch().await;
        });
        if let Some(old) = state.timer.replace(handle) {
            old.abort();
        }
    }

    fn spawn_dispatch(&self) {
        let batcher = self.clone();
        tokio::spawn(async move {
            batcher.dispatch().await;
        });
    }

    /// Run one dispatch cycle.
    ///
    /// The `executing` flag defers a dispatch triggered while another is in
    /// flight; leftovers are picked up when the in-flight cycle finishes.
    /// The queue is drained atomically, so requests arriving during dispatch
    /// accumulate in a fresh queue with their own timer.
    async fn dispatch(&self) {
        let drained = {
            let mut state = self.shared.state.lock().unwrap();
            if state.executing || state.queue.is_empty() {
                return;
            }
            state.executing = true;
            state.timer_epoch += 1;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            std::mem::take(&mut state.queue)
        };

        let batch_size = drained.len();
        let started = Instant::now();
        debug!(batch_size, "dispatching batch");

        for group in group_by_shape(drained) {
            self.run_group(group).await;
        }

        self.shared
            .metrics
            .record_batch(batch_size, started.elapsed());

        let rearm = {
            let mut state = self.shared.state.lock().unwrap();
            state.executing = false;
            // A timer that fired into the reentrancy guard above has
            // already run to completion; its spent handle must not
            // suppress the re-arm or the deferred requests would strand.
            let timer_pending = state.timer.as_ref().map_or(false, |t| !t.is_finished());
            if state.destroyed || state.queue.is_empty() {
                Trigger::None
            } else if state.queue.len() >= self.shared.config.max_batch_size {
                Trigger::Dispatch
            } else if timer_pending {
                Trigger::None
            } else {
                Trigger::ArmTimer
            }
        };
        match rearm {
            Trigger::Dispatch => self.spawn_dispatch(),
            Trigger::ArmTimer => self.arm_timer(),
            Trigger::None => {}
        }
    }

    /// Execute one shape group. Singletons run directly; near-duplicate
    /// members run concurrently and settle independently, and the join waits
    /// for every member regardless of individual success or failure.
    async fn run_group(&self, group: Vec<QueuedQuery>) {
        if group.len() == 1 {
            for queued in group {
                let outcome = self.shared.executor.execute(&queued.request).await;
                let _ = queued.reply.send(outcome);
            }
            return;
        }

        let members = group.into_iter().map(|queued| {
            let executor = Arc::clone(&self.shared.executor);
            async move {
                let outcome = executor.execute(&queued.request).await;
                let _ = queued.reply.send(outcome);
            }
        });
        join_all(members).await;
    }
}

enum Trigger {
    Dispatch,
    ArmTimer,
    None,
}

/// Partition a drained batch into shape groups, preserving the arrival
/// order of each shape's first member.
fn group_by_shape(batch: Vec<QueuedQuery>) -> Vec<Vec<QueuedQuery>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<QueuedQuery>> = Vec::new();
    for queued in batch {
        let key = shape_key(queued.request.kind, &queued.request.sql);
        match index.get(&key) {
            Some(&i) => groups[i].push(queued),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![queued]);
            }
        }
    }
    groups
}
