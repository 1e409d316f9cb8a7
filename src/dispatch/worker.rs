//! Worker
//!
//! A worker is a long-lived tokio task that pulls one entry at a time from the
//! shared [`TaskQueue`], runs it, and sends exactly one [`TaskResult`] back on
//! the entry's private channel.
//!
//! ## State Machine
//!
//! ```text
//!   RUNNING ──(stop flag seen after a pop timeout)──> STOPPED
//!      │                                                 ▲
//!      └────────────────(poison entry popped)────────────┘
//! ```
//!
//! Handler failures are turned into error results; they never end the loop.

use crate::dispatch::queue::{QueueEntry, TaskQueue};
use crate::protocol::{Task, TaskResult};
use crate::tasks;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Counters shared by every worker in a pool.
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Tasks that finished, successfully or not
    pub tasks_processed: AtomicU64,
    /// Tasks whose handler returned an error
    pub tasks_failed: AtomicU64,
    /// Results nobody was waiting for anymore
    pub results_discarded: AtomicU64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_processed(&self, failed: bool) {
        self.tasks_processed.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn result_discarded(&self) {
        self.results_discarded.fetch_add(1, Ordering::Relaxed);
    }
}

/// A single queue consumer.
pub struct Worker {
    /// 1-based id, reported to clients in the `worker` field
    id: usize,

    /// The queue shared with every other worker and connection
    queue: Arc<TaskQueue>,

    /// Set by the pool when it wants this worker to exit
    stop: Arc<AtomicBool>,

    /// How long a pop may wait before the stop flag is re-checked
    poll_interval: Duration,

    stats: Arc<PoolStats>,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: Arc<TaskQueue>,
        poll_interval: Duration,
        stats: Arc<PoolStats>,
    ) -> Self {
        Self {
            id,
            queue,
            stop: Arc::new(AtomicBool::new(false)),
            poll_interval,
            stats,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Starts the worker loop on the runtime and returns its handle.
    pub fn spawn(self) -> WorkerHandle {
        let id = self.id;
        let stop = Arc::clone(&self.stop);
        let join = tokio::spawn(self.run());

        WorkerHandle { id, stop, join }
    }

    /// The main pop-execute-reply loop.
    async fn run(self) {
        info!(worker = self.id, "Worker started");

        while !self.stop.load(Ordering::Acquire) {
            match self.queue.pop(self.poll_interval).await {
                None => continue,
                Some(QueueEntry::Poison) => {
                    debug!(worker = self.id, "Worker received poison entry");
                    break;
                }
                Some(QueueEntry::Task { task, reply }) => self.process(task, reply).await,
            }
        }

        info!(worker = self.id, "Worker stopped");
    }

    /// Runs one task and publishes its result.
    async fn process(&self, task: Task, reply: oneshot::Sender<TaskResult>) {
        debug!(worker = self.id, task_id = %task.id, kind = %task.kind, "Processing task");

        let result = match tasks::execute(&task).await {
            Ok(value) => {
                self.stats.task_processed(false);
                TaskResult::ok(value)
            }
            Err(e) => {
                warn!(worker = self.id, task_id = %task.id, error = %e, "Task failed");
                self.stats.task_processed(true);
                TaskResult::error(e.to_string())
            }
        };

        let result = result.with_task_id(task.id).with_worker(self.id);

        if let Err(result) = reply.send(result) {
            // The connection gave up waiting (timeout or disconnect).
            debug!(
                worker = self.id,
                task_id = result.task_id.as_deref().unwrap_or_default(),
                "Result discarded, no one is waiting"
            );
            self.stats.result_discarded();
        }
    }
}

/// The pool's handle on a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    id: usize,
    stop: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Asks the worker to exit after its current pop or task.
    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub(crate) fn join_mut(&mut self) -> &mut JoinHandle<()> {
        &mut self.join
    }

    /// Cancels the worker at its next suspension point.
    pub fn abort(&self) {
        self.join.abort();
    }
}
