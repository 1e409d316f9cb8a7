//! Worker Pool
//!
//! Owns a fixed set of [`Worker`]s bound to one shared [`TaskQueue`]. The
//! number of workers is chosen at startup and never changes.
//!
//! ## Shutdown
//!
//! `stop()` runs in this order:
//! 1. Push one poison entry per worker.
//! 2. Set every worker's stop flag.
//! 3. Join the workers, all sharing one deadline of `shutdown_grace`.
//! 4. Abort any worker still running at the deadline and report it as abandoned.
//! 5. Drop whatever is still queued. Waiting connections see a closed
//!    channel instead of waiting out their full timeout.
//!
//! Tasks queued behind the poison entries are not drained; they are abandoned.

use crate::dispatch::queue::{QueueEntry, TaskQueue};
use crate::dispatch::worker::{PoolStats, Worker, WorkerHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of workers (default: 4)
    pub workers: usize,

    /// Longest a worker waits on an empty queue before re-checking its stop
    /// flag (default: 500ms)
    pub poll_interval: Duration,

    /// How long `stop()` waits for workers to exit (default: 1s)
    pub shutdown_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval: Duration::from_millis(500),
            shutdown_grace: Duration::from_secs(1),
        }
    }
}

/// What happened to each worker during shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Workers that exited within the grace period
    pub stopped: Vec<usize>,
    /// Workers still running at the deadline, since aborted
    pub abandoned: Vec<usize>,
    /// Queued tasks dropped without being run
    pub tasks_dropped: usize,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.abandoned.is_empty()
    }
}

/// A fixed-size pool of workers.
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    workers: Vec<WorkerHandle>,
    stats: Arc<PoolStats>,
    config: PoolConfig,
}

impl WorkerPool {
    /// Spawns `config.workers` workers consuming from `queue`.
    ///
    /// # Example
    ///
    /// ```
    /// use taskpool::dispatch::{PoolConfig, TaskQueue, WorkerPool};
    /// use taskpool::protocol::{Task, TaskKind};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let queue = Arc::new(TaskQueue::new());
    /// let pool = WorkerPool::start(Arc::clone(&queue), PoolConfig::default());
    ///
    /// let result = queue.submit(Task::new("t1", TaskKind::WordCount, "a b c")).await.unwrap();
    /// assert_eq!(result.result, Some(serde_json::json!(3)));
    ///
    /// let report = pool.stop().await;
    /// assert!(report.is_clean());
    /// # });
    /// ```
    pub fn start(queue: Arc<TaskQueue>, config: PoolConfig) -> Self {
        let stats = Arc::new(PoolStats::new());

        let workers = (1..=config.workers)
            .map(|id| {
                Worker::new(
                    id,
                    Arc::clone(&queue),
                    config.poll_interval,
                    Arc::clone(&stats),
                )
                .spawn()
            })
            .collect();

        info!(workers = config.workers, "Worker pool started");

        Self {
            queue,
            workers,
            stats,
            config,
        }
    }

    /// Number of workers, fixed at startup.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.stats)
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Stops every worker and reports which ones exited in time.
    pub async fn stop(mut self) -> ShutdownReport {
        let mut workers = std::mem::take(&mut self.workers);
        info!(workers = workers.len(), "Stopping worker pool");

        for _ in &workers {
            self.queue.push(QueueEntry::Poison);
        }
        for worker in &workers {
            worker.signal_stop();
        }

        let deadline = Instant::now() + self.config.shutdown_grace;
        let mut report = ShutdownReport::default();

        for worker in &mut workers {
            match tokio::time::timeout_at(deadline, worker.join_mut()).await {
                Ok(Ok(())) => {
                    info!(worker = worker.id(), "Worker stopped cleanly");
                    report.stopped.push(worker.id());
                }
                Ok(Err(e)) => {
                    error!(worker = worker.id(), error = %e, "Worker terminated abnormally");
                    report.stopped.push(worker.id());
                }
                Err(_) => {
                    warn!(
                        worker = worker.id(),
                        grace_ms = self.config.shutdown_grace.as_millis(),
                        "Worker did not stop within the grace period, abandoning it"
                    );
                    worker.abort();
                    report.abandoned.push(worker.id());
                }
            }
        }

        report.tasks_dropped = self.queue.clear();
        if report.tasks_dropped > 0 {
            warn!(
                tasks = report.tasks_dropped,
                "Queued tasks abandoned at shutdown"
            );
        }

        info!(
            stopped = report.stopped.len(),
            abandoned = report.abandoned.len(),
            "Worker pool stopped"
        );
        report
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Without an explicit stop(), let the workers wind down on their own.
        for worker in &self.workers {
            worker.signal_stop();
        }
    }
}
