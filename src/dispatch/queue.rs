//! Shared Task Queue
//!
//! An unbounded FIFO of [`QueueEntry`] values shared by every connection
//! handler (producers) and every worker (consumers).
//!
//! ## Wakeups
//!
//! Entries live in a `VecDeque` behind a short-lived mutex; the lock is never
//! held across an `.await`. Consumers that find the queue empty park on a
//! [`Notify`], and every push wakes at most one of them. `pop` takes a
//! timeout so that a worker regains control periodically and can notice that
//! it has been asked to stop.

use crate::protocol::{Task, TaskResult};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;

/// One slot in the queue.
#[derive(Debug)]
pub enum QueueEntry {
    /// A task paired with the private channel its result must be sent on.
    Task {
        task: Task,
        reply: oneshot::Sender<TaskResult>,
    },

    /// Tells the worker that pops it to exit.
    Poison,
}

impl QueueEntry {
    /// Pairs a task with a fresh response channel.
    ///
    /// Returns the entry and the receiving half of its channel.
    pub fn task(task: Task) -> (Self, oneshot::Receiver<TaskResult>) {
        let (reply, receiver) = oneshot::channel();
        (QueueEntry::Task { task, reply }, receiver)
    }
}

/// Thread-safe unbounded FIFO of queue entries.
#[derive(Debug, Default)]
pub struct TaskQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
    available: Notify,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<QueueEntry>> {
        // No code path panics while holding the lock, so a poisoned queue
        // still holds consistent data.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an entry at the tail. Never blocks.
    pub fn push(&self, entry: QueueEntry) {
        self.entries().push_back(entry);
        self.available.notify_one();
    }

    /// Enqueues a task with its own response channel and returns the receiver.
    ///
    /// # Example
    ///
    /// ```
    /// use taskpool::dispatch::{QueueEntry, TaskQueue};
    /// use taskpool::protocol::{Task, TaskKind, TaskResult};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let queue = TaskQueue::new();
    /// let receiver = queue.submit(Task::new("t1", TaskKind::Reverse, "abc"));
    ///
    /// if let Some(QueueEntry::Task { task, reply }) = queue.pop(Duration::from_millis(10)).await {
    ///     let _ = reply.send(TaskResult::ok("cba").with_task_id(task.id));
    /// }
    /// assert!(receiver.await.unwrap().is_ok());
    /// # });
    /// ```
    pub fn submit(&self, task: Task) -> oneshot::Receiver<TaskResult> {
        let (entry, receiver) = QueueEntry::task(task);
        self.push(entry);
        receiver
    }

    /// Removes the head entry without waiting.
    pub fn try_pop(&self) -> Option<QueueEntry> {
        self.entries().pop_front()
    }

    /// Removes the head entry, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` if the timeout elapses with the queue still empty.
    pub async fn pop(&self, timeout: Duration) -> Option<QueueEntry> {
        let deadline = Instant::now() + timeout;

        loop {
            // Register interest before checking, so a push that lands between
            // the check and the wait is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(entry) = self.try_pop() {
                return Some(entry);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_pop();
            }
        }
    }

    /// Drops every queued entry and returns how many there were.
    ///
    /// Waiters on dropped tasks observe a closed channel.
    pub fn clear(&self) -> usize {
        let drained: Vec<QueueEntry> = self.entries().drain(..).collect();
        drained
            .iter()
            .filter(|entry| matches!(entry, QueueEntry::Task { .. }))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TaskKind;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready};

    fn task(id: &str) -> Task {
        Task::new(id, TaskKind::Uppercase, "x")
    }

    fn task_id(entry: Option<QueueEntry>) -> String {
        match entry {
            Some(QueueEntry::Task { task, .. }) => task.id,
            other => panic!("expected a task entry, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = TaskQueue::new();
        let _r1 = queue.submit(task("a"));
        let _r2 = queue.submit(task("b"));
        queue.push(QueueEntry::Poison);
        let _r3 = queue.submit(task("c"));

        assert_eq!(queue.len(), 4);
        assert_eq!(task_id(queue.pop(Duration::ZERO).await), "a");
        assert_eq!(task_id(queue.pop(Duration::ZERO).await), "b");
        assert!(matches!(
            queue.pop(Duration::ZERO).await,
            Some(QueueEntry::Poison)
        ));
        assert_eq!(task_id(queue.pop(Duration::ZERO).await), "c");
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_times_out_when_empty() {
        let queue = TaskQueue::new();
        let start = Instant::now();

        assert!(queue.pop(Duration::from_millis(500)).await.is_none());
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let queue = TaskQueue::new();
        let mut pop = tokio_test::task::spawn(queue.pop(Duration::from_secs(60)));

        assert_pending!(pop.poll());
        let _receiver = queue.submit(task("late"));
        assert!(pop.is_woken());

        let entry = assert_ready!(pop.poll());
        assert_eq!(task_id(entry), "late");
    }

    #[tokio::test]
    async fn test_reply_reaches_only_its_own_receiver() {
        let queue = TaskQueue::new();
        let first = queue.submit(task("first"));
        let second = queue.submit(task("second"));

        for _ in 0..2 {
            if let Some(QueueEntry::Task { task, reply }) = queue.try_pop() {
                let id = task.id.clone();
                reply.send(TaskResult::ok(id.clone()).with_task_id(id)).unwrap();
            }
        }

        assert_eq!(first.await.unwrap().task_id.as_deref(), Some("first"));
        assert_eq!(second.await.unwrap().task_id.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_clear_closes_pending_channels() {
        let queue = TaskQueue::new();
        let receiver = queue.submit(task("abandoned"));
        queue.push(QueueEntry::Poison);

        assert_eq!(queue.clear(), 1);
        assert!(queue.is_empty());
        assert!(receiver.await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_and_consumers() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 250;

        let queue = Arc::new(TaskQueue::new());

        let mut consumers = Vec::new();
        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            consumers.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                loop {
                    match queue.pop(Duration::from_millis(50)).await {
                        Some(QueueEntry::Task { task, .. }) => seen.push(task.id),
                        Some(QueueEntry::Poison) => break,
                        None => continue,
                    }
                }
                seen
            }));
        }

        let mut producers = Vec::new();
        for p in 0..PRODUCERS {
            let queue = Arc::clone(&queue);
            producers.push(tokio::spawn(async move {
                for i in 0..PER_PRODUCER {
                    let (entry, _receiver) = QueueEntry::task(task(&format!("{}-{}", p, i)));
                    queue.push(entry);
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }
        for _ in 0..4 {
            queue.push(QueueEntry::Poison);
        }

        let mut all = HashSet::new();
        let mut total = 0;
        for consumer in consumers {
            let seen = consumer.await.unwrap();
            total += seen.len();
            all.extend(seen);
        }

        // Every task popped exactly once
        assert_eq!(total, PRODUCERS * PER_PRODUCER);
        assert_eq!(all.len(), PRODUCERS * PER_PRODUCER);
    }
}
