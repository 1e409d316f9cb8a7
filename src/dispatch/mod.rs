//! Task Dispatch
//!
//! This module moves tasks from connection handlers to workers and results
//! back again.
//!
//! ## Architecture
//!
//! ```text
//!  ConnectionHandler ──submit(task)──┐
//!  ConnectionHandler ──submit(task)──┤
//!                                    ▼
//!                    ┌──────────────────────────────┐
//!                    │ TaskQueue (FIFO)             │
//!                    │ [task+reply][task+reply] ... │
//!                    └──────────────┬───────────────┘
//!                                   │ pop(timeout)
//!                  ┌────────────────┼────────────────┐
//!                  ▼                ▼                ▼
//!             ┌─────────┐      ┌─────────┐      ┌─────────┐
//!             │Worker 1 │      │Worker 2 │      │Worker N │
//!             └────┬────┘      └────┬────┘      └────┬────┘
//!                  │ reply.send(result)  (one oneshot per task)
//!                  ▼
//!            waiting ConnectionHandler
//! ```
//!
//! ## Guarantees
//!
//! - Each task is popped by at most one worker.
//! - Each response channel receives at most one result.
//! - A result can only reach the handler that created its channel.
//!
//! ## Modules
//!
//! - `queue`: The shared FIFO and its entries
//! - `worker`: The consume-execute-reply loop
//! - `pool`: Startup and ordered shutdown of the workers

pub mod pool;
pub mod queue;
pub mod worker;

// Re-export commonly used types
pub use pool::{PoolConfig, ShutdownReport, WorkerPool};
pub use queue::{QueueEntry, TaskQueue};
pub use worker::{PoolStats, Worker, WorkerHandle};
