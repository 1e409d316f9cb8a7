//! # TaskPool - A Line-Delimited JSON Task Server
//!
//! TaskPool accepts tasks over TCP, one JSON object per line, hands them to a
//! fixed pool of workers through a shared queue, and writes each result back
//! on the connection that submitted it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                              TaskPool                                │
//! │                                                                      │
//! │  ┌─────────────┐    ┌─────────────┐  push   ┌──────────────────────┐ │
//! │  │ TCP Server  │───>│ Connection  │────────>│      TaskQueue       │ │
//! │  │ (Listener)  │    │  Handler    │         │  (task, reply) FIFO  │ │
//! │  └─────────────┘    └──────▲──────┘         └──────────┬───────────┘ │
//! │                            │                           │ pop         │
//! │                            │ oneshot reply             ▼             │
//! │                            │              ┌────────────────────────┐ │
//! │                            └──────────────│  WorkerPool            │ │
//! │                                           │  ┌────────┐ ┌────────┐ │ │
//! │                                           │  │Worker 1│ │Worker N│ │ │
//! │                                           │  └────────┘ └────────┘ │ │
//! │                                           └────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use taskpool::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     let report = server.run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await;
//!     println!("stopped cleanly: {}", report.is_clean());
//!     Ok(())
//! }
//! ```
//!
//! ## Wire Protocol
//!
//! Request: `{"tarea_id": "...", "tipo": "reverse", "contenido": "abc"}`
//!
//! Response: `{"estado": "ok", "resultado": "cba", "tarea_id": "...", "worker": 2}`
//!
//! ## Module Overview
//!
//! - [`protocol`]: Request/response types and line framing
//! - [`tasks`]: The task handlers run by workers
//! - [`dispatch`]: Shared task queue, workers and the worker pool
//! - [`connection`]: Per-client connection handling
//! - [`server`]: Composition root tying the pieces together
//! - [`client`]: A small async client for the wire protocol
//! - [`config`]: Server configuration

pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod protocol;
pub mod server;
pub mod tasks;

// Re-export commonly used types for convenience
pub use client::{ClientError, TaskClient};
pub use config::{ConfigError, ServerConfig};
pub use connection::{handle_connection, ConnectionStats};
pub use dispatch::{PoolConfig, PoolStats, QueueEntry, ShutdownReport, TaskQueue, WorkerPool};
pub use protocol::{RequestError, Status, Task, TaskKind, TaskRequest, TaskResult};
pub use server::Server;

/// The default port TaskPool listens on
pub const DEFAULT_PORT: u16 = 9000;

/// The default host TaskPool binds to
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Version of TaskPool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
