//! Connection Handler Module
//!
//! This module manages individual client connections to TaskPool.
//! Each client connection is handled by its own async task, so slow or
//! stalled clients never hold up anyone else.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Read bytes  │───>│ Decode line │───>│ Submit+wait │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Send resp   │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Uses Tokio for non-blocking network operations
//! - **Buffer Management**: Lines are split out of a BytesMut buffer
//! - **Timeouts**: Each task's result is awaited for a bounded time
//! - **Statistics**: Tracks connection and task metrics
//!
//! ## Example
//!
//! ```ignore
//! use taskpool::connection::{handle_connection, ConnectionStats};
//! use taskpool::dispatch::TaskQueue;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let queue = Arc::new(TaskQueue::new());
//! let stats = Arc::new(ConnectionStats::new());
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, queue, Duration::from_secs(30), stats));
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
