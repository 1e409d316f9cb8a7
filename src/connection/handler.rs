//! Connection Handler Module
//!
//! This module handles individual client connections to TaskPool.
//! Each client gets its own handler task that runs in a loop,
//! reading requests, waiting for their results and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read bytes from socket  │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Split line, decode task │ │──── malformed ───┐
//!    │  └───────────┬─────────────┘ │                  │
//!    │              ▼               │                  │
//!    │  ┌─────────────────────────┐ │                  │
//!    │  │ Enqueue + wait (timeout)│ │                  │
//!    │  └───────────┬─────────────┘ │                  │
//!    │              ▼               │                  │
//!    │  ┌─────────────────────────┐ │                  │
//!    │  │ Send response line      │<├──────────────────┘
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Ordering
//!
//! A connection has at most one task in flight: the handler waits for each
//! result before reading the next line, so responses always come back in
//! request order. Different connections run independently.

use crate::dispatch::TaskQueue;
use crate::protocol::{decode_request, encode_response, LineBuffer, Task, TaskResult};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Tasks placed on the queue
    pub tasks_submitted: AtomicU64,
    /// Tasks whose result did not arrive in time
    pub tasks_timed_out: AtomicU64,
    /// Lines rejected before reaching the queue
    pub requests_rejected: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn task_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_timed_out(&self) {
        self.tasks_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// This struct manages the read buffer, request decoding, dispatch and
/// response sending for one connected client.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Incoming bytes not yet split into lines
    frames: LineBuffer,

    /// The queue shared with the worker pool
    queue: Arc<TaskQueue>,

    /// Longest wait for a single task's result
    response_timeout: Duration,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The TCP stream for this connection
    /// * `addr` - The client's socket address
    /// * `queue` - The task queue the worker pool consumes
    /// * `response_timeout` - Maximum wait for each task's result
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        queue: Arc<TaskQueue>,
        response_timeout: Duration,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            frames: LineBuffer::new(),
            queue,
            response_timeout,
            stats,
        }
    }

    /// Runs the main connection loop.
    ///
    /// This method reads requests from the client, dispatches them,
    /// and sends back responses until the client disconnects or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    info!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::UnexpectedEof => {
                    debug!(client = %self.addr, "Client disconnected mid-line, partial request dropped")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-dispatch-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            // Answer every complete line already buffered
            loop {
                let response = match self.frames.next_line() {
                    Ok(Some(line)) => self.handle_line(line).await,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(client = %self.addr, error = %e, "Rejected request");
                        self.stats.request_rejected();
                        e.into_response()
                    }
                };
                self.send_response(&response).await?;
            }

            // Need more data - read from the socket
            self.read_more_data().await?;
        }
    }

    /// Produces the response for one request line.
    async fn handle_line(&mut self, line: Bytes) -> TaskResult {
        match decode_request(&line) {
            Ok(task) => self.dispatch(task).await,
            Err(e) => {
                // Rejected requests never touch the queue
                warn!(client = %self.addr, error = %e, "Rejected request");
                self.stats.request_rejected();
                e.into_response()
            }
        }
    }

    /// Enqueues a task and waits for its result, up to the response timeout.
    async fn dispatch(&mut self, task: Task) -> TaskResult {
        let task_id = task.id.clone();
        trace!(client = %self.addr, task_id = %task_id, kind = %task.kind, "Enqueueing task");

        let receiver = self.queue.submit(task);
        self.stats.task_submitted();

        match tokio::time::timeout(self.response_timeout, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                // The entry was dropped unprocessed (pool shutdown)
                warn!(client = %self.addr, task_id = %task_id, "Task dropped before completion");
                TaskResult::error("task dropped before completion").with_task_id(task_id)
            }
            Err(_) => {
                // The worker keeps running; its result will be discarded
                self.stats.task_timed_out();
                warn!(
                    client = %self.addr,
                    task_id = %task_id,
                    timeout_ms = self.response_timeout.as_millis(),
                    "Task timed out"
                );
                TaskResult::error(format!(
                    "task timed out after {:.2}s",
                    self.response_timeout.as_secs_f64()
                ))
                .with_task_id(task_id)
            }
        }
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        let buffer = self.frames.buffer_mut();

        // Ensure we have some capacity
        if buffer.capacity() - buffer.len() < 1024 {
            buffer.reserve(4096);
        }

        // Read data
        let n = self.stream.get_mut().read_buf(buffer).await?;

        if n == 0 {
            // Connection closed by client
            if self.frames.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial line in buffer
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &TaskResult) -> Result<(), ConnectionError> {
        let bytes = encode_response(response);
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial line)
    #[error("Unexpected end of stream")]
    UnexpectedEof,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion. The outcome is logged by
/// [`ConnectionHandler::run`].
///
/// # Arguments
///
/// * `stream` - The TCP stream for this connection
/// * `addr` - The client's socket address
/// * `queue` - The task queue the worker pool consumes
/// * `response_timeout` - Maximum wait for each task's result
/// * `stats` - Shared connection statistics
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    queue: Arc<TaskQueue>,
    response_timeout: Duration,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, queue, response_timeout, stats);
    let _ = handler.run().await;
}
