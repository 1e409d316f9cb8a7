//! Server
//!
//! The composition root: builds the task queue, starts the worker pool,
//! binds the listener and runs the accept loop until told to shut down.
//! The queue is created here and handed out explicitly; nothing is global,
//! so tests can run several isolated servers in one process.

use crate::config::ServerConfig;
use crate::connection::{handle_connection, ConnectionStats};
use crate::dispatch::{PoolStats, ShutdownReport, TaskQueue, WorkerPool};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// A bound, running TaskPool server.
pub struct Server {
    listener: TcpListener,
    queue: Arc<TaskQueue>,
    pool: WorkerPool,
    stats: Arc<ConnectionStats>,
    response_timeout: Duration,
}

impl Server {
    /// Binds the listener and starts the worker pool.
    ///
    /// Fails only if the address cannot be bound.
    pub async fn bind(config: ServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        info!("Listening on {}", listener.local_addr()?);

        let queue = Arc::new(TaskQueue::new());
        let pool = WorkerPool::start(Arc::clone(&queue), config.pool_config());

        Ok(Self {
            listener,
            queue,
            pool,
            stats: Arc::new(ConnectionStats::new()),
            response_timeout: config.response_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    pub fn pool_stats(&self) -> Arc<PoolStats> {
        self.pool.stats()
    }

    /// Accepts connections until `shutdown` resolves, then stops the pool.
    ///
    /// Connections still open at that point are not closed here; their
    /// pending and future tasks get a "dropped" or timeout response.
    pub async fn run_until<F>(self, shutdown: F) -> ShutdownReport
    where
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            queue,
            pool,
            stats,
            response_timeout,
        } = self;

        tokio::select! {
            _ = accept_loop(&listener, queue, response_timeout, stats) => {}
            _ = shutdown => {
                info!("Shutdown signal received, stopping server...");
            }
        }

        drop(listener);
        pool.stop().await
    }
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: &TcpListener,
    queue: Arc<TaskQueue>,
    response_timeout: Duration,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let queue = Arc::clone(&queue);
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, queue, response_timeout, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
