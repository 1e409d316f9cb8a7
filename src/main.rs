//! TaskPool - A Line-Delimited JSON Task Server
//!
//! This is the main entry point for the TaskPool server.
//! It reads the configuration, starts the worker pool and the TCP listener,
//! and shuts both down in order on Ctrl+C.

use anyhow::Context;
use taskpool::{Server, ServerConfig};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
TaskPool v{} - Line-Delimited JSON Task Server
──────────────────────────────────────────────────────────────
Server started on {}
Workers: {}    Task timeout: {:.1}s
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        taskpool::VERSION,
        config.bind_address(),
        config.workers,
        config.response_timeout.as_secs_f64(),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = ServerConfig::from_args();
    config.validate().context("invalid configuration")?;

    // Set up logging; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Bind the listener and start the workers
    let server = Server::bind(config.clone())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;

    print_banner(&config);

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let report = server.run_until(shutdown).await;

    if report.is_clean() {
        info!(workers = report.stopped.len(), "Server shutdown complete");
    } else {
        warn!(
            abandoned = ?report.abandoned,
            "Server shutdown complete, some workers were abandoned"
        );
    }
    Ok(())
}
