//! Server Configuration
//!
//! Every setting has a default, can be overridden on the command line, and
//! can also be supplied through a `TASKPOOL_*` environment variable.
//!
//! ```text
//! taskpool --port 9100 --workers 8 --timeout 10
//! TASKPOOL_WORKERS=8 taskpool
//! ```

use crate::dispatch::PoolConfig;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::time::Duration;
use thiserror::Error;

/// Default number of workers
pub const DEFAULT_WORKERS: usize = 4;

/// Default wait for a single task's result
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time `stop()` waits for workers to exit
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Default interval at which idle workers re-check their stop flag
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Invalid configuration values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },
}

/// Server configuration
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskpool",
    version,
    about = "A line-delimited JSON task server backed by a fixed worker pool",
    after_help = "EXAMPLES:\n    \
        taskpool                        # Start on 0.0.0.0:9000 with 4 workers\n    \
        taskpool --port 9100            # Start on port 9100\n    \
        taskpool --workers 8 --timeout 5\n\n\
        CONNECTING:\n    \
        $ echo '{\"tipo\":\"reverse\",\"contenido\":\"abc\"}' | nc 127.0.0.1 9000\n    \
        {\"estado\":\"ok\",\"resultado\":\"cba\",\"tarea_id\":\"...\",\"worker\":1}"
)]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(long, env = "TASKPOOL_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "TASKPOOL_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of workers processing tasks
    #[arg(short, long, env = "TASKPOOL_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Seconds to wait for a task's result before answering with a timeout
    #[arg(
        long = "timeout",
        env = "TASKPOOL_TIMEOUT",
        default_value = "30",
        value_parser = parse_seconds
    )]
    pub response_timeout: Duration,

    /// Seconds to wait for workers to exit on shutdown
    #[arg(
        long,
        env = "TASKPOOL_SHUTDOWN_GRACE",
        default_value = "1",
        value_parser = parse_seconds
    )]
    pub shutdown_grace: Duration,

    /// Interval at which idle workers re-check for shutdown
    #[arg(skip = DEFAULT_POLL_INTERVAL)]
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Parse configuration from command-line arguments and the environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Checks values that the parser alone cannot rule out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        for (name, value) in [
            ("response timeout", self.response_timeout),
            ("shutdown grace", self.shutdown_grace),
            ("poll interval", self.poll_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration { name });
            }
        }
        Ok(())
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The worker pool part of the configuration
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.workers,
            poll_interval: self.poll_interval,
            shutdown_grace: self.shutdown_grace,
        }
    }
}

/// Parses a positive, finite number of seconds such as `30` or `0.5`.
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number of seconds", value))?;

    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("`{}` must be a positive number of seconds", value));
    }

    Duration::try_from_secs_f64(seconds).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["taskpool"]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.workers, 4);
        assert_eq!(config.response_timeout, Duration::from_secs(30));
        assert_eq!(config.shutdown_grace, Duration::from_secs(1));
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::try_parse_from([
            "taskpool",
            "--host",
            "127.0.0.1",
            "-p",
            "9100",
            "--workers",
            "8",
            "--timeout",
            "2.5",
            "--shutdown-grace",
            "3",
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9100");
        assert_eq!(config.workers, 8);
        assert_eq!(config.response_timeout, Duration::from_millis(2500));

        let pool = config.pool_config();
        assert_eq!(pool.workers, 8);
        assert_eq!(pool.shutdown_grace, Duration::from_secs(3));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ServerConfig::try_parse_from(["taskpool", "--timeout", "0"]).is_err());
        assert!(ServerConfig::try_parse_from(["taskpool", "--timeout", "-1"]).is_err());
        assert!(ServerConfig::try_parse_from(["taskpool", "--timeout", "soon"]).is_err());
        assert!(ServerConfig::try_parse_from(["taskpool", "--port", "70000"]).is_err());

        let config = ServerConfig::try_parse_from(["taskpool", "--workers", "0"]).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));
    }

    #[test]
    fn test_validate_rejects_zero_durations() {
        let config = ServerConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration {
                name: "poll interval"
            })
        );
    }
}
