//! Task Client
//!
//! A small async client for the line protocol: write one request line, read
//! one response line. Used by the tests and usable from any tokio program.
//!
//! Every exchange is bounded by an I/O timeout (10 seconds unless changed with
//! [`TaskClient::with_timeout`]). `submit` also checks the task kind locally,
//! so an unknown alias never costs a round trip.
//!
//! ## Example
//!
//! ```ignore
//! use taskpool::client::TaskClient;
//! use taskpool::protocol::TaskRequest;
//!
//! let mut client = TaskClient::connect("127.0.0.1:9000").await?;
//! let result = client.submit(&TaskRequest::new("contar", "uno dos tres")).await?;
//! assert_eq!(result.result, Some(serde_json::json!(3)));
//! ```

use crate::protocol::{TaskKind, TaskRequest, TaskResult};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

/// Default bound on one request/response exchange
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while talking to a server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The server sent something that is not a response object
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// Raw requests must fit on one line
    #[error("request contains a newline")]
    MultiLineRequest,

    /// `tipo` is not a known task kind; nothing was sent
    #[error("unsupported task kind: {0}")]
    InvalidTaskKind(String),

    /// No response within the I/O timeout. The connection should be dropped,
    /// since a late response would be read as the answer to the next request.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The server closed the connection before answering
    #[error("connection closed by server")]
    Closed,
}

/// A connection to a TaskPool server.
pub struct TaskClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    line: String,
    timeout: Duration,
}

impl TaskClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            line: String::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Sets the bound on each request/response exchange.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends a request and waits for its response.
    pub async fn submit(&mut self, request: &TaskRequest) -> Result<TaskResult, ClientError> {
        TaskKind::from_value(request.kind.as_ref()).map_err(ClientError::InvalidTaskKind)?;

        let mut bytes = serde_json::to_vec(request)?;
        bytes.push(b'\n');
        self.exchange(&bytes).await
    }

    /// Sends a raw line, which need not be valid JSON, and waits for the response.
    pub async fn send_raw(&mut self, line: &str) -> Result<TaskResult, ClientError> {
        if line.contains('\n') {
            return Err(ClientError::MultiLineRequest);
        }
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.exchange(&bytes).await
    }

    async fn exchange(&mut self, request: &[u8]) -> Result<TaskResult, ClientError> {
        let limit = self.timeout;
        tokio::time::timeout(limit, self.round_trip(request))
            .await
            .map_err(|_| ClientError::Timeout(limit))?
    }

    async fn round_trip(&mut self, request: &[u8]) -> Result<TaskResult, ClientError> {
        self.writer.write_all(request).await?;
        trace!(bytes = request.len(), "Sent request");

        self.line.clear();
        let n = self.reader.read_line(&mut self.line).await?;
        if n == 0 {
            return Err(ClientError::Closed);
        }

        Ok(serde_json::from_str(self.line.trim_end())?)
    }
}
