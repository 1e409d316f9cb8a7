//! Line Framing and Request Decoding
//!
//! TCP is a stream protocol: a single read may carry half a request, or
//! several. [`LineBuffer`] accumulates raw bytes and hands out complete lines;
//! anything after the last newline stays buffered for the next read.
//!
//! A line longer than the limit is reported once as [`FrameError::LineTooLong`]
//! and its remaining bytes are skipped up to the next newline, so the
//! connection keeps working.
//!
//! ## How Decoding Works
//!
//! 1. The line must be UTF-8 JSON, and the JSON must be an object.
//!    Otherwise the result is `MalformedFrame` and no task id is known.
//! 2. A missing `tarea_id` is replaced by a fresh UUID v4.
//! 3. `tipo` must resolve to a [`TaskKind`]. Otherwise the result is
//!    `InvalidTaskKind`, carrying the task id.
//!
//! Neither failure ever reaches the task queue.

use crate::protocol::types::{Task, TaskKind, TaskRequest, TaskResult};
use bytes::{Bytes, BytesMut};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Maximum length of a single request line (64 KB)
pub const MAX_LINE_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Framing errors. Each one rejects a single line.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("request line too long (max {max} bytes)")]
    LineTooLong { max: usize },
}

impl FrameError {
    /// Converts the error into the response sent back to the client.
    pub fn into_response(self) -> TaskResult {
        TaskResult::error(self.to_string())
    }
}

/// Errors that reject a single request line without closing the connection.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    /// Not JSON, not an object, or fields of the wrong type
    #[error("{0}")]
    MalformedFrame(String),

    /// `tipo` absent or not a recognized kind
    #[error("unsupported task kind: {kind}")]
    InvalidTaskKind { kind: String, task_id: String },
}

impl RequestError {
    /// Converts the error into the response sent back to the client.
    pub fn into_response(self) -> TaskResult {
        let message = self.to_string();
        match self {
            RequestError::MalformedFrame(_) => TaskResult::error(message),
            RequestError::InvalidTaskKind { task_id, .. } => {
                TaskResult::error(message).with_task_id(task_id)
            }
        }
    }
}

/// Accumulates bytes from the socket and splits them into lines.
#[derive(Debug)]
pub struct LineBuffer {
    buffer: BytesMut,
    max_line: usize,
    /// Prefix of `buffer` already known to hold no newline
    scanned: usize,
    /// Skipping the tail of an oversized line
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_max_line(MAX_LINE_SIZE)
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            max_line,
            scanned: 0,
            discarding: false,
        }
    }

    /// The underlying buffer, for reading socket data straight into it.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Appends raw bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet returned as a line.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the next complete, non-blank line without its terminator.
    ///
    /// `Ok(None)` means more data is needed. A trailing `\r` is stripped so
    /// CRLF clients work too. An oversized line yields one `Err`; the caller
    /// may keep calling, and framing resumes after that line's newline.
    pub fn next_line(&mut self) -> Result<Option<Bytes>, FrameError> {
        loop {
            let newline = self.buffer[self.scanned..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|offset| self.scanned + offset);

            let Some(pos) = newline else {
                if self.discarding {
                    self.buffer.clear();
                    self.scanned = 0;
                    return Ok(None);
                }
                if self.buffer.len() > self.max_line {
                    self.buffer.clear();
                    self.scanned = 0;
                    self.discarding = true;
                    return Err(FrameError::LineTooLong { max: self.max_line });
                }
                self.scanned = self.buffer.len();
                return Ok(None);
            };

            let mut line = self.buffer.split_to(pos + 1).freeze();
            self.scanned = 0;

            if self.discarding {
                // Tail of a line already reported as too long
                self.discarding = false;
                continue;
            }
            if pos > self.max_line {
                return Err(FrameError::LineTooLong { max: self.max_line });
            }

            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(line));
        }
    }
}

/// Decodes one request line into a validated [`Task`].
pub fn decode_request(line: &[u8]) -> Result<Task, RequestError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| RequestError::MalformedFrame("request is not valid UTF-8".to_string()))?;

    let value: Value = serde_json::from_str(text)
        .map_err(|_| RequestError::MalformedFrame("invalid JSON format".to_string()))?;

    if !value.is_object() {
        return Err(RequestError::MalformedFrame(
            "request must be a JSON object".to_string(),
        ));
    }

    let request: TaskRequest = serde_json::from_value(value)
        .map_err(|e| RequestError::MalformedFrame(format!("invalid request: {}", e)))?;

    let task_id = request
        .task_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let kind = TaskKind::from_value(request.kind.as_ref())
        .map_err(|kind| RequestError::InvalidTaskKind {
            kind,
            task_id: task_id.clone(),
        })?;

    Ok(Task {
        id: task_id,
        kind,
        payload: request.payload,
    })
}

/// Serializes a response as one JSON line, newline included.
pub fn encode_response(result: &TaskResult) -> Vec<u8> {
    // Serializing plain data with string keys cannot fail.
    let mut bytes = serde_json::to_vec(result).unwrap_or_else(|_| {
        br#"{"estado":"error","mensaje":"failed to encode response"}"#.to_vec()
    });
    bytes.push(b'\n');
    bytes
}
