//! Task Handlers
//!
//! The work a worker performs for each [`TaskKind`]. Handlers are pure
//! functions of the payload, except `sleep`, which suspends the calling
//! worker for the requested time without blocking the runtime thread.
//!
//! | Kind         | Payload             | Result                         |
//! |--------------|---------------------|--------------------------------|
//! | `uppercase`  | string              | uppercased string              |
//! | `reverse`    | string              | string with characters reversed|
//! | `word_count` | string              | number of whitespace tokens    |
//! | `sleep`      | seconds (num / str) | `"Simulated work for N.NNs"`   |

use crate::protocol::{Task, TaskKind};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while running a task. Always reported to the client,
/// never fatal to the worker.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskError {
    #[error("invalid payload for {kind}: {reason}")]
    InvalidPayload { kind: TaskKind, reason: String },
}

impl TaskError {
    fn invalid(kind: TaskKind, reason: impl Into<String>) -> Self {
        TaskError::InvalidPayload {
            kind,
            reason: reason.into(),
        }
    }
}

/// Runs a task to completion and returns its result value.
pub async fn execute(task: &Task) -> Result<Value, TaskError> {
    match task.kind {
        TaskKind::Uppercase => text_payload(task).map(|s| Value::from(uppercase(s))),
        TaskKind::Reverse => text_payload(task).map(|s| Value::from(reverse(s))),
        TaskKind::WordCount => text_payload(task).map(|s| Value::from(word_count(s))),
        TaskKind::Sleep => {
            let duration = sleep_duration(&task.payload)?;
            tokio::time::sleep(duration).await;
            Ok(Value::from(format!(
                "Simulated work for {:.2}s",
                duration.as_secs_f64()
            )))
        }
    }
}

fn text_payload(task: &Task) -> Result<&str, TaskError> {
    task.payload
        .as_str()
        .ok_or_else(|| TaskError::invalid(task.kind, "payload must be text"))
}

pub fn uppercase(text: &str) -> String {
    text.to_uppercase()
}

/// Reverses by Unicode scalar value, not by byte.
pub fn reverse(text: &str) -> String {
    text.chars().rev().collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Reads a duration in seconds from a JSON number or a numeric string.
///
/// Negative durations are clamped to zero.
pub fn sleep_duration(payload: &Value) -> Result<Duration, TaskError> {
    let seconds = match payload {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| TaskError::invalid(TaskKind::Sleep, "payload must be a number of seconds"))?;

    if !seconds.is_finite() {
        return Err(TaskError::invalid(
            TaskKind::Sleep,
            "duration must be finite",
        ));
    }

    Duration::try_from_secs_f64(seconds.max(0.0))
        .map_err(|_| TaskError::invalid(TaskKind::Sleep, "duration is too large"))
}
