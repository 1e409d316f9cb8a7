//! Task Protocol Data Types
//!
//! This module defines the values that cross the wire and the queue.
//!
//! ## Field Names
//!
//! The wire format uses fixed field names that differ from the Rust ones:
//!
//! | Rust         | Wire         |
//! |--------------|--------------|
//! | `task_id`    | `tarea_id`   |
//! | `kind`       | `tipo`       |
//! | `payload`    | `contenido`  |
//! | `status`     | `estado`     |
//! | `result`     | `resultado`  |
//! | `message`    | `mensaje`    |
//! | `worker_id`  | `worker`     |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The kinds of work a worker knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Uppercase,
    Reverse,
    WordCount,
    Sleep,
}

impl TaskKind {
    /// All kinds, in menu order (numeric index `i + 1`).
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Uppercase,
        TaskKind::Reverse,
        TaskKind::WordCount,
        TaskKind::Sleep,
    ];

    /// Returns the canonical name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Uppercase => "uppercase",
            TaskKind::Reverse => "reverse",
            TaskKind::WordCount => "word_count",
            TaskKind::Sleep => "sleep",
        }
    }

    /// Resolves a canonical name or alias, ignoring case and surrounding whitespace.
    ///
    /// # Example
    /// ```
    /// use taskpool::protocol::TaskKind;
    /// assert_eq!(TaskKind::from_alias(" Mayus "), Some(TaskKind::Uppercase));
    /// assert_eq!(TaskKind::from_alias("4"), Some(TaskKind::Sleep));
    /// assert_eq!(TaskKind::from_alias("explode"), None);
    /// ```
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias.trim().to_lowercase().as_str() {
            "1" | "uppercase" | "mayus" | "mayusculas" | "upper" => Some(TaskKind::Uppercase),
            "2" | "reverse" | "reversa" | "invertir" => Some(TaskKind::Reverse),
            "3" | "word_count" | "contar" | "palabras" => Some(TaskKind::WordCount),
            "4" | "sleep" | "espera" | "delay" => Some(TaskKind::Sleep),
            _ => None,
        }
    }

    /// Resolves the raw `tipo` field of a request.
    ///
    /// Strings go through [`TaskKind::from_alias`]; integers are taken as the
    /// 1-based menu index. On failure, returns a description of what was
    /// received, suitable for an error message.
    pub fn from_value(value: Option<&Value>) -> Result<Self, String> {
        match value {
            None | Some(Value::Null) => Err("missing".to_string()),
            Some(Value::String(s)) => Self::from_alias(s).ok_or_else(|| s.clone()),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| Self::ALL.get(i as usize).copied())
                .ok_or_else(|| n.to_string()),
            Some(other) => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated unit of work. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Caller-supplied or server-generated identifier
    pub id: String,
    /// What to run
    pub kind: TaskKind,
    /// Input for the handler; `Null` when the request omitted it
    pub payload: Value,
}

impl Task {
    pub fn new(id: impl Into<String>, kind: TaskKind, payload: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            kind,
            payload: payload.into(),
        }
    }
}

/// A request line as sent by a client.
///
/// `kind` stays a raw JSON value here so that unknown kinds can be reported
/// with the task id attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(rename = "tarea_id", default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(rename = "tipo", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,

    #[serde(rename = "contenido", default)]
    pub payload: Value,
}

impl TaskRequest {
    /// Creates a request for the given kind (name, alias or index) and payload.
    pub fn new(kind: impl Into<Value>, payload: impl Into<Value>) -> Self {
        Self {
            task_id: None,
            kind: Some(kind.into()),
            payload: payload.into(),
        }
    }

    /// Sets an explicit task id instead of letting the server generate one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.task_id = Some(id.into());
        self
    }
}

/// Outcome of a task, as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// The response to exactly one request.
///
/// Produced by a worker, or by the connection handler on parse failure and
/// timeout. Absent fields are left out of the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(rename = "estado")]
    pub status: Status,

    #[serde(rename = "resultado", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(rename = "mensaje", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(rename = "tarea_id", default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(rename = "worker", default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<usize>,
}

impl TaskResult {
    /// Creates a successful result.
    ///
    /// # Example
    /// ```
    /// use taskpool::protocol::{Status, TaskResult};
    /// let result = TaskResult::ok("CBA").with_task_id("t-1").with_worker(2);
    /// assert_eq!(result.status, Status::Ok);
    /// assert_eq!(result.worker_id, Some(2));
    /// ```
    pub fn ok(result: impl Into<Value>) -> Self {
        Self {
            status: Status::Ok,
            result: Some(result.into()),
            message: None,
            task_id: None,
            worker_id: None,
        }
    }

    /// Creates an error result with a human-readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            result: None,
            message: Some(message.into()),
            task_id: None,
            worker_id: None,
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_worker(mut self, worker_id: usize) -> Self {
        self.worker_id = Some(worker_id);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_aliases() {
        for alias in ["1", "uppercase", "mayus", "mayusculas", "upper", "UPPER"] {
            assert_eq!(TaskKind::from_alias(alias), Some(TaskKind::Uppercase));
        }
        for alias in ["2", "reverse", "reversa", "invertir"] {
            assert_eq!(TaskKind::from_alias(alias), Some(TaskKind::Reverse));
        }
        for alias in ["3", "word_count", "contar", "palabras"] {
            assert_eq!(TaskKind::from_alias(alias), Some(TaskKind::WordCount));
        }
        for alias in ["4", "sleep", "espera", " delay\t"] {
            assert_eq!(TaskKind::from_alias(alias), Some(TaskKind::Sleep));
        }
        assert_eq!(TaskKind::from_alias("5"), None);
        assert_eq!(TaskKind::from_alias(""), None);
    }

    #[test]
    fn test_kind_from_value() {
        assert_eq!(
            TaskKind::from_value(Some(&json!("contar"))),
            Ok(TaskKind::WordCount)
        );
        assert_eq!(TaskKind::from_value(Some(&json!(2))), Ok(TaskKind::Reverse));
        assert_eq!(TaskKind::from_value(Some(&json!(0))), Err("0".to_string()));
        assert_eq!(TaskKind::from_value(Some(&json!(5))), Err("5".to_string()));
        assert_eq!(TaskKind::from_value(Some(&json!(-1))), Err("-1".to_string()));
        assert_eq!(TaskKind::from_value(None), Err("missing".to_string()));
        assert_eq!(
            TaskKind::from_value(Some(&json!("nope"))),
            Err("nope".to_string())
        );
        assert_eq!(
            TaskKind::from_value(Some(&json!([1]))),
            Err("[1]".to_string())
        );
    }

    #[test]
    fn test_kind_display_round_trips_through_alias() {
        for kind in TaskKind::ALL {
            assert_eq!(TaskKind::from_alias(&kind.to_string()), Some(kind));
        }
    }

    #[test]
    fn test_result_serialization_omits_absent_fields() {
        let ok = TaskResult::ok("cba").with_task_id("t1").with_worker(3);
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"estado": "ok", "resultado": "cba", "tarea_id": "t1", "worker": 3})
        );

        let err = TaskResult::error("invalid JSON format");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"estado": "error", "mensaje": "invalid JSON format"})
        );
    }

    #[test]
    fn test_request_serialization() {
        let req = TaskRequest::new("reverse", "abc").with_id("abc-1");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"tarea_id": "abc-1", "tipo": "reverse", "contenido": "abc"})
        );

        let parsed: TaskRequest = serde_json::from_str(r#"{"tipo": 4}"#).unwrap();
        assert_eq!(parsed.task_id, None);
        assert_eq!(parsed.kind, Some(json!(4)));
        assert_eq!(parsed.payload, Value::Null);
    }
}
