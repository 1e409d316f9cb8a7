//! Wire Protocol
//!
//! Requests and responses are UTF-8 JSON objects, one per line, in both
//! directions. Newline is the only frame delimiter.
//!
//! ## Modules
//!
//! - `types`: `TaskKind`, `Task`, `TaskRequest` and `TaskResult`
//! - `codec`: Line framing plus request decoding and response encoding
//!
//! ## Example
//!
//! ```
//! use taskpool::protocol::{decode_request, encode_response, TaskKind, TaskResult};
//!
//! let task = decode_request(br#"{"tipo":"3","contenido":"a b  c"}"#).unwrap();
//! assert_eq!(task.kind, TaskKind::WordCount);
//!
//! let bytes = encode_response(&TaskResult::ok(3).with_task_id(task.id));
//! assert!(bytes.ends_with(b"\n"));
//! ```

pub mod codec;
pub mod types;

// Re-export commonly used types for convenience
pub use codec::{decode_request, encode_response, FrameError, LineBuffer, RequestError};
pub use types::{Status, Task, TaskKind, TaskRequest, TaskResult};
