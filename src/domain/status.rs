//! Typed decoding of status-stream frames.
//!
//! Frames arrive as JSON text and are decoded into [`StatusMessage`] at the
//! boundary, immediately on receipt. A frame that does not decode is a
//! [`ParseError`]; the subscription reports it and keeps listening.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle states recognized by the client.
///
/// The wire format is an open string; anything outside the four known values
/// (the original server also emits `started`) decodes as `Unrecognized` and
/// is treated as in-flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Finished,
    Failed,
    #[serde(other)]
    Unrecognized,
}

/// Result payload attached to a `finished` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskPayload {
    File { file_path: String },
    Youtube { url: String },
}

/// One progress event as pushed by the server.
///
/// Never mutated after decoding; the subscription only appends it to the
/// shared history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: TaskStatus,
    /// Human-readable description of the current stage.
    #[serde(default)]
    pub step: String,
    /// Overall progress; absent on the wire means 0.
    #[serde(default)]
    pub total_progress: i64,
    /// Progress within the current step. The server sends it but the
    /// overall view is driven by `total_progress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_progress: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<TaskPayload>,
    /// Server-supplied failure message, present when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusMessage {
    /// True once no further meaningful updates are expected for the task.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Finished | TaskStatus::Failed)
    }
}

/// A frame that could not be decoded. Non-fatal for the subscription.
#[derive(Debug)]
pub struct ParseError(serde_json::Error);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Undecodable status frame: {}", self.0)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Decode one inbound text frame.
pub fn decode_frame(raw: &str) -> Result<StatusMessage, ParseError> {
    serde_json::from_str(raw).map_err(ParseError)
}
