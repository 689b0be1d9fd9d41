//! Submission transport seam.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

/// One binary part of a submission: filename plus content.
///
/// Order matters: files are attached in the order the user selected them,
/// and duplicates are allowed.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub name: String,
    pub data: Bytes,
}

impl FileSource {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Errors raised while submitting a job or fetching an artifact.
/// Surfaced to the caller as-is; no retry is attempted.
#[derive(Debug)]
pub enum UploadError {
    /// The request never completed (DNS, connect, I/O).
    Transport(reqwest::Error),
    /// The server answered outside the 2xx range.
    Status(u16, String),
    /// A 2xx response without a usable `task_id`.
    MalformedResponse(String),
    /// The metadata part could not be encoded.
    Serialize(serde_json::Error),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Transport(e) => write!(f, "Upload transport error: {}", e),
            UploadError::Status(code, body) => {
                write!(f, "Upload rejected with status {}: {}", code, body)
            }
            UploadError::MalformedResponse(body) => {
                write!(f, "Upload response missing task_id: {}", body)
            }
            UploadError::Serialize(e) => write!(f, "Metadata serialization error: {}", e),
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UploadError::Transport(e) => Some(e),
            UploadError::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Transport(err)
    }
}

impl From<serde_json::Error> for UploadError {
    fn from(err: serde_json::Error) -> Self {
        UploadError::Serialize(err)
    }
}

/// Ships prepared multipart parts to the submission endpoint.
///
/// Returns the raw 2xx response body; interpreting it is the caller's job.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UploadTransport: Send + Sync {
    async fn send_upload(
        &self,
        files: Vec<FileSource>,
        metadata: String,
    ) -> Result<String, UploadError>;
}
