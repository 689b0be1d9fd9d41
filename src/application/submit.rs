//! Job submission: assembles the multipart upload and yields a task handle.

use crate::domain::settings::JobSettings;
use crate::ports::upload::{FileSource, UploadError, UploadTransport};
use serde::{Deserialize, Serialize};

/// Opaque reference to a submitted task; only a lookup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: String,
}

/// Metadata part of a submission: which filenames belong to which camera,
/// plus the canonical settings. Built once, consumed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub left_videos: Vec<String>,
    pub right_videos: Vec<String>,
    pub settings: JobSettings,
}

/// Submission service, generic over the transport seam.
pub struct SubmitService<T> {
    transport: T,
}

impl<T> SubmitService<T>
where
    T: UploadTransport,
{
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Submit one job.
    ///
    /// Left files precede right files in the request body; the metadata part
    /// maps each filename back to its camera list, so every listed name has
    /// a matching binary part. One outbound request, no retries: a failed
    /// submission is reported to the caller as-is.
    pub async fn submit(
        &self,
        left: Vec<FileSource>,
        right: Vec<FileSource>,
        settings: JobSettings,
    ) -> Result<TaskHandle, UploadError> {
        let request = UploadRequest {
            left_videos: left.iter().map(|f| f.name.clone()).collect(),
            right_videos: right.iter().map(|f| f.name.clone()).collect(),
            settings,
        };
        let metadata = serde_json::to_string(&request)?;

        let mut files = left;
        files.extend(right);

        let body = self.transport.send_upload(files, metadata).await?;
        parse_task_handle(&body)
    }
}

/// Extract the task id from a 2xx response body.
fn parse_task_handle(body: &str) -> Result<TaskHandle, UploadError> {
    #[derive(Deserialize)]
    struct SubmitResponse {
        task_id: Option<String>,
    }

    let parsed: SubmitResponse =
        serde_json::from_str(body).map_err(|_| UploadError::MalformedResponse(body.to_string()))?;

    match parsed.task_id {
        Some(task_id) if !task_id.is_empty() => Ok(TaskHandle { task_id }),
        _ => Err(UploadError::MalformedResponse(body.to_string())),
    }
}
