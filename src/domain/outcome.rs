//! Resolution of the latest status message into a user-facing outcome.

use crate::config::ClientConfig;
use crate::domain::status::{StatusMessage, TaskPayload, TaskStatus};

/// What the consumer should present once a task finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionAction {
    /// Open the produced link (e.g. a YouTube video).
    OpenExternalLink(String),
    /// Fetch the artifact from the service's download endpoint.
    Download(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Queued, running, or an unrecognized in-flight status.
    Pending,
    /// Finished. A task can finish with nothing to present.
    Succeeded { action: Option<CompletionAction> },
    /// The server reported a failure; terminal.
    Failed { message: String },
}

/// Interpret the latest message received for `task_id`.
///
/// A server-side failure arrives as a normal terminal message, not an
/// exceptional control path; it resolves to [`TaskOutcome::Failed`] here.
pub fn resolve(latest: &StatusMessage, task_id: &str, config: &ClientConfig) -> TaskOutcome {
    match latest.status {
        TaskStatus::Finished => {
            let action = latest.payload.as_ref().map(|payload| match payload {
                TaskPayload::Youtube { url } => CompletionAction::OpenExternalLink(url.clone()),
                TaskPayload::File { file_path } => {
                    CompletionAction::Download(config.download_url(task_id, file_path))
                }
            });
            TaskOutcome::Succeeded { action }
        }
        TaskStatus::Failed => TaskOutcome::Failed {
            message: latest
                .error
                .clone()
                .unwrap_or_else(|| String::from("unknown error")),
        },
        _ => TaskOutcome::Pending,
    }
}
