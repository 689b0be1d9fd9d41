//! Ready-wired client facade over the real HTTP and WebSocket adapters.

use crate::adapters::http::HttpUploadTransport;
use crate::adapters::ws::WsStreamConnector;
use crate::application::submit::{SubmitService, TaskHandle};
use crate::application::subscriptions::{SubscriptionHandle, SubscriptionRegistry};
use crate::config::ClientConfig;
use crate::domain::outcome::TaskOutcome;
use crate::domain::settings::JobSettings;
use crate::ports::upload::{FileSource, UploadError};

/// Client for the stitching service: submission plus status streaming.
///
/// Submission and subscription are sequenced by the caller: subscribe with
/// the task id a successful submit returned.
pub struct MeowClient {
    config: ClientConfig,
    submit: SubmitService<HttpUploadTransport>,
    subscriptions: SubscriptionRegistry<WsStreamConnector>,
}

impl MeowClient {
    pub fn new(config: ClientConfig) -> Self {
        let transport = HttpUploadTransport::new(&config);
        let connector = WsStreamConnector::new(config.connect_timeout);
        Self {
            submit: SubmitService::new(transport),
            subscriptions: SubscriptionRegistry::new(connector, config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submit a stitching job; the returned handle keys the status stream.
    pub async fn submit_job(
        &self,
        left: Vec<FileSource>,
        right: Vec<FileSource>,
        settings: JobSettings,
    ) -> Result<TaskHandle, UploadError> {
        self.submit.submit(left, right, settings).await
    }

    /// Subscribe to a task's status stream, sharing the connection with any
    /// other observer of the same task.
    pub fn subscribe(&self, task_id: &str) -> SubscriptionHandle {
        self.subscriptions.subscribe(task_id)
    }

    /// Release an observer; pairs with [`MeowClient::subscribe`].
    pub fn release(&self, handle: &mut SubscriptionHandle) {
        self.subscriptions.release(handle)
    }

    /// Outcome of a subscribed task, derived from its latest message.
    pub fn outcome(&self, handle: &SubscriptionHandle) -> TaskOutcome {
        handle.outcome(&self.config)
    }
}
