//! Configuration for the remote stitching service endpoints.

use std::env;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Connection targets for the stitching service, passed in at construction
/// time instead of being baked into the call sites.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// HTTP API base, e.g. `http://127.0.0.1:8888/api/v1`
    pub api_base: String,
    /// WebSocket base, e.g. `ws://127.0.0.1:8888/api/v1`
    pub ws_base: String,
    /// Upper bound on connection establishment (submit and stream open).
    /// Transfers themselves are not bounded; uploads can be large.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_base: impl Into<String>, ws_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ws_base: ws_base.into(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let api_base = env::var("API_BASE_URL")
            .unwrap_or_else(|_| String::from("http://127.0.0.1:8888/api/v1"));
        let ws_base =
            env::var("WS_BASE_URL").unwrap_or_else(|_| String::from("ws://127.0.0.1:8888/api/v1"));
        let connect_timeout = env::var("CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));

        Self {
            api_base,
            ws_base,
            connect_timeout,
        }
    }

    /// Submission endpoint.
    pub fn submit_url(&self) -> String {
        format!("{}/task", self.api_base.trim_end_matches('/'))
    }

    /// Status stream endpoint for one task.
    pub fn task_stream_url(&self, task_id: &str) -> String {
        format!("{}/task/{}", self.ws_base.trim_end_matches('/'), task_id)
    }

    /// Download endpoint for a finished task's artifact.
    pub fn download_url(&self, task_id: &str, file_path: &str) -> String {
        format!(
            "{}/task/{}/download/{}",
            self.api_base.trim_end_matches('/'),
            task_id,
            file_path
        )
    }
}
