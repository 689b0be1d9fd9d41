//! HTTP adapter: multipart submission and artifact download over reqwest.

use crate::config::ClientConfig;
use crate::ports::upload::{FileSource, UploadError, UploadTransport};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};

/// Posts submissions to `{api_base}/task` and fetches artifacts.
pub struct HttpUploadTransport {
    client: reqwest::Client,
    submit_url: String,
}

impl HttpUploadTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            submit_url: config.submit_url(),
        }
    }

    /// Fetch a finished artifact's bytes from its download URL.
    pub async fn fetch_artifact(&self, url: &str) -> Result<Bytes, UploadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Status(status.as_u16(), body));
        }
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn send_upload(
        &self,
        files: Vec<FileSource>,
        metadata: String,
    ) -> Result<String, UploadError> {
        let mut form = Form::new();
        for file in files {
            // Shared field name; the metadata part maps filenames to lists
            let part = Part::stream(reqwest::Body::from(file.data)).file_name(file.name);
            form = form.part("files", part);
        }
        form = form.text("metadata", metadata);

        let response = self
            .client
            .post(&self.submit_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16(), body));
        }
        Ok(body)
    }
}
