//! Processing service HTTP client.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, StatusCode};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};
use url::Url;

use csift_models::{JobId, StatusResponse, SubmitErrorBody, SubmitOptions, SubmitResponse, UsagePayload};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Chunk size for the counted upload stream.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Callback type for upload progress updates: `(bytes_sent, bytes_total)`.
///
/// Counts bytes handed to the HTTP stack, not bytes acknowledged by the
/// server.
pub type UploadProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync + 'static>;

/// Client for the ClipSift processing service.
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a new client.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Url::parse(&config.base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL {:?}: {}", config.base_url, e)))?;

        let http = Client::builder().build().map_err(ClientError::Network)?;

        Ok(Self {
            http,
            config: ClientConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Same client with a different (or absent) bearer credential.
    pub fn with_bearer(&self, token: Option<String>) -> Self {
        Self {
            http: self.http.clone(),
            config: ClientConfig {
                bearer_token: token,
                ..self.config.clone()
            },
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Upload a media file for processing and return the server-assigned
    /// job id.
    ///
    /// The file is streamed in chunks; `progress` is invoked with
    /// `(bytes_sent, bytes_total)` as each chunk is handed off. HTTP 200 and
    /// 202 count as acceptance; anything else becomes a
    /// [`ClientError::Status`] carrying the server's message when it sent
    /// one.
    pub async fn submit(
        &self,
        path: &Path,
        file_name: &str,
        content_type: Option<&str>,
        options: &SubmitOptions,
        progress: Option<UploadProgressFn>,
    ) -> ClientResult<JobId> {
        let total = tokio::fs::metadata(path).await?.len();
        let file = tokio::fs::File::open(path).await?;

        let stream = futures_util::stream::unfold((file, 0u64), move |(mut file, sent)| {
            let progress = progress.clone();
            async move {
                let mut buf = vec![0u8; UPLOAD_CHUNK_BYTES];
                match file.read(&mut buf).await {
                    Ok(0) => None,
                    Ok(n) => {
                        buf.truncate(n);
                        let sent = sent + n as u64;
                        if let Some(cb) = progress.as_ref() {
                            cb(sent, total);
                        }
                        Some((Ok::<Bytes, std::io::Error>(Bytes::from(buf)), (file, sent)))
                    }
                    Err(e) => Some((Err(e), (file, sent))),
                }
            }
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(file_name.to_string())
            .mime_str(content_type.unwrap_or("application/octet-stream"))
            .map_err(ClientError::Network)?;

        let form = Form::new()
            .text("mode", options.mode.as_str())
            .text("threshold", options.threshold_field())
            .text("languages", options.languages_field())
            .part("file", part);

        let url = self.url("/process");
        debug!(url = %url, file = %file_name, bytes = total, "Submitting file for processing");

        let response = self
            .authorize(self.http.post(&url))
            .timeout(self.config.transfer_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(ClientError::Network)?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            let server_message = serde_json::from_str::<SubmitErrorBody>(&body)
                .ok()
                .and_then(|b| b.message().map(str::to_string));
            warn!(status = %status, "Upload rejected");
            return Err(ClientError::status(status, server_message));
        }

        let accepted: SubmitResponse = response.json().await?;
        if accepted.job_id.is_empty() {
            return Err(ClientError::InvalidResponse(
                "acceptance response carried an empty job_id".to_string(),
            ));
        }

        Ok(JobId::from_string(accepted.job_id))
    }

    /// Fetch the current status of a job.
    pub async fn job_status(&self, job_id: &JobId) -> ClientResult<StatusResponse> {
        let url = self.url(&format!("/status/{}", job_id));

        let response = self
            .authorize(self.http.get(&url))
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(ClientError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let server_message = serde_json::from_str::<SubmitErrorBody>(&body)
                .ok()
                .and_then(|b| b.message().map(str::to_string));
            return Err(ClientError::status(status, server_message));
        }

        let parsed: StatusResponse = response.json().await?;
        Ok(parsed)
    }

    /// Fetch the caller's usage counters for the current period.
    pub async fn usage(&self) -> ClientResult<UsagePayload> {
        let url = self.url("/usage");

        let response = self
            .authorize(self.http.get(&url))
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(ClientError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::status(status, None));
        }

        let payload: UsagePayload = response.json().await?;
        Ok(payload)
    }

    /// Download the finished artifact for a completed job.
    pub async fn download(&self, job_id: &JobId) -> ClientResult<Bytes> {
        let url = self.url(&format!("/download/{}", job_id));
        debug!(url = %url, "Downloading artifact");

        let response = self
            .authorize(self.http.get(&url))
            .timeout(self.config.transfer_timeout)
            .send()
            .await
            .map_err(ClientError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let server_message = serde_json::from_str::<SubmitErrorBody>(&body)
                .ok()
                .and_then(|b| b.message().map(str::to_string));
            return Err(ClientError::status(status, server_message));
        }

        let bytes = response.bytes().await.map_err(ClientError::Network)?;
        Ok(bytes)
    }
}
