//! Client configuration.

use std::time::Duration;

/// Configuration for the processing-service client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the processing service API
    pub base_url: String,
    /// Bearer credential attached to authenticated calls, if any
    pub bearer_token: Option<String>,
    /// Timeout for short requests (status polls, usage)
    pub request_timeout: Duration,
    /// Timeout for uploads and artifact downloads
    pub transfer_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            bearer_token: None,
            request_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(600), // large media files
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("CSIFT_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000/api".to_string()),
            bearer_token: std::env::var("CSIFT_API_TOKEN").ok().filter(|t| !t.is_empty()),
            request_timeout: Duration::from_secs(
                std::env::var("CSIFT_REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            transfer_timeout: Duration::from_secs(
                std::env::var("CSIFT_TRANSFER_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}
