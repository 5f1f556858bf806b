//! Wire types for the processing service's job endpoints.

use serde::{Deserialize, Serialize};

/// Acceptance response from the process endpoint (HTTP 200/202).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned job identifier
    pub job_id: String,
}

/// Error body returned on non-acceptance statuses. Either field may be
/// absent; some deployments use `error`, others `detail`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl SubmitErrorBody {
    /// The server's message, whichever field carried it.
    pub fn message(&self) -> Option<&str> {
        self.error.as_deref().or(self.detail.as_deref())
    }
}

/// Server-reported job status.
///
/// Unrecognized strings map to [`RemoteStatus::Unknown`] and are treated as
/// still-running, so a new server-side status value never breaks polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl RemoteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteStatus::Completed | RemoteStatus::Failed)
    }
}

/// Response from the status endpoint for one job.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    /// Coarse job status
    pub status: RemoteStatus,
    /// Server-side progress percentage, rarely present
    #[serde(default)]
    pub progress: Option<f32>,
    /// Artifact locator, present once completed
    #[serde(default)]
    pub download_url: Option<String>,
    /// Failure detail, present when failed
    #[serde(default)]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_completed() {
        let resp: StatusResponse =
            serde_json::from_str(r#"{"status": "completed", "download_url": "/d/abc123"}"#)
                .unwrap();
        assert_eq!(resp.status, RemoteStatus::Completed);
        assert!(resp.status.is_terminal());
        assert_eq!(resp.download_url.as_deref(), Some("/d/abc123"));
    }

    #[test]
    fn test_status_tolerates_unknown_value() {
        let resp: StatusResponse =
            serde_json::from_str(r#"{"status": "queued_for_gpu"}"#).unwrap();
        assert_eq!(resp.status, RemoteStatus::Unknown);
        assert!(!resp.status.is_terminal());
    }

    #[test]
    fn test_error_body_fields() {
        let body: SubmitErrorBody =
            serde_json::from_str(r#"{"detail": "file too large"}"#).unwrap();
        assert_eq!(body.message(), Some("file too large"));

        let empty: SubmitErrorBody = serde_json::from_str("{}").unwrap();
        assert!(empty.message().is_none());
    }
}
