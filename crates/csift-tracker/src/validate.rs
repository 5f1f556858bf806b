//! Local file validation before any network call.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{TrackerError, TrackerResult};

/// Validation limits for candidate files.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Accepted MIME category prefix (e.g. `video/`)
    pub accepted_prefix: String,
    /// Maximum file size in bytes
    pub max_file_bytes: u64,
    /// Maximum media duration, when the caller was able to probe one
    pub max_duration: Option<Duration>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            accepted_prefix: "video/".to_string(),
            max_file_bytes: 500 * 1024 * 1024, // 500MB
            max_duration: None,
        }
    }
}

impl ValidatorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            accepted_prefix: std::env::var("CSIFT_ACCEPTED_PREFIX")
                .unwrap_or_else(|_| "video/".to_string()),
            max_file_bytes: std::env::var("CSIFT_MAX_FILE_MB")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(500 * 1024 * 1024),
            max_duration: std::env::var("CSIFT_MAX_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        }
    }
}

/// A file as selected by the user, before validation.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    /// Original file name
    pub file_name: String,
    /// Local path
    pub path: PathBuf,
    /// Size in bytes
    pub size_bytes: u64,
    /// MIME type, when determinable
    pub content_type: Option<String>,
    /// Media duration, when the caller probed one
    pub duration: Option<Duration>,
}

impl FileCandidate {
    /// Build a candidate from a local path: reads size from metadata and
    /// guesses the MIME type from the extension. Duration is left unset;
    /// callers with a cheap probe can attach one via [`Self::with_duration`].
    pub async fn from_path(path: impl Into<PathBuf>) -> TrackerResult<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = content_type_for(&path);

        Ok(Self {
            file_name,
            size_bytes: metadata.len(),
            content_type,
            duration: None,
            path,
        })
    }

    /// Attach a probed media duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Guess a MIME type from the file extension.
fn content_type_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    let mime = match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mpg" | "mpeg" => "video/mpeg",
        "wmv" => "video/x-ms-wmv",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        _ => return None,
    };
    Some(mime.to_string())
}

/// Validates candidate files against configured limits.
///
/// Pure checks only: no network access, no filesystem access, no side
/// effects. Checks run in order and the first violated rule wins.
#[derive(Debug, Clone)]
pub struct FileValidator {
    config: ValidatorConfig,
}

impl FileValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, candidate: &FileCandidate) -> TrackerResult<()> {
        let category = self.config.accepted_prefix.trim_end_matches('/');

        match &candidate.content_type {
            Some(ct) if ct.starts_with(&self.config.accepted_prefix) => {}
            Some(ct) => {
                return Err(TrackerError::Validation(format!(
                    "{} is a {} file; only {} files are accepted",
                    candidate.file_name, ct, category
                )));
            }
            None => {
                return Err(TrackerError::Validation(format!(
                    "Could not determine the type of {}; only {} files are accepted",
                    candidate.file_name, category
                )));
            }
        }

        if candidate.size_bytes > self.config.max_file_bytes {
            return Err(TrackerError::Validation(format!(
                "{} is {} MB; the maximum upload size is {} MB",
                candidate.file_name,
                candidate.size_bytes / (1024 * 1024),
                self.config.max_file_bytes / (1024 * 1024)
            )));
        }

        if let (Some(duration), Some(max)) = (candidate.duration, self.config.max_duration) {
            if duration > max {
                return Err(TrackerError::Validation(format!(
                    "{} runs {} minutes; the maximum is {} minutes",
                    candidate.file_name,
                    duration.as_secs() / 60,
                    max.as_secs() / 60
                )));
            }
        }

        Ok(())
    }
}
