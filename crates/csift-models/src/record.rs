//! Job records and the client-side job state machine.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::options::SubmitOptions;

/// Client-generated identifier for a tracked job.
///
/// Minted when a record enters the ledger and stable for the record's whole
/// lifetime, independent of whether the server has assigned a job id yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// Generate a new random correlation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned identifier for a processing job.
///
/// Only ever produced by the service; assigned to a record once and immutable
/// thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-side job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Record created, upload not started
    #[default]
    Queued,
    /// Multipart upload in flight
    Uploading,
    /// Server accepted the upload and is processing
    Processing,
    /// Processing finished, artifact available
    Completed,
    /// Upload or processing failed
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Uploading => "uploading",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tracked submission, from file selection to terminal state.
///
/// All transitions go through the methods below; each refuses illegal moves
/// by returning `false`, so a record can never leave `Completed` or `Failed`
/// except through an explicit [`JobRecord::reset_for_retry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Client-generated correlation ID
    pub id: CorrelationId,
    /// Original file name, used for display and artifact naming
    pub file_name: String,
    /// Local path of the source file
    pub file_path: PathBuf,
    /// Source file size in bytes
    pub size_bytes: u64,
    /// MIME type of the source file, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Options the file was (or will be) submitted with
    pub options: SubmitOptions,
    /// Server-assigned job ID, present once the upload was accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Current state
    #[serde(default)]
    pub state: JobState,
    /// Upload progress (0-100), bytes sent over bytes total
    #[serde(default)]
    pub upload_progress: u8,
    /// Narrated processing phase label (cosmetic)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Narrated display percentage (cosmetic, never authoritative)
    #[serde(default)]
    pub display_percent: u8,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Artifact download locator from the completion response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
    /// Submission attempt sequence, bumped on every retry.
    ///
    /// Updates from a superseded attempt carry a stale sequence number and
    /// must be discarded by the tracker.
    #[serde(default)]
    pub attempt_seq: u64,
}

impl JobRecord {
    /// Create a new queued record for a validated file.
    pub fn new(
        file_name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        size_bytes: u64,
        content_type: Option<String>,
        options: SubmitOptions,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CorrelationId::new(),
            file_name: file_name.into(),
            file_path: file_path.into(),
            size_bytes,
            content_type,
            options,
            job_id: None,
            state: JobState::Queued,
            upload_progress: 0,
            phase: None,
            display_percent: 0,
            error_message: None,
            download_url: None,
            created_at: now,
            updated_at: now,
            attempt_seq: 0,
        }
    }

    /// Check if the record is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// `queued -> uploading`, on submission start.
    pub fn begin_upload(&mut self) -> bool {
        if self.state != JobState::Queued {
            return false;
        }
        self.state = JobState::Uploading;
        self.phase = Some("Uploading".to_string());
        self.touch();
        true
    }

    /// Record upload progress. Monotonically non-decreasing; ignored outside
    /// the uploading state.
    pub fn set_upload_progress(&mut self, percent: u8) -> bool {
        if self.state != JobState::Uploading {
            return false;
        }
        let percent = percent.min(100);
        if percent > self.upload_progress {
            self.upload_progress = percent;
            self.display_percent = percent;
        }
        self.touch();
        true
    }

    /// `uploading -> processing`, on receipt of the server-assigned job id.
    pub fn begin_processing(&mut self, job_id: JobId) -> bool {
        if self.state != JobState::Uploading || self.job_id.is_some() {
            return false;
        }
        self.job_id = Some(job_id);
        self.state = JobState::Processing;
        self.upload_progress = 100;
        self.display_percent = 0;
        self.touch();
        true
    }

    /// Record a narration tick. Cosmetic only: refreshes the phase label and
    /// display percentage, never the state. The display percentage cannot go
    /// backwards and stays below 100 until completion snaps it there.
    pub fn set_narration(&mut self, phase: impl Into<String>, percent: u8) -> bool {
        if self.state != JobState::Processing {
            return false;
        }
        self.phase = Some(phase.into());
        let percent = percent.min(99);
        if percent > self.display_percent {
            self.display_percent = percent;
        }
        self.touch();
        true
    }

    /// `processing -> completed`, with the artifact locator from the
    /// terminal poll response.
    pub fn complete(&mut self, download_url: Option<String>) -> bool {
        if self.state != JobState::Processing {
            return false;
        }
        self.state = JobState::Completed;
        self.download_url = download_url;
        self.display_percent = 100;
        self.phase = Some("Complete".to_string());
        self.touch();
        true
    }

    /// `uploading -> failed` or `processing -> failed`.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if !matches!(self.state, JobState::Uploading | JobState::Processing) {
            return false;
        }
        self.state = JobState::Failed;
        self.error_message = Some(error.into());
        self.touch();
        true
    }

    /// `failed -> queued`, by explicit user action only.
    ///
    /// Clears the previous attempt's error, progress, server job id and
    /// result, and bumps the attempt sequence so late responses from the old
    /// lifecycle are discarded.
    pub fn reset_for_retry(&mut self) -> bool {
        if self.state != JobState::Failed {
            return false;
        }
        self.state = JobState::Queued;
        self.job_id = None;
        self.upload_progress = 0;
        self.display_percent = 0;
        self.phase = None;
        self.error_message = None;
        self.download_url = None;
        self.attempt_seq += 1;
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> JobRecord {
        JobRecord::new(
            "clip.mp4",
            "/tmp/clip.mp4",
            1024,
            Some("video/mp4".to_string()),
            SubmitOptions::default(),
        )
    }

    #[test]
    fn test_new_record_is_queued() {
        let rec = record();
        assert_eq!(rec.state, JobState::Queued);
        assert_eq!(rec.upload_progress, 0);
        assert!(rec.job_id.is_none());
        assert!(!rec.is_terminal());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut rec = record();
        assert!(rec.begin_upload());
        assert_eq!(rec.state, JobState::Uploading);

        assert!(rec.set_upload_progress(40));
        assert!(rec.set_upload_progress(80));
        assert_eq!(rec.upload_progress, 80);

        assert!(rec.begin_processing(JobId::from_string("abc123")));
        assert_eq!(rec.state, JobState::Processing);
        assert_eq!(rec.upload_progress, 100);
        assert_eq!(rec.job_id.as_ref().map(|j| j.as_str()), Some("abc123"));

        assert!(rec.complete(Some("/d/abc123".to_string())));
        assert_eq!(rec.state, JobState::Completed);
        assert_eq!(rec.download_url.as_deref(), Some("/d/abc123"));
        assert_eq!(rec.display_percent, 100);
    }

    #[test]
    fn test_upload_progress_is_monotonic() {
        let mut rec = record();
        rec.begin_upload();
        rec.set_upload_progress(60);
        rec.set_upload_progress(30);
        assert_eq!(rec.upload_progress, 60);
        // Values over 100 are clamped
        rec.set_upload_progress(130);
        assert_eq!(rec.upload_progress, 100);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut rec = record();
        rec.begin_upload();
        rec.fail("network error");
        assert_eq!(rec.state, JobState::Failed);

        assert!(!rec.begin_upload());
        assert!(!rec.begin_processing(JobId::from_string("late")));
        assert!(!rec.complete(None));
        assert!(!rec.fail("again"));
        assert_eq!(rec.state, JobState::Failed);
        assert_eq!(rec.error_message.as_deref(), Some("network error"));

        let mut done = record();
        done.begin_upload();
        done.begin_processing(JobId::from_string("abc"));
        done.complete(None);
        assert!(!done.fail("too late"));
        assert_eq!(done.state, JobState::Completed);
    }

    #[test]
    fn test_job_id_present_iff_accepted() {
        let mut rec = record();
        rec.begin_upload();
        assert!(rec.job_id.is_none());

        // Upload failure never assigns a job id
        rec.fail("HTTP 413");
        assert!(rec.job_id.is_none());

        let mut ok = record();
        ok.begin_upload();
        ok.begin_processing(JobId::from_string("xyz"));
        assert!(ok.job_id.is_some());
        // The id is assigned once; a second acceptance is refused
        assert!(!ok.begin_processing(JobId::from_string("other")));
        assert_eq!(ok.job_id.as_ref().map(|j| j.as_str()), Some("xyz"));
    }

    #[test]
    fn test_reset_for_retry_clears_prior_attempt() {
        let mut rec = record();
        rec.begin_upload();
        rec.set_upload_progress(70);
        rec.begin_processing(JobId::from_string("abc"));
        rec.fail("corrupt stream");

        let seq_before = rec.attempt_seq;
        assert!(rec.reset_for_retry());
        assert_eq!(rec.state, JobState::Queued);
        assert_eq!(rec.upload_progress, 0);
        assert_eq!(rec.display_percent, 0);
        assert!(rec.error_message.is_none());
        assert!(rec.job_id.is_none());
        assert!(rec.phase.is_none());
        assert_eq!(rec.attempt_seq, seq_before + 1);

        // Only failed jobs can be reset
        assert!(!rec.reset_for_retry());
    }

    #[test]
    fn test_narration_is_cosmetic() {
        let mut rec = record();
        rec.begin_upload();
        rec.begin_processing(JobId::from_string("abc"));

        assert!(rec.set_narration("Analyzing content", 40));
        assert_eq!(rec.phase.as_deref(), Some("Analyzing content"));
        assert_eq!(rec.display_percent, 40);
        assert_eq!(rec.state, JobState::Processing);

        // Display percent never goes backwards and is capped below 100
        rec.set_narration("Analyzing content", 20);
        assert_eq!(rec.display_percent, 40);
        rec.set_narration("Finalizing", 120);
        assert_eq!(rec.display_percent, 99);

        // Not narratable once terminal
        rec.complete(None);
        assert!(!rec.set_narration("Finalizing", 50));
    }
}
