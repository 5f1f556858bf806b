//! Tracker error types.
//!
//! Failures that happen inside a job's lifecycle (upload rejection, a
//! server-reported processing failure, the poll-attempt ceiling) are not
//! surfaced through these variants: they are written onto the job record as
//! its terminal error message. This enum covers the operations callers
//! invoke directly.

use thiserror::Error;

use csift_client::ClientError;
use csift_models::{CorrelationId, JobState};

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error(transparent)]
    Transport(#[from] ClientError),

    #[error("Unknown job {0}")]
    UnknownJob(CorrelationId),

    #[error("Job {id} is {state}; only failed jobs can be resubmitted")]
    NotRetryable { id: CorrelationId, state: JobState },

    #[error("Job {0} has no downloadable result")]
    ResultUnavailable(CorrelationId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
