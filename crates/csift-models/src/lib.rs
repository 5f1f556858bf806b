//! Shared data models for the ClipSift client.
//!
//! This crate provides Serde-serializable types for:
//! - Job records and the job state machine
//! - Submission options (filter mode, sensitivity, languages)
//! - Quota snapshots and tolerant usage-payload decoding
//! - Wire types for the processing service's status endpoints

pub mod options;
pub mod quota;
pub mod record;
pub mod status;

// Re-export common types
pub use options::{FilterMode, SubmitOptions};
pub use quota::{QuotaSnapshot, UsageCounters, UsagePayload};
pub use record::{CorrelationId, JobId, JobRecord, JobState};
pub use status::{RemoteStatus, StatusResponse, SubmitErrorBody, SubmitResponse};
