//! Job lifecycle orchestration for the ClipSift client.
//!
//! This crate drives submissions end to end: local validation, the quota
//! gate, multipart upload, status polling with narrated progress, and
//! artifact download. The [`JobTracker`] owns the ledger of all in-flight
//! jobs; callers get read-only snapshots and a handful of explicit
//! operations (submit, resubmit, remove, download).

pub mod config;
pub mod error;
pub mod ledger;
pub mod narrator;
pub mod quota;
pub mod tracker;
pub mod validate;

pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use ledger::Ledger;
pub use narrator::{Narration, ProgressNarrator};
pub use quota::QuotaDecision;
pub use tracker::JobTracker;
pub use validate::{FileCandidate, FileValidator, ValidatorConfig};
