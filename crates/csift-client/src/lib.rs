//! HTTP client for the ClipSift processing service.
//!
//! This crate owns the consumed HTTP surface:
//! - `POST /process`: multipart upload with byte-level progress
//! - `GET /status/{job_id}`: poll one job's status
//! - `GET /download/{job_id}`: fetch the finished artifact
//! - `GET /usage`: current-period usage counters
//!
//! Authenticated calls carry `Authorization: Bearer <token>` when a token is
//! configured. Token acquisition and refresh live elsewhere; the client only
//! needs a credential (or its absence) injected via [`ClientConfig`] or
//! [`ApiClient::with_bearer`].

pub mod client;
pub mod config;
pub mod error;

pub use client::{ApiClient, UploadProgressFn};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
