//! Tracker configuration.

use std::time::Duration;

use crate::validate::ValidatorConfig;

/// Configuration for the job tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Interval between status polls
    pub poll_interval: Duration,
    /// Longer interval used after a transient poll failure
    pub poll_retry_interval: Duration,
    /// Maximum status checks before a job is treated as timed out
    pub max_poll_attempts: u32,
    /// Interval between narration ticks while processing
    pub narrate_interval: Duration,
    /// Typical processing time, drives the synthesized percentage
    pub expected_processing: Duration,
    /// Prefix prepended to the original name when saving artifacts
    pub download_prefix: String,
    /// File validation limits
    pub validator: ValidatorConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            poll_retry_interval: Duration::from_secs(5),
            max_poll_attempts: 60,
            narrate_interval: Duration::from_secs(2),
            expected_processing: Duration::from_secs(120),
            download_prefix: "sifted_".to_string(),
            validator: ValidatorConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_secs(
                std::env::var("CSIFT_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            ),
            poll_retry_interval: Duration::from_secs(
                std::env::var("CSIFT_POLL_RETRY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            max_poll_attempts: std::env::var("CSIFT_MAX_POLL_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            narrate_interval: Duration::from_secs(
                std::env::var("CSIFT_NARRATE_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            ),
            expected_processing: Duration::from_secs(
                std::env::var("CSIFT_EXPECTED_PROCESSING_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            download_prefix: std::env::var("CSIFT_DOWNLOAD_PREFIX")
                .unwrap_or_else(|_| "sifted_".to_string()),
            validator: ValidatorConfig::from_env(),
        }
    }
}
