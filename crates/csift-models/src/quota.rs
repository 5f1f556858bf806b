//! Quota snapshots and tolerant decoding of the usage endpoint.
//!
//! The usage endpoint's response shape has drifted across service versions:
//! some deployments nest the counters under a `usage` key, some return them
//! flat, and the field names vary. Rather than duck-typing, the known shapes
//! are modeled as an untagged union with an explicit unknown fallback, and
//! everything lowers into [`QuotaSnapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw usage counters as they appear on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCounters {
    /// Submissions consumed this period
    #[serde(alias = "used", alias = "count", alias = "current_count")]
    pub current: i64,
    /// Period limit; zero or negative means the service did not report one
    #[serde(alias = "quota", alias = "max")]
    pub limit: i64,
    /// When the period resets, if reported
    #[serde(default, alias = "reset_at", alias = "reset_date")]
    pub resets_at: Option<DateTime<Utc>>,
}

/// The usage endpoint's response, one of the shapes observed in production.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UsagePayload {
    /// Counters nested under a `usage` key
    Nested { usage: UsageCounters },
    /// Counters at the top level
    Flat(UsageCounters),
    /// Anything else; treated as "unknown" rather than an error
    Unknown(serde_json::Value),
}

impl UsagePayload {
    /// Lower the payload into a snapshot, mapping unparseable or
    /// misconfigured data to an unknown limit.
    pub fn snapshot(&self) -> QuotaSnapshot {
        match self {
            UsagePayload::Nested { usage } | UsagePayload::Flat(usage) => {
                QuotaSnapshot::from_counters(usage)
            }
            UsagePayload::Unknown(_) => QuotaSnapshot::unknown(),
        }
    }
}

/// Point-in-time view of the caller's usage against the period limit.
///
/// Never persisted; fetched fresh before each submission decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// Submissions consumed this period
    pub consumed: u32,
    /// Period limit; `None` when the service reported none (or a
    /// nonsensical one), which must never block submission
    pub limit: Option<u32>,
    /// When the period resets, if known
    pub resets_at: Option<DateTime<Utc>>,
}

impl QuotaSnapshot {
    /// Snapshot with no usable limit information.
    pub fn unknown() -> Self {
        Self {
            consumed: 0,
            limit: None,
            resets_at: None,
        }
    }

    fn from_counters(counters: &UsageCounters) -> Self {
        Self {
            consumed: counters.current.max(0) as u32,
            limit: u32::try_from(counters.limit).ok().filter(|l| *l > 0),
            resets_at: counters.resets_at,
        }
    }

    /// Remaining submissions this period, if the limit is known.
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|l| l.saturating_sub(self.consumed))
    }
}
