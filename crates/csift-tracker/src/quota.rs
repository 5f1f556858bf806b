//! The quota gate checked before each submission.
//!
//! Policy is deliberately asymmetric: a transient accounting failure or an
//! unreported limit never blocks the primary workflow (fail open), while a
//! confirmed exhausted quota is a hard stop (fail closed).

use tracing::warn;

use csift_client::ApiClient;
use csift_models::QuotaSnapshot;

/// Fraction of the limit at which a warning is attached.
const WARN_RATIO_NUMERATOR: u64 = 9;
const WARN_RATIO_DENOMINATOR: u64 = 10;

/// Outcome of a quota check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Submission may proceed
    Proceed,
    /// Submission may proceed, but the caller should obtain explicit user
    /// confirmation first
    ProceedWithWarning(String),
    /// Submission must not proceed
    Block(String),
}

impl QuotaDecision {
    /// Decide from a snapshot alone.
    pub fn from_snapshot(snapshot: &QuotaSnapshot) -> Self {
        let Some(limit) = snapshot.limit else {
            // No usable limit reported: ambiguous data never blocks
            return QuotaDecision::Proceed;
        };

        if snapshot.consumed >= limit {
            let mut message = format!(
                "Monthly submission quota reached ({}/{})",
                snapshot.consumed, limit
            );
            if let Some(resets_at) = snapshot.resets_at {
                message.push_str(&format!("; resets {}", resets_at.format("%Y-%m-%d")));
            }
            return QuotaDecision::Block(message);
        }

        if snapshot.consumed as u64 * WARN_RATIO_DENOMINATOR >= limit as u64 * WARN_RATIO_NUMERATOR
        {
            let remaining = limit - snapshot.consumed;
            return QuotaDecision::ProceedWithWarning(format!(
                "Only {} of {} submissions left this period",
                remaining, limit
            ));
        }

        QuotaDecision::Proceed
    }

    /// Whether submission may go ahead.
    pub fn proceed(&self) -> bool {
        !matches!(self, QuotaDecision::Block(_))
    }

    /// Warning text, if any.
    pub fn warning(&self) -> Option<&str> {
        match self {
            QuotaDecision::ProceedWithWarning(msg) => Some(msg),
            _ => None,
        }
    }

    /// Block reason, if blocked.
    pub fn block_reason(&self) -> Option<&str> {
        match self {
            QuotaDecision::Block(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Fetch a fresh usage snapshot and decide whether submission may proceed.
///
/// An unreachable usage endpoint fails open.
pub async fn check_quota(client: &ApiClient) -> QuotaDecision {
    match client.usage().await {
        Ok(payload) => QuotaDecision::from_snapshot(&payload.snapshot()),
        Err(e) => {
            warn!(error = %e, "Usage check failed, proceeding without quota gate");
            QuotaDecision::Proceed
        }
    }
}
