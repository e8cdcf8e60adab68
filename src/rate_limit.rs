//! Sliding-Window Rate Limiter
//!
//! Admits at most `limit` events per identity within any `window` ending now.
//! Each check runs the driver's atomic window sequence once. If the backend
//! fails mid-check the request is admitted: the limiter must never turn a
//! store outage into a traffic outage.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error};

use crate::client::KvClient;

/// Key namespace for window records.
pub const RATE_LIMIT_PREFIX: &str = "ratelimit:";

// == Decision ==
/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Further requests admissible in the current window
    pub remaining: u32,
    /// Unix time in milliseconds when the current window ends
    pub reset_at_ms: i64,
}

// == Rate Limiter ==
#[derive(Clone, Debug)]
pub struct RateLimiter {
    client: Arc<KvClient>,
}

impl RateLimiter {
    pub fn new(client: Arc<KvClient>) -> Self {
        Self { client }
    }

    /// Records one event for `identity` and decides whether it is admitted.
    ///
    /// A `limit` of zero denies everything without touching the backend.
    pub async fn check(&self, identity: &str, limit: u32, window_seconds: u64) -> RateLimitDecision {
        let now = Utc::now().timestamp_millis();
        let window_ms = i64::try_from(window_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        let reset_at_ms = now.saturating_add(window_ms);

        if limit == 0 {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at_ms,
            };
        }

        let key = format!("{}{}", RATE_LIMIT_PREFIX, identity);
        let member = format!("{}-{}", now, rand::random::<u64>());
        let driver = self.client.connect().await;

        match driver.slide_window(&key, now, window_ms, &member).await {
            Ok(count) => {
                let decision = decide(count, limit, reset_at_ms);
                debug!(
                    identity = identity,
                    count = count,
                    allowed = decision.allowed,
                    "Rate limit check"
                );
                decision
            }
            Err(e) => {
                error!(
                    identity = identity,
                    backend = %driver.kind(),
                    error = %e,
                    "Rate limit check failed, allowing request"
                );
                RateLimitDecision {
                    allowed: true,
                    remaining: limit.saturating_sub(1),
                    reset_at_ms,
                }
            }
        }
    }
}

/// Applies the limit to the count observed before this event was recorded.
fn decide(count_before: u64, limit: u32, reset_at_ms: i64) -> RateLimitDecision {
    let limit = u64::from(limit);
    RateLimitDecision {
        allowed: count_before < limit,
        remaining: u32::try_from(limit.saturating_sub(count_before).saturating_sub(1))
            .unwrap_or(u32::MAX),
        reset_at_ms,
    }
}
