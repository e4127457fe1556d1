//! Dial retry policy
//!
//! Linear backoff bounded by a maximum number of dial attempts, demoting the
//! request's priority on every retry so fresh requests are not starved.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::CallRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total dial attempts allowed per request, including the first
    pub max_retries: u32,
    /// Multiplied by the retry number for the next eligible time
    pub retry_delay_secs: i64,
    /// Added to the priority value on each retry (clamped to at least 1)
    pub demotion_step: i32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_secs: 30 * 60,
            demotion_step: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RetryDecision {
    /// Re-enqueue this (updated) request
    Retry(CallRequest),
    /// Attempts exhausted; finalize as failed
    GiveUp(CallRequest),
}

impl RetryPolicy {
    pub fn decide(&self, mut request: CallRequest, now: DateTime<Utc>) -> RetryDecision {
        let attempts_made = request.retry_count + 1;
        if attempts_made >= self.max_retries {
            return RetryDecision::GiveUp(request);
        }

        request.retry_count += 1;
        request.priority = request.priority.saturating_add(self.demotion_step.max(1));
        request.earliest_eligible_at =
            Some(now + Duration::seconds(self.retry_delay_secs * i64::from(request.retry_count)));
        RetryDecision::Retry(request)
    }
}
