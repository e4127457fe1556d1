//! CallAttempt - One concrete dial

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CallRequest;
use crate::domain::value_objects::CallStatus;

/// CallAttempt - record of a single dial placed through a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAttempt {
    pub id: Uuid,
    pub request: CallRequest,
    pub status: CallStatus,
    /// Provider-assigned identifier (call SID etc.)
    pub provider_call_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl CallAttempt {
    /// Create a new attempt for a request, before the provider has been asked
    pub fn new(id: Uuid, request: CallRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            request,
            status: CallStatus::Initiated,
            provider_call_id: None,
            started_at: now,
            updated_at: now,
            answered_at: None,
            error: None,
        }
    }

    /// Record the provider's call identifier
    pub fn placed(mut self, provider_call_id: impl Into<String>) -> Self {
        self.provider_call_id = Some(provider_call_id.into());
        self
    }

    /// Apply a provider status update.
    ///
    /// Updates only move forward (initiated → ringing → in progress → terminal);
    /// late or duplicate callbacks are ignored. Returns whether the status changed.
    pub fn apply_status(&mut self, status: CallStatus) -> bool {
        if status_rank(status) <= status_rank(self.status) {
            return false;
        }
        let now = Utc::now();
        if status == CallStatus::InProgress {
            self.answered_at = Some(now);
        }
        self.status = status;
        self.updated_at = now;
        true
    }

    /// Mark as failed with an error description
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.apply_status(CallStatus::Failed);
    }

    /// Seconds since the attempt was created
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds()
    }

    /// Seconds the call has been connected, if it was answered
    pub fn talk_time_secs(&self, now: DateTime<Utc>) -> u64 {
        self.answered_at
            .map(|at| (now - at).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }
}

fn status_rank(status: CallStatus) -> u8 {
    match status {
        CallStatus::Initiated => 0,
        CallStatus::Ringing => 1,
        CallStatus::InProgress => 2,
        _ => 3,
    }
}
