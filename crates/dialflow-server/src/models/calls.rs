//! Call DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dialflow::{CallAttempt, CallRequest, CallStatus, LeadData};

use crate::application::{QueueDepth, StatsSnapshot};

/// Request to schedule one call (from the campaign scheduler)
#[derive(Debug, Deserialize)]
pub struct SubmitCallRequest {
    pub lead_id: Uuid,
    pub campaign_id: Uuid,
    /// Raw number; normalized to E.164 on intake
    pub phone: String,
    /// Lower dials first (default: 5)
    pub priority: Option<i32>,
    pub script_id: Option<String>,
    #[serde(default)]
    pub lead: LeadData,
    /// Do not dial before this instant
    pub not_before: Option<DateTime<Utc>>,
}

impl SubmitCallRequest {
    pub fn into_domain(self, normalized_phone: String) -> CallRequest {
        let mut request = CallRequest::new(self.lead_id, self.campaign_id, normalized_phone)
            .with_lead(self.lead);
        if let Some(priority) = self.priority {
            request = request.with_priority(priority);
        }
        if let Some(script_id) = self.script_id {
            request = request.with_script(script_id);
        }
        if let Some(at) = self.not_before {
            request = request.eligible_at(at);
        }
        request
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitCallResponse {
    pub request_id: Uuid,
    pub phone: String,
}

/// Active attempt view
#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub id: Uuid,
    pub request_id: Uuid,
    pub lead_id: Uuid,
    pub campaign_id: Uuid,
    pub status: CallStatus,
    pub provider_call_id: Option<String>,
    pub retry_count: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub live_conversation: bool,
}

impl AttemptResponse {
    pub fn from_domain(attempt: CallAttempt, live_conversation: bool) -> Self {
        Self {
            id: attempt.id,
            request_id: attempt.request.id,
            lead_id: attempt.request.lead_id,
            campaign_id: attempt.request.campaign_id,
            status: attempt.status,
            provider_call_id: attempt.provider_call_id,
            retry_count: attempt.request.retry_count,
            started_at: attempt.started_at,
            updated_at: attempt.updated_at,
            answered_at: attempt.answered_at,
            live_conversation,
        }
    }
}

/// Engine statistics
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    pub queue: QueueDepth,
    pub active_attempts: usize,
    pub live_conversations: usize,
    pub slots_in_use: usize,
    pub slots_capacity: usize,
}
