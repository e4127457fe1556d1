//! CallResult - Immutable outcome snapshot
//!
//! Produced exactly once per attempt that reaches a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CallRequest, ConversationState, QualificationData, Turn};
use crate::domain::services::lead_score;
use crate::domain::value_objects::{CallOutcome, CallStatus, LeadTemperature};

/// Everything observed about an attempt, handed to the outcome recorder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeSignals {
    pub request_id: Uuid,
    pub lead_id: Uuid,
    pub campaign_id: Uuid,
    pub phone: String,
    pub final_status: CallStatus,
    pub duration_secs: u64,
    pub recording_url: Option<String>,
    /// Outcome signals in the order they were observed
    pub observed: Vec<CallOutcome>,
    pub error: Option<String>,
    pub lead_score: u8,
    pub temperature: LeadTemperature,
    pub qualification: QualificationData,
    pub objections: Vec<String>,
    pub transcript: Vec<Turn>,
    pub appointment_at: Option<String>,
    pub callback_at: Option<String>,
}

impl OutcomeSignals {
    /// Signals for a request that never produced a conversation
    pub fn for_request(request: &CallRequest, final_status: CallStatus) -> Self {
        Self {
            request_id: request.id,
            lead_id: request.lead_id,
            campaign_id: request.campaign_id,
            phone: request.phone.clone(),
            final_status,
            duration_secs: 0,
            recording_url: None,
            observed: Vec::new(),
            error: None,
            lead_score: 0,
            temperature: LeadTemperature::Cold,
            qualification: QualificationData::default(),
            objections: Vec::new(),
            transcript: Vec::new(),
            appointment_at: None,
            callback_at: None,
        }
    }

    /// Signals for a request whose conversation has ended
    pub fn from_conversation(
        request: &CallRequest,
        state: &ConversationState,
        final_status: CallStatus,
        duration_secs: u64,
    ) -> Self {
        let score = lead_score(
            &state.qualification,
            state.appointment_booked,
            state.callback_scheduled,
            state.objections.len(),
        );
        Self {
            duration_secs,
            observed: state.signals.clone(),
            lead_score: score,
            temperature: state.temperature,
            qualification: state.qualification.clone(),
            objections: state.objections.clone(),
            transcript: state.transcript.clone(),
            appointment_at: state.appointment_at.clone(),
            callback_at: state.callback_at.clone(),
            ..Self::for_request(request, final_status)
        }
    }

    pub fn observe(mut self, outcome: CallOutcome) -> Self {
        if !self.observed.contains(&outcome) {
            self.observed.push(outcome);
        }
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_recording(mut self, url: Option<String>) -> Self {
        if url.is_some() {
            self.recording_url = url;
        }
        self
    }
}

/// Final record of one attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallResult {
    pub attempt_id: Uuid,
    pub request_id: Uuid,
    pub lead_id: Uuid,
    pub campaign_id: Uuid,
    pub phone: String,
    pub status: CallStatus,
    pub outcome: CallOutcome,
    pub duration_secs: u64,
    pub lead_score: u8,
    pub temperature: LeadTemperature,
    pub qualification: QualificationData,
    pub objections: Vec<String>,
    pub transcript: Vec<Turn>,
    pub recording_url: Option<String>,
    pub appointment_at: Option<String>,
    pub callback_at: Option<String>,
    pub error: Option<String>,
    pub finalized_at: DateTime<Utc>,
}

impl CallResult {
    pub fn new(attempt_id: Uuid, signals: OutcomeSignals, outcome: CallOutcome) -> Self {
        Self {
            attempt_id,
            request_id: signals.request_id,
            lead_id: signals.lead_id,
            campaign_id: signals.campaign_id,
            phone: signals.phone,
            status: signals.final_status,
            outcome,
            duration_secs: signals.duration_secs,
            lead_score: signals.lead_score,
            temperature: signals.temperature,
            qualification: signals.qualification,
            objections: signals.objections,
            transcript: signals.transcript,
            recording_url: signals.recording_url,
            appointment_at: signals.appointment_at,
            callback_at: signals.callback_at,
            error: signals.error,
            finalized_at: Utc::now(),
        }
    }

    /// Worth an immediate notification to the campaign owner
    pub fn is_hot(&self) -> bool {
        self.temperature == LeadTemperature::Hot
    }
}
