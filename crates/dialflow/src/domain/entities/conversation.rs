//! ConversationState - Per-live-call mutable context
//!
//! Owned by exactly one call task for the lifetime of the call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::QualificationData;
use crate::domain::value_objects::{CallOutcome, ConversationStage, Intent, LeadTemperature};

/// Who spoke a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Agent,
    Lead,
}

/// One utterance in the transcript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    /// Detected intent (lead turns only)
    pub intent: Option<Intent>,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Agent,
            text: text.into(),
            intent: None,
            at: Utc::now(),
        }
    }

    pub fn lead(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Lead,
            text: text.into(),
            intent: None,
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub attempt_id: Uuid,
    pub lead_id: Uuid,
    pub stage: ConversationStage,
    /// Lead turns processed so far
    pub turn_count: u32,
    pub transcript: Vec<Turn>,
    pub qualification: QualificationData,
    pub objections: Vec<String>,
    pub appointment_booked: bool,
    pub appointment_at: Option<String>,
    pub callback_scheduled: bool,
    pub callback_at: Option<String>,
    pub consecutive_errors: u32,
    pub temperature: LeadTemperature,
    /// Outcome signals observed so far, in arrival order
    pub signals: Vec<CallOutcome>,
    pub started_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(attempt_id: Uuid, lead_id: Uuid) -> Self {
        Self {
            attempt_id,
            lead_id,
            stage: ConversationStage::Opening,
            turn_count: 0,
            transcript: Vec::new(),
            qualification: QualificationData::default(),
            objections: Vec::new(),
            appointment_booked: false,
            appointment_at: None,
            callback_scheduled: false,
            callback_at: None,
            consecutive_errors: 0,
            temperature: LeadTemperature::Cold,
            signals: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Append a lead utterance and return its index
    pub fn push_lead_turn(&mut self, text: impl Into<String>) -> usize {
        self.transcript.push(Turn::lead(text));
        self.turn_count += 1;
        self.transcript.len() - 1
    }

    pub fn push_agent_turn(&mut self, text: impl Into<String>) {
        self.transcript.push(Turn::agent(text));
    }

    /// Tag a previously recorded lead turn with its intent
    pub fn tag_intent(&mut self, index: usize, intent: Intent) {
        if let Some(turn) = self.transcript.get_mut(index) {
            turn.intent = Some(intent);
        }
    }

    pub fn observe(&mut self, outcome: CallOutcome) {
        if !self.signals.contains(&outcome) {
            self.signals.push(outcome);
        }
    }

    /// Last `n` turns, oldest first
    pub fn recent_turns(&self, n: usize) -> &[Turn] {
        let start = self.transcript.len().saturating_sub(n);
        &self.transcript[start..]
    }

    pub fn intents_seen(&self) -> impl Iterator<Item = Intent> + '_ {
        self.transcript.iter().filter_map(|t| t.intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_turns_window() {
        let mut state = ConversationState::new(Uuid::new_v4(), Uuid::new_v4());
        state.push_agent_turn("Namaste!");
        state.push_lead_turn("haan boliye");
        state.push_agent_turn("I'm calling from Acme.");
        assert_eq!(state.recent_turns(2).len(), 2);
        assert_eq!(state.recent_turns(2)[0].text, "haan boliye");
        assert_eq!(state.recent_turns(10).len(), 3);
        assert_eq!(state.turn_count, 1);
    }

    #[test]
    fn test_signals_are_deduplicated() {
        let mut state = ConversationState::new(Uuid::new_v4(), Uuid::new_v4());
        state.observe(CallOutcome::Interested);
        state.observe(CallOutcome::Interested);
        assert_eq!(state.signals, vec![CallOutcome::Interested]);
    }
}
