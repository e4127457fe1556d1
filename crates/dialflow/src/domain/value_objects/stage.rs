//! Conversation and qualification stages

use serde::{Deserialize, Serialize};

/// Stage of the per-call conversation state machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    #[default]
    Opening,
    Introduction,
    Qualification,
    ObjectionHandling,
    AppointmentBooking,
    CallbackScheduling,
    Closing,
    Ended,
}

impl ConversationStage {
    pub fn is_ended(&self) -> bool {
        matches!(self, ConversationStage::Ended)
    }
}

impl std::fmt::Display for ConversationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationStage::Opening => write!(f, "opening"),
            ConversationStage::Introduction => write!(f, "introduction"),
            ConversationStage::Qualification => write!(f, "qualification"),
            ConversationStage::ObjectionHandling => write!(f, "objection_handling"),
            ConversationStage::AppointmentBooking => write!(f, "appointment_booking"),
            ConversationStage::CallbackScheduling => write!(f, "callback_scheduling"),
            ConversationStage::Closing => write!(f, "closing"),
            ConversationStage::Ended => write!(f, "ended"),
        }
    }
}

/// Progress through BANT-style qualification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum QualificationStage {
    #[default]
    NotStarted,
    DecisionMaker,
    Situation,
    PainPoints,
    Budget,
    Timeline,
    Complete,
}

impl std::fmt::Display for QualificationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualificationStage::NotStarted => write!(f, "not_started"),
            QualificationStage::DecisionMaker => write!(f, "decision_maker"),
            QualificationStage::Situation => write!(f, "situation"),
            QualificationStage::PainPoints => write!(f, "pain_points"),
            QualificationStage::Budget => write!(f, "budget"),
            QualificationStage::Timeline => write!(f, "timeline"),
            QualificationStage::Complete => write!(f, "complete"),
        }
    }
}
