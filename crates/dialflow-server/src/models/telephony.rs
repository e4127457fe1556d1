//! Vendor callback DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dialflow::{ConversationStage, Intent};

use crate::application::AgentReply;

/// Query string every adapter appends to its callback URLs
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub attempt_id: Option<Uuid>,
}

/// Agent utterance for vendors that synthesize speech themselves
#[derive(Debug, Serialize)]
pub struct SpeechReplyResponse {
    pub attempt_id: Uuid,
    pub text: String,
    pub stage: ConversationStage,
    pub intent: Option<Intent>,
    pub hangup: bool,
}

impl SpeechReplyResponse {
    pub fn from_reply(attempt_id: Uuid, reply: AgentReply) -> Self {
        Self {
            attempt_id,
            text: reply.text,
            stage: reply.stage,
            intent: reply.intent,
            hangup: reply.ended,
        }
    }
}
