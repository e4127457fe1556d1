//! Intent - What the lead meant by a single utterance

use serde::{Deserialize, Serialize};

/// Caller intent taxonomy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Interested,
    NotInterested,
    CallbackRequest,
    AppointmentIntent,
    /// Affirmative answer ("yes", "haan", "done") to a pending proposal
    Confirmation,
    Objection,
    Question,
    Busy,
    /// Do-not-disturb / opt-out request
    DoNotCall,
    WrongNumber,
    Goodbye,
    #[default]
    Unknown,
}

impl Intent {
    /// Every label the classifier may emit, in a stable order
    pub const ALL: [Intent; 13] = [
        Intent::Greeting,
        Intent::Interested,
        Intent::NotInterested,
        Intent::CallbackRequest,
        Intent::AppointmentIntent,
        Intent::Confirmation,
        Intent::Objection,
        Intent::Question,
        Intent::Busy,
        Intent::DoNotCall,
        Intent::WrongNumber,
        Intent::Goodbye,
        Intent::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Interested => "interested",
            Intent::NotInterested => "not_interested",
            Intent::CallbackRequest => "callback_request",
            Intent::AppointmentIntent => "appointment_intent",
            Intent::Confirmation => "confirmation",
            Intent::Objection => "objection",
            Intent::Question => "question",
            Intent::Busy => "busy",
            Intent::DoNotCall => "dnd",
            Intent::WrongNumber => "wrong_number",
            Intent::Goodbye => "goodbye",
            Intent::Unknown => "unknown",
        }
    }

    /// Ends the call immediately without a closing stage
    pub fn is_hard_stop(&self) -> bool {
        matches!(self, Intent::DoNotCall | Intent::WrongNumber)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "greeting" => Ok(Intent::Greeting),
            "interested" => Ok(Intent::Interested),
            "not_interested" => Ok(Intent::NotInterested),
            "callback_request" | "callback" => Ok(Intent::CallbackRequest),
            "appointment_intent" | "appointment" => Ok(Intent::AppointmentIntent),
            "confirmation" | "confirmed" | "resolved" => Ok(Intent::Confirmation),
            "objection" => Ok(Intent::Objection),
            "question" => Ok(Intent::Question),
            "busy" => Ok(Intent::Busy),
            "dnd" | "opt_out" | "do_not_call" => Ok(Intent::DoNotCall),
            "wrong_number" => Ok(Intent::WrongNumber),
            "goodbye" => Ok(Intent::Goodbye),
            "unknown" => Ok(Intent::Unknown),
            _ => Err(format!("Unknown intent: {}", s)),
        }
    }
}

/// Which classifier tier produced an intent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    Pattern,
    Model,
    Default,
}

/// A classified intent with its confidence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IntentMatch {
    pub intent: Intent,
    pub confidence: f32,
    pub source: IntentSource,
}

impl IntentMatch {
    pub fn new(intent: Intent, confidence: f32, source: IntentSource) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            source,
        }
    }

    pub fn unknown(confidence: f32) -> Self {
        Self::new(Intent::Unknown, confidence, IntentSource::Default)
    }
}
