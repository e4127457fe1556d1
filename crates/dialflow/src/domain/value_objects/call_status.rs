//! CallStatus - Lifecycle of a single dial

use serde::{Deserialize, Serialize};

/// Status of a call attempt as seen by the telephony provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Failed,
    NoAnswer,
    Busy,
    Voicemail,
}

impl CallStatus {
    /// The provider will send no further updates for this attempt
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Completed
                | CallStatus::Failed
                | CallStatus::NoAnswer
                | CallStatus::Busy
                | CallStatus::Voicemail
        )
    }

    /// Dialed but not yet answered
    pub fn is_pending_answer(&self) -> bool {
        matches!(self, CallStatus::Initiated | CallStatus::Ringing)
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallStatus::Initiated => write!(f, "initiated"),
            CallStatus::Ringing => write!(f, "ringing"),
            CallStatus::InProgress => write!(f, "in_progress"),
            CallStatus::Completed => write!(f, "completed"),
            CallStatus::Failed => write!(f, "failed"),
            CallStatus::NoAnswer => write!(f, "no_answer"),
            CallStatus::Busy => write!(f, "busy"),
            CallStatus::Voicemail => write!(f, "voicemail"),
        }
    }
}

impl std::str::FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "initiated" | "queued" => Ok(CallStatus::Initiated),
            "ringing" => Ok(CallStatus::Ringing),
            "in_progress" | "answered" => Ok(CallStatus::InProgress),
            "completed" => Ok(CallStatus::Completed),
            "failed" | "canceled" | "cancelled" => Ok(CallStatus::Failed),
            "no_answer" => Ok(CallStatus::NoAnswer),
            "busy" => Ok(CallStatus::Busy),
            "voicemail" | "machine" => Ok(CallStatus::Voicemail),
            _ => Err(format!("Unknown call status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(CallStatus::Completed.is_terminal());
        assert!(CallStatus::Voicemail.is_terminal());
        assert!(!CallStatus::Ringing.is_terminal());
        assert!(!CallStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_parse_vendor_spellings() {
        assert_eq!("no-answer".parse::<CallStatus>(), Ok(CallStatus::NoAnswer));
        assert_eq!("in-progress".parse::<CallStatus>(), Ok(CallStatus::InProgress));
        assert_eq!("queued".parse::<CallStatus>(), Ok(CallStatus::Initiated));
        assert!("exploded".parse::<CallStatus>().is_err());
    }
}
