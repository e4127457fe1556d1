//! CallOutcome - Terminal classification of a finished call

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Appointment,
    Callback,
    Interested,
    NotInterested,
    Dnd,
    WrongNumber,
    NoAnswer,
    Failed,
}

impl CallOutcome {
    /// Rank among conversational signals; higher wins when several are observed.
    ///
    /// Only the five outcomes that compete by precedence have a rank.
    pub fn precedence(&self) -> Option<u8> {
        match self {
            CallOutcome::Appointment => Some(5),
            CallOutcome::Callback => Some(4),
            CallOutcome::Interested => Some(3),
            CallOutcome::NotInterested => Some(2),
            CallOutcome::NoAnswer => Some(1),
            CallOutcome::Dnd | CallOutcome::WrongNumber | CallOutcome::Failed => None,
        }
    }

    /// Counts against the campaign's failure-rate signal
    pub fn is_failure(&self) -> bool {
        matches!(self, CallOutcome::Failed)
    }
}

impl std::fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallOutcome::Appointment => write!(f, "appointment"),
            CallOutcome::Callback => write!(f, "callback"),
            CallOutcome::Interested => write!(f, "interested"),
            CallOutcome::NotInterested => write!(f, "not_interested"),
            CallOutcome::Dnd => write!(f, "dnd"),
            CallOutcome::WrongNumber => write!(f, "wrong_number"),
            CallOutcome::NoAnswer => write!(f, "no_answer"),
            CallOutcome::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for CallOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "appointment" => Ok(CallOutcome::Appointment),
            "callback" => Ok(CallOutcome::Callback),
            "interested" => Ok(CallOutcome::Interested),
            "not_interested" => Ok(CallOutcome::NotInterested),
            "dnd" => Ok(CallOutcome::Dnd),
            "wrong_number" => Ok(CallOutcome::WrongNumber),
            "no_answer" => Ok(CallOutcome::NoAnswer),
            "failed" => Ok(CallOutcome::Failed),
            _ => Err(format!("Unknown call outcome: {}", s)),
        }
    }
}
