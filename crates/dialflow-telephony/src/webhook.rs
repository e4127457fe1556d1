//! Vendor callback translation
//!
//! Status callbacks arrive as form fields whose names differ per vendor.
//! They are reduced here to a [`ProviderEvent`] so nothing vendor-shaped
//! reaches the dispatcher.

use std::collections::HashMap;

use dialflow::{CallStatus, ProviderEvent};
use uuid::Uuid;

use crate::error::TelephonyError;

/// Callback source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Twilio,
    Exotel,
    Null,
}

impl std::str::FromStr for Provider {
    type Err = TelephonyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twilio" => Ok(Provider::Twilio),
            "exotel" => Ok(Provider::Exotel),
            "null" => Ok(Provider::Null),
            other => Err(TelephonyError::InvalidCallback(format!(
                "unknown provider: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Twilio => write!(f, "twilio"),
            Provider::Exotel => write!(f, "exotel"),
            Provider::Null => write!(f, "null"),
        }
    }
}

/// Translate a status callback into a provider event.
///
/// `query_attempt` is the `attempt_id` query parameter, which every adapter
/// appends to its callback URL; Exotel also echoes it in `CustomField`.
pub fn translate_status(
    provider: Provider,
    fields: &HashMap<String, String>,
    query_attempt: Option<Uuid>,
) -> Result<ProviderEvent, TelephonyError> {
    let attempt_id = query_attempt
        .or_else(|| field(fields, &["CustomField", "attempt_id"]).and_then(|v| v.parse().ok()))
        .ok_or_else(|| TelephonyError::InvalidCallback("missing attempt_id".to_string()))?;

    let (status_keys, duration_keys, recording_keys, sid_keys): (
        &[&str],
        &[&str],
        &[&str],
        &[&str],
    ) = match provider {
        Provider::Twilio => (
            &["CallStatus"],
            &["CallDuration", "Duration"],
            &["RecordingUrl"],
            &["CallSid"],
        ),
        Provider::Exotel => (
            &["Status", "CallStatus"],
            &["ConversationDuration", "DialCallDuration", "Duration"],
            &["RecordingUrl"],
            &["CallSid"],
        ),
        Provider::Null => (&["status"], &["duration"], &["recording_url"], &["call_id"]),
    };

    let raw_status = field(fields, status_keys)
        .ok_or_else(|| TelephonyError::InvalidCallback("missing status".to_string()))?;
    let mut status: CallStatus = raw_status
        .parse()
        .map_err(TelephonyError::InvalidCallback)?;

    // Answering machines are reported as answered calls
    if provider == Provider::Twilio
        && field(fields, &["AnsweredBy"]).is_some_and(|by| by.starts_with("machine"))
    {
        status = CallStatus::Voicemail;
    }

    let mut event = ProviderEvent::new(attempt_id, status);
    if let Some(secs) = field(fields, duration_keys).and_then(|d| d.parse::<u64>().ok()) {
        event = event.with_duration(secs);
    }
    if let Some(url) = field(fields, recording_keys) {
        event = event.with_recording(url);
    }
    if let Some(sid) = field(fields, sid_keys) {
        event = event.with_provider_call_id(sid);
    }
    Ok(event)
}

/// Transcribed lead speech carried by a speech callback, if any
pub fn speech_text(provider: Provider, fields: &HashMap<String, String>) -> Option<String> {
    let keys: &[&str] = match provider {
        Provider::Twilio => &["SpeechResult"],
        Provider::Exotel => &["Transcript", "text"],
        Provider::Null => &["text"],
    };
    field(fields, keys).map(str::to_string)
}

fn field<'a>(fields: &'a HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| fields.get(*k))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_twilio_completed() {
        let attempt_id = Uuid::new_v4();
        let event = translate_status(
            Provider::Twilio,
            &fields(&[
                ("CallSid", "CA1"),
                ("CallStatus", "completed"),
                ("CallDuration", "63"),
                ("RecordingUrl", "https://api.twilio.com/rec/RE1"),
            ]),
            Some(attempt_id),
        )
        .unwrap();

        assert_eq!(event.attempt_id, attempt_id);
        assert_eq!(event.status, CallStatus::Completed);
        assert_eq!(event.duration_secs, Some(63));
        assert_eq!(event.recording_url.as_deref(), Some("https://api.twilio.com/rec/RE1"));
        assert_eq!(event.provider_call_id.as_deref(), Some("CA1"));
    }

    #[test]
    fn test_twilio_vendor_statuses() {
        let attempt_id = Uuid::new_v4();
        for (raw, expected) in [
            ("no-answer", CallStatus::NoAnswer),
            ("in-progress", CallStatus::InProgress),
            ("busy", CallStatus::Busy),
            ("canceled", CallStatus::Failed),
        ] {
            let event = translate_status(
                Provider::Twilio,
                &fields(&[("CallStatus", raw)]),
                Some(attempt_id),
            )
            .unwrap();
            assert_eq!(event.status, expected, "{}", raw);
        }
    }

    #[test]
    fn test_twilio_machine_is_voicemail() {
        let event = translate_status(
            Provider::Twilio,
            &fields(&[("CallStatus", "in-progress"), ("AnsweredBy", "machine_start")]),
            Some(Uuid::new_v4()),
        )
        .unwrap();
        assert_eq!(event.status, CallStatus::Voicemail);
    }

    #[test]
    fn test_exotel_attempt_from_custom_field() {
        let attempt_id = Uuid::new_v4();
        let custom = attempt_id.to_string();
        let event = translate_status(
            Provider::Exotel,
            &fields(&[
                ("CallSid", "ex1"),
                ("Status", "no-answer"),
                ("CustomField", custom.as_str()),
                ("ConversationDuration", "0"),
            ]),
            None,
        )
        .unwrap();
        assert_eq!(event.attempt_id, attempt_id);
        assert_eq!(event.status, CallStatus::NoAnswer);
        assert_eq!(event.duration_secs, Some(0));
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert!(translate_status(Provider::Twilio, &fields(&[("CallStatus", "ringing")]), None).is_err());
        assert!(translate_status(Provider::Twilio, &fields(&[]), Some(Uuid::new_v4())).is_err());
        assert!(translate_status(
            Provider::Twilio,
            &fields(&[("CallStatus", "exploded")]),
            Some(Uuid::new_v4())
        )
        .is_err());
    }

    #[test]
    fn test_speech_text() {
        assert_eq!(
            speech_text(Provider::Twilio, &fields(&[("SpeechResult", " haan batao ")])).as_deref(),
            Some("haan batao")
        );
        assert_eq!(speech_text(Provider::Twilio, &fields(&[("SpeechResult", "")])), None);
        assert_eq!("EXOTEL".parse::<Provider>().unwrap(), Provider::Exotel);
    }
}
