//! Outcome derivation
//!
//! Picks the terminal outcome from everything observed during an attempt.
//! Compliance stops (dnd, wrong number) and explicit failures win outright;
//! otherwise the best conversational signal wins, not the last one.

use crate::domain::entities::OutcomeSignals;
use crate::domain::value_objects::{CallOutcome, CallStatus};

pub fn derive_outcome(signals: &OutcomeSignals) -> CallOutcome {
    for overriding in [CallOutcome::Dnd, CallOutcome::WrongNumber, CallOutcome::Failed] {
        if signals.observed.contains(&overriding) {
            return overriding;
        }
    }

    let best = signals
        .observed
        .iter()
        .filter_map(|s| s.precedence().map(|p| (p, *s)))
        .max_by_key(|(p, _)| *p)
        .map(|(_, s)| s);

    if let Some(outcome) = best {
        return outcome;
    }

    match signals.final_status {
        CallStatus::NoAnswer | CallStatus::Busy | CallStatus::Voicemail => CallOutcome::NoAnswer,
        CallStatus::Failed | CallStatus::Initiated | CallStatus::Ringing => CallOutcome::Failed,
        // Answered but nothing conclusive was said
        CallStatus::InProgress | CallStatus::Completed => CallOutcome::NotInterested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::CallRequest;
    use uuid::Uuid;

    fn signals(status: CallStatus, observed: &[CallOutcome]) -> OutcomeSignals {
        let request = CallRequest::new(Uuid::new_v4(), Uuid::new_v4(), "+919800000004");
        observed
            .iter()
            .fold(OutcomeSignals::for_request(&request, status), |s, o| s.observe(*o))
    }

    #[test]
    fn test_best_signal_wins_not_last() {
        let s = signals(
            CallStatus::Completed,
            &[
                CallOutcome::Interested,
                CallOutcome::Appointment,
                CallOutcome::NotInterested,
            ],
        );
        assert_eq!(derive_outcome(&s), CallOutcome::Appointment);
    }

    #[test]
    fn test_callback_beats_interested() {
        let s = signals(
            CallStatus::Completed,
            &[CallOutcome::Interested, CallOutcome::Callback],
        );
        assert_eq!(derive_outcome(&s), CallOutcome::Callback);
    }

    #[test]
    fn test_dnd_overrides_everything() {
        let s = signals(
            CallStatus::Completed,
            &[CallOutcome::Appointment, CallOutcome::Dnd],
        );
        assert_eq!(derive_outcome(&s), CallOutcome::Dnd);
    }

    #[test]
    fn test_forced_failure_overrides_interest() {
        let s = signals(
            CallStatus::Completed,
            &[CallOutcome::Interested, CallOutcome::Failed],
        );
        assert_eq!(derive_outcome(&s), CallOutcome::Failed);
    }

    #[test]
    fn test_status_fallbacks() {
        assert_eq!(derive_outcome(&signals(CallStatus::Busy, &[])), CallOutcome::NoAnswer);
        assert_eq!(derive_outcome(&signals(CallStatus::Failed, &[])), CallOutcome::Failed);
        assert_eq!(
            derive_outcome(&signals(CallStatus::Completed, &[])),
            CallOutcome::NotInterested
        );
    }
}
