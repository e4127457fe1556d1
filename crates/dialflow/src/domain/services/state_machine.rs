//! Conversation transition table
//!
//! OPENING → INTRODUCTION → QUALIFICATION ⇄ OBJECTION_HANDLING →
//! {APPOINTMENT_BOOKING | CALLBACK_SCHEDULING} → CLOSING → ENDED.
//! Do-not-call and wrong-number jump straight to ENDED from any stage.

use serde::Serialize;

use crate::domain::value_objects::{CallOutcome, ConversationStage, Intent};

/// Result of applying one detected intent to a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: ConversationStage,
    pub to: ConversationStage,
    /// Outcome signal this turn contributes, if any
    pub signal: Option<CallOutcome>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    /// The lead confirmed a proposed appointment
    pub fn booked_appointment(&self) -> bool {
        self.signal == Some(CallOutcome::Appointment)
    }

    /// The lead confirmed a callback slot
    pub fn confirmed_callback(&self) -> bool {
        self.from == ConversationStage::CallbackScheduling && self.to == ConversationStage::Closing
            && self.signal == Some(CallOutcome::Callback)
    }
}

/// Apply the transition table
pub fn transition(from: ConversationStage, intent: Intent) -> Transition {
    use ConversationStage::*;

    let to = if intent.is_hard_stop() {
        Ended
    } else {
        match (from, intent) {
            (Ended, _) => Ended,

            (Opening, _) => Introduction,

            (Introduction, Intent::Interested | Intent::Confirmation) => Qualification,
            (Introduction, Intent::Objection | Intent::NotInterested) => ObjectionHandling,
            (Introduction, Intent::AppointmentIntent) => AppointmentBooking,
            (Introduction, Intent::CallbackRequest | Intent::Busy) => CallbackScheduling,
            (Introduction, Intent::Goodbye) => Closing,
            (Introduction, _) => Introduction,

            (Qualification, Intent::AppointmentIntent) => AppointmentBooking,
            (Qualification, Intent::CallbackRequest | Intent::Busy) => CallbackScheduling,
            (Qualification, Intent::Objection | Intent::NotInterested) => ObjectionHandling,
            (Qualification, Intent::Goodbye) => Closing,
            (Qualification, _) => Qualification,

            (ObjectionHandling, Intent::Interested | Intent::Confirmation) => Qualification,
            (ObjectionHandling, Intent::NotInterested | Intent::Goodbye) => Closing,
            (ObjectionHandling, Intent::AppointmentIntent) => AppointmentBooking,
            (ObjectionHandling, Intent::CallbackRequest | Intent::Busy) => CallbackScheduling,
            (ObjectionHandling, _) => ObjectionHandling,

            (AppointmentBooking, Intent::Confirmation | Intent::Goodbye) => Closing,
            (AppointmentBooking, Intent::CallbackRequest | Intent::Busy) => CallbackScheduling,
            (AppointmentBooking, Intent::NotInterested | Intent::Objection) => ObjectionHandling,
            (AppointmentBooking, _) => AppointmentBooking,

            (CallbackScheduling, Intent::Confirmation | Intent::NotInterested | Intent::Goodbye) => {
                Closing
            }
            (CallbackScheduling, Intent::AppointmentIntent) => AppointmentBooking,
            (CallbackScheduling, _) => CallbackScheduling,

            (Closing, Intent::Question) => Closing,
            (Closing, _) => Ended,
        }
    };

    Transition {
        from,
        to,
        signal: signal_for(from, intent),
    }
}

fn signal_for(from: ConversationStage, intent: Intent) -> Option<CallOutcome> {
    match (from, intent) {
        (_, Intent::DoNotCall) => Some(CallOutcome::Dnd),
        (_, Intent::WrongNumber) => Some(CallOutcome::WrongNumber),
        (ConversationStage::AppointmentBooking, Intent::Confirmation) => {
            Some(CallOutcome::Appointment)
        }
        (ConversationStage::CallbackScheduling, Intent::Confirmation) => Some(CallOutcome::Callback),
        // Agreeing to the pitch or settling an objection
        (
            ConversationStage::Introduction | ConversationStage::ObjectionHandling,
            Intent::Confirmation,
        ) => Some(CallOutcome::Interested),
        (_, Intent::CallbackRequest | Intent::Busy) => Some(CallOutcome::Callback),
        (_, Intent::Interested | Intent::AppointmentIntent) => Some(CallOutcome::Interested),
        (_, Intent::NotInterested) => Some(CallOutcome::NotInterested),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConversationStage::*;

    fn run(intents: &[Intent]) -> Vec<ConversationStage> {
        let mut stage = Opening;
        let mut path = vec![stage];
        for intent in intents {
            stage = transition(stage, *intent).to;
            path.push(stage);
        }
        path
    }

    #[test]
    fn test_happy_path_to_closing() {
        let path = run(&[
            Intent::Greeting,
            Intent::Interested,
            Intent::AppointmentIntent,
            Intent::Confirmation,
        ]);
        assert_eq!(
            path,
            vec![
                Opening,
                Introduction,
                Qualification,
                AppointmentBooking,
                Closing
            ]
        );
    }

    #[test]
    fn test_dnd_ends_from_every_stage() {
        for stage in [
            Opening,
            Introduction,
            Qualification,
            ObjectionHandling,
            AppointmentBooking,
            CallbackScheduling,
            Closing,
        ] {
            let t = transition(stage, Intent::DoNotCall);
            assert_eq!(t.to, Ended, "from {stage}");
            assert_eq!(t.signal, Some(CallOutcome::Dnd));
        }
    }

    #[test]
    fn test_wrong_number_skips_closing() {
        assert_eq!(transition(Qualification, Intent::WrongNumber).to, Ended);
        assert_eq!(transition(Opening, Intent::WrongNumber).to, Ended);
    }

    #[test]
    fn test_objection_loop() {
        assert_eq!(transition(Introduction, Intent::Objection).to, ObjectionHandling);
        assert_eq!(transition(Qualification, Intent::Objection).to, ObjectionHandling);
        assert_eq!(transition(ObjectionHandling, Intent::Objection).to, ObjectionHandling);
        assert_eq!(transition(ObjectionHandling, Intent::Confirmation).to, Qualification);
        assert_eq!(transition(ObjectionHandling, Intent::Interested).to, Qualification);
        assert_eq!(transition(ObjectionHandling, Intent::NotInterested).to, Closing);
    }

    #[test]
    fn test_callback_branch() {
        assert_eq!(transition(Qualification, Intent::CallbackRequest).to, CallbackScheduling);
        let t = transition(CallbackScheduling, Intent::Confirmation);
        assert_eq!(t.to, Closing);
        assert!(t.confirmed_callback());
    }

    #[test]
    fn test_appointment_confirmation_signal() {
        let t = transition(AppointmentBooking, Intent::Confirmation);
        assert!(t.booked_appointment());
        assert!(!transition(Qualification, Intent::Confirmation).booked_appointment());
    }

    #[test]
    fn test_agreement_signals_interest() {
        let t = transition(Introduction, Intent::Confirmation);
        assert_eq!(t.to, Qualification);
        assert_eq!(t.signal, Some(CallOutcome::Interested));
        let t = transition(ObjectionHandling, Intent::Confirmation);
        assert_eq!(t.to, Qualification);
        assert_eq!(t.signal, Some(CallOutcome::Interested));
        assert_eq!(transition(Qualification, Intent::Confirmation).signal, None);
    }

    #[test]
    fn test_goodbye_from_qualification_closes() {
        let t = transition(Qualification, Intent::Goodbye);
        assert_eq!(t.to, Closing);
        assert_eq!(t.signal, None);
    }

    #[test]
    fn test_ended_is_absorbing() {
        for intent in Intent::ALL {
            assert_eq!(transition(Ended, intent).to, Ended);
        }
    }
}
