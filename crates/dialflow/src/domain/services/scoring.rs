//! Lead score and temperature
//!
//! A weighted heuristic read by the campaign layer to flag hot leads.

use crate::domain::entities::QualificationData;
use crate::domain::value_objects::{CallOutcome, LeadTemperature};

const DECISION_MAKER_CONFIRMED: i32 = 25;
const DECISION_MAKER_REACHABLE: i32 = 10;
const BUDGET_PRESENT: i32 = 25;
const TIMELINE_PRESENT: i32 = 20;
const TIMELINE_URGENT: i32 = 10;
const PAIN_POINTS_PRESENT: i32 = 15;
const APPOINTMENT_BOOKED: i32 = 30;
const CALLBACK_SCHEDULED: i32 = 15;
const OBJECTION_PENALTY: i32 = 5;

/// Score in [0, 100]
pub fn lead_score(
    qualification: &QualificationData,
    appointment_booked: bool,
    callback_scheduled: bool,
    objection_count: usize,
) -> u8 {
    let mut score: i32 = 0;

    score += match qualification.is_decision_maker {
        Some(true) => DECISION_MAKER_CONFIRMED,
        Some(false) => DECISION_MAKER_REACHABLE,
        None => 0,
    };
    if qualification.budget.is_some() {
        score += BUDGET_PRESENT;
    }
    if qualification.timeline.is_some() {
        score += TIMELINE_PRESENT;
        if qualification.timeline_is_urgent() {
            score += TIMELINE_URGENT;
        }
    }
    if qualification.pain_points.is_some() {
        score += PAIN_POINTS_PRESENT;
    }
    if appointment_booked {
        score += APPOINTMENT_BOOKED;
    }
    if callback_scheduled {
        score += CALLBACK_SCHEDULED;
    }

    let penalty = i32::try_from(objection_count)
        .unwrap_or(i32::MAX)
        .saturating_mul(OBJECTION_PENALTY);
    score = score.saturating_sub(penalty);

    score.clamp(0, 100) as u8
}

/// Coarse temperature from observed signals and score
pub fn lead_temperature(signals: &[CallOutcome], score: u8) -> LeadTemperature {
    if signals
        .iter()
        .any(|s| matches!(s, CallOutcome::Dnd | CallOutcome::WrongNumber))
    {
        return LeadTemperature::Dead;
    }

    let best = signals
        .iter()
        .filter_map(|s| s.precedence().map(|p| (p, *s)))
        .max_by_key(|(p, _)| *p)
        .map(|(_, s)| s);

    match best {
        Some(CallOutcome::Appointment) => LeadTemperature::Hot,
        _ if score >= 70 => LeadTemperature::Hot,
        Some(CallOutcome::Callback | CallOutcome::Interested) => LeadTemperature::Warm,
        _ if score >= 40 => LeadTemperature::Warm,
        Some(CallOutcome::NotInterested) => LeadTemperature::Dead,
        _ => LeadTemperature::Cold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn full() -> QualificationData {
        let mut q = QualificationData::default();
        q.set_decision_maker(true);
        q.set_current_provider("Justdial");
        q.set_pain_points("not enough patients");
        q.set_budget("30k");
        q.set_timeline("urgent");
        q
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(lead_score(&QualificationData::default(), false, false, 0), 0);
    }

    #[test]
    fn test_saturates_at_hundred() {
        assert_eq!(lead_score(&full(), true, false, 0), 100);
    }

    #[test]
    fn test_weights() {
        let mut q = QualificationData::default();
        q.set_decision_maker(false);
        assert_eq!(lead_score(&q, false, false, 0), 10);
        q.set_budget("10k");
        assert_eq!(lead_score(&q, false, false, 0), 35);
        q.set_timeline("next month");
        assert_eq!(lead_score(&q, false, true, 0), 70);
        assert_eq!(lead_score(&q, false, true, 2), 60);
    }

    #[test]
    fn test_objections_cannot_go_negative() {
        assert_eq!(lead_score(&QualificationData::default(), false, false, 50), 0);
    }

    #[test]
    fn test_temperature() {
        assert_eq!(
            lead_temperature(&[CallOutcome::Interested, CallOutcome::Dnd], 90),
            LeadTemperature::Dead
        );
        assert_eq!(
            lead_temperature(&[CallOutcome::Appointment], 0),
            LeadTemperature::Hot
        );
        assert_eq!(
            lead_temperature(&[CallOutcome::Interested], 10),
            LeadTemperature::Warm
        );
        assert_eq!(
            lead_temperature(&[CallOutcome::NotInterested], 0),
            LeadTemperature::Dead
        );
        assert_eq!(lead_temperature(&[], 0), LeadTemperature::Cold);
    }

    fn arb_qualification() -> impl Strategy<Value = QualificationData> {
        (
            proptest::option::of(any::<bool>()),
            proptest::option::of("[a-z ]{1,12}"),
            proptest::option::of("[a-z ]{1,12}"),
            proptest::option::of("[a-z0-9 ]{1,12}"),
            proptest::option::of("(urgent|next week|[a-z ]{1,12})"),
        )
            .prop_map(|(dm, provider, pain, budget, timeline)| {
                let mut q = QualificationData::default();
                if let Some(dm) = dm {
                    q.set_decision_maker(dm);
                }
                if let Some(v) = provider {
                    q.set_current_provider(v);
                }
                if let Some(v) = pain {
                    q.set_pain_points(v);
                }
                if let Some(v) = budget {
                    q.set_budget(v);
                }
                if let Some(v) = timeline {
                    q.set_timeline(v);
                }
                q
            })
    }

    proptest! {
        #[test]
        fn prop_score_is_bounded_and_deterministic(
            q in arb_qualification(),
            booked in any::<bool>(),
            callback in any::<bool>(),
            objections in 0usize..40,
        ) {
            let first = lead_score(&q, booked, callback, objections);
            let second = lead_score(&q.clone(), booked, callback, objections);
            prop_assert_eq!(first, second);
            prop_assert!(first <= 100);
        }
    }
}
