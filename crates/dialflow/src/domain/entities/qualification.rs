//! QualificationData - BANT fields gathered during a call
//!
//! Every field is write-once for the lifetime of a conversation: the first
//! non-empty value wins and later mentions are ignored.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::QualificationStage;

const URGENT_MARKERS: [&str; 7] = [
    "urgent",
    "asap",
    "immediately",
    "right away",
    "jaldi",
    "turant",
    "तुरंत",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualificationData {
    /// `Some(true)` confirmed decision maker, `Some(false)` can reach one
    pub is_decision_maker: Option<bool>,
    pub current_provider: Option<String>,
    pub pain_points: Option<String>,
    pub budget: Option<String>,
    pub timeline: Option<String>,
    pub stage: QualificationStage,
}

impl QualificationData {
    pub fn set_decision_maker(&mut self, confirmed: bool) -> bool {
        if self.is_decision_maker.is_some() {
            return false;
        }
        self.is_decision_maker = Some(confirmed);
        self.refresh_stage();
        true
    }

    pub fn set_current_provider(&mut self, provider: impl Into<String>) -> bool {
        let changed = set_once(&mut self.current_provider, provider.into());
        self.refresh_stage();
        changed
    }

    pub fn set_pain_points(&mut self, pain_points: impl Into<String>) -> bool {
        let changed = set_once(&mut self.pain_points, pain_points.into());
        self.refresh_stage();
        changed
    }

    pub fn set_budget(&mut self, budget: impl Into<String>) -> bool {
        let changed = set_once(&mut self.budget, budget.into());
        self.refresh_stage();
        changed
    }

    pub fn set_timeline(&mut self, timeline: impl Into<String>) -> bool {
        let changed = set_once(&mut self.timeline, timeline.into());
        self.refresh_stage();
        changed
    }

    /// Merge another snapshot in, keeping every value already present
    pub fn merge(&mut self, other: &QualificationData) {
        if let Some(dm) = other.is_decision_maker {
            self.set_decision_maker(dm);
        }
        if let Some(v) = &other.current_provider {
            self.set_current_provider(v.clone());
        }
        if let Some(v) = &other.pain_points {
            self.set_pain_points(v.clone());
        }
        if let Some(v) = &other.budget {
            self.set_budget(v.clone());
        }
        if let Some(v) = &other.timeline {
            self.set_timeline(v.clone());
        }
    }

    pub fn timeline_is_urgent(&self) -> bool {
        self.timeline.as_deref().is_some_and(|t| {
            let lower = t.to_lowercase();
            URGENT_MARKERS.iter().any(|m| lower.contains(m))
        })
    }

    /// Next field still to ask about
    fn refresh_stage(&mut self) {
        let filled = [
            (QualificationStage::DecisionMaker, self.is_decision_maker.is_some()),
            (QualificationStage::Situation, self.current_provider.is_some()),
            (QualificationStage::PainPoints, self.pain_points.is_some()),
            (QualificationStage::Budget, self.budget.is_some()),
            (QualificationStage::Timeline, self.timeline.is_some()),
        ];

        if filled.iter().all(|(_, f)| !f) {
            self.stage = QualificationStage::NotStarted;
            return;
        }

        self.stage = filled
            .iter()
            .find(|(_, f)| !f)
            .map(|(stage, _)| *stage)
            .unwrap_or(QualificationStage::Complete);
    }
}

fn set_once(slot: &mut Option<String>, value: String) -> bool {
    let value = value.trim();
    if slot.is_some() || value.is_empty() {
        return false;
    }
    *slot = Some(value.to_string());
    true
}
