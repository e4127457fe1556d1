//! DndRecord - Cached do-not-call answer for one number

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::DndCategory;

/// Where a DND answer came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DndSource {
    Registry,
    /// Recorded locally (opt-out during a call or by an operator); never expires
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DndRecord {
    pub phone: String,
    pub blocked: bool,
    pub category: DndCategory,
    pub source: DndSource,
    pub reason: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl DndRecord {
    pub fn from_registry(phone: impl Into<String>, blocked: bool, category: DndCategory) -> Self {
        Self {
            phone: phone.into(),
            blocked,
            category,
            source: DndSource::Registry,
            reason: None,
            checked_at: Utc::now(),
        }
    }

    pub fn local_block(phone: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            blocked: true,
            category: DndCategory::UserRequested,
            source: DndSource::Local,
            reason: Some(reason.into()),
            checked_at: Utc::now(),
        }
    }

    /// Registry answers expire after `ttl`; local blocks never do
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.source {
            DndSource::Local => true,
            DndSource::Registry => now - self.checked_at < ttl,
        }
    }
}
