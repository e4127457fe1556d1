//! CallRequest - Intent to call one lead once
//!
//! Produced by the campaign scheduler; consumed by the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lead details used to personalise the conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeadData {
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
    /// Whatever else the lead source provided
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl LeadData {
    /// Name to address the lead by, falling back to the company
    pub fn display_name(&self) -> Option<&str> {
        self.contact_name
            .as_deref()
            .or(self.company.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// CallRequest - one pending dial for one lead
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub campaign_id: Uuid,
    /// Destination number as supplied by the lead source
    pub phone: String,
    /// Lower dequeues sooner
    pub priority: i32,
    /// Script / niche the conversation follows
    pub script_id: String,
    #[serde(default)]
    pub lead: LeadData,
    #[serde(default)]
    pub retry_count: u32,
    /// Not dispatched before this instant
    pub earliest_eligible_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CallRequest {
    /// Create a new request with default priority
    pub fn new(lead_id: Uuid, campaign_id: Uuid, phone: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lead_id,
            campaign_id,
            phone: phone.into(),
            priority: 5,
            script_id: "default".to_string(),
            lead: LeadData::default(),
            retry_count: 0,
            earliest_eligible_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_script(mut self, script_id: impl Into<String>) -> Self {
        self.script_id = script_id.into();
        self
    }

    pub fn with_lead(mut self, lead: LeadData) -> Self {
        self.lead = lead;
        self
    }

    pub fn eligible_at(mut self, at: DateTime<Utc>) -> Self {
        self.earliest_eligible_at = Some(at);
        self
    }

    /// Whether the request may be dialed at `now`
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.earliest_eligible_at.map_or(true, |at| at <= now)
    }
}
