//! Compliance DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dialflow::{DndCategory, DndRecord, DndSource};

use crate::application::ComplianceCheck;

/// Request to record a local opt-out
#[derive(Debug, Deserialize)]
pub struct AddBlockRequest {
    pub phone: String,
    pub reason: Option<String>,
}

/// Stored DND record
#[derive(Debug, Serialize)]
pub struct DndRecordResponse {
    pub phone: String,
    pub blocked: bool,
    pub category: String,
    pub source: DndSource,
    pub reason: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl DndRecordResponse {
    pub fn from_domain(record: DndRecord) -> Self {
        Self {
            phone: record.phone,
            blocked: record.blocked,
            category: record.category.to_string(),
            source: record.source,
            reason: record.reason,
            checked_at: record.checked_at,
        }
    }
}

/// Answer for `GET /dialflow/dnd/:phone`
#[derive(Debug, Serialize)]
pub struct DndStatusResponse {
    pub phone: String,
    pub blocked: bool,
    pub category: DndCategory,
    pub degraded: bool,
    pub record: Option<DndRecordResponse>,
}

impl DndStatusResponse {
    pub fn new(phone: String, check: ComplianceCheck, record: Option<DndRecord>) -> Self {
        Self {
            phone,
            blocked: check.blocked,
            category: check.category,
            degraded: check.degraded,
            record: record.map(DndRecordResponse::from_domain),
        }
    }
}
