//! Compliance Gate
//!
//! Answers "may this number be called?" from the local DND cache, falling
//! back to the upstream registry on a miss. Local opt-outs always win and
//! never expire. When the registry cannot be reached the check fails open.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dialflow::{
    ComplianceRegistry, DndCategory, DndRecord, DndRepository, DndSource, DomainError,
};
use dialflow_telephony::normalize_phone;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Result of a compliance check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceCheck {
    pub blocked: bool,
    pub category: DndCategory,
    /// The registry could not be consulted and the number was let through
    pub degraded: bool,
}

impl ComplianceCheck {
    fn from_record(record: &DndRecord) -> Self {
        Self {
            blocked: record.blocked,
            category: record.category.clone(),
            degraded: false,
        }
    }
}

pub struct ComplianceGate {
    repo: Arc<dyn DndRepository>,
    registry: Arc<dyn ComplianceRegistry>,
    ttl: Duration,
    default_country: String,
}

/// Cache key for a phone number: the E.164 form when it parses, otherwise
/// the raw input with separators stripped
fn phone_key(phone: &str, default_country: &str) -> String {
    normalize_phone(phone, default_country).unwrap_or_else(|_| {
        phone
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')' | '.'))
            .collect()
    })
}

impl ComplianceGate {
    pub fn new(
        repo: Arc<dyn DndRepository>,
        registry: Arc<dyn ComplianceRegistry>,
        ttl: Duration,
        default_country: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            registry,
            ttl,
            default_country: default_country.into(),
        }
    }

    /// Key every lookup, block and removal is stored under
    pub fn key(&self, phone: &str) -> String {
        phone_key(phone, &self.default_country)
    }

    /// Check a number. Never fails: repository and registry errors degrade
    /// to "not blocked".
    pub async fn check(&self, phone: &str) -> ComplianceCheck {
        let key = self.key(phone);
        let now = Utc::now();

        match self.repo.find(&key).await {
            Ok(Some(record)) if record.source == DndSource::Local => {
                debug!(phone = %key, "Local block applies");
                return ComplianceCheck::from_record(&record);
            }
            Ok(Some(record)) if record.is_fresh(now, self.ttl) => {
                debug!(phone = %key, blocked = record.blocked, "DND cache hit");
                return ComplianceCheck::from_record(&record);
            }
            Ok(_) => {}
            Err(e) => warn!(phone = %key, error = %e, "DND cache read failed"),
        }

        match self.registry.lookup(&key).await {
            Ok(answer) => {
                let answered = DndRecord::from_registry(&key, answer.blocked, answer.category);
                debug!(
                    phone = %key,
                    registry = %self.registry.name(),
                    blocked = answered.blocked,
                    "DND registry answered"
                );
                // A local block saved during the lookup survives the save
                match self.repo.save(&answered).await {
                    Ok(stored) => ComplianceCheck::from_record(&stored),
                    Err(e) => {
                        warn!(phone = %key, error = %e, "Failed to cache DND answer");
                        ComplianceCheck::from_record(&answered)
                    }
                }
            }
            Err(e) => {
                warn!(
                    phone = %key,
                    registry = %self.registry.name(),
                    error = %e,
                    "DND registry unavailable, failing open"
                );
                ComplianceCheck {
                    blocked: false,
                    category: DndCategory::Unknown,
                    degraded: true,
                }
            }
        }
    }

    /// Record a permanent local opt-out
    pub async fn add_local_block(
        &self,
        phone: &str,
        reason: &str,
    ) -> Result<DndRecord, DomainError> {
        let key = self.key(phone);
        if key.is_empty() {
            return Err(DomainError::Validation("phone number is empty".to_string()));
        }
        let record = self
            .repo
            .save(&DndRecord::local_block(&key, reason))
            .await?;
        info!(phone = %key, reason = %reason, "Local DND block recorded");
        Ok(record)
    }

    /// Remove any record for a number (local block or cached registry answer)
    pub async fn remove_block(&self, phone: &str) -> Result<bool, DomainError> {
        let key = self.key(phone);
        let removed = self.repo.delete(&key).await?;
        if removed {
            info!(phone = %key, "DND record removed");
        }
        Ok(removed)
    }

    /// Cached record for a number, without consulting the registry
    pub async fn cached(&self, phone: &str) -> Result<Option<DndRecord>, DomainError> {
        self.repo.find(&self.key(phone)).await
    }
}
