//! Compliance Registry Port
//!
//! Upstream do-not-call registry consulted on a cache miss.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::value_objects::DndCategory;

/// Registry answer for one number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryAnswer {
    pub blocked: bool,
    #[serde(default)]
    pub category: DndCategory,
}

impl RegistryAnswer {
    pub fn clear() -> Self {
        Self {
            blocked: false,
            category: DndCategory::NotRegistered,
        }
    }

    pub fn blocked(category: DndCategory) -> Self {
        Self {
            blocked: true,
            category,
        }
    }
}

#[async_trait]
pub trait ComplianceRegistry: Send + Sync {
    /// Look up a normalized phone number
    async fn lookup(&self, phone: &str) -> Result<RegistryAnswer, DomainError>;

    /// Registry name used in logs
    fn name(&self) -> &str;
}
