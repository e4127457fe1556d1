//! DndRecord Repository Port
//!
//! Cache of registry answers plus permanent local opt-outs.

use async_trait::async_trait;

use crate::domain::entities::DndRecord;
use crate::domain::errors::DomainError;

/// Repository interface for DndRecord entries, keyed by normalized phone number
#[async_trait]
pub trait DndRepository: Send + Sync {
    /// Find the cached record for a phone number
    async fn find(&self, phone: &str) -> Result<Option<DndRecord>, DomainError>;

    /// Save a record (insert or replace).
    ///
    /// Implementations must not let a registry record replace a local block.
    async fn save(&self, record: &DndRecord) -> Result<DndRecord, DomainError>;

    /// Delete the record for a phone number
    async fn delete(&self, phone: &str) -> Result<bool, DomainError>;

    /// All local (user requested) blocks
    async fn list_local(&self) -> Result<Vec<DndRecord>, DomainError>;
}
