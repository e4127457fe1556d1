//! CallAttempt Repository Port
//!
//! Registry of active (not yet finalized) attempts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::CallAttempt;
use crate::domain::errors::DomainError;

/// Repository interface for active CallAttempt entries
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Register a new active attempt.
    ///
    /// Fails with `DomainError::Conflict` if the lead already has an active
    /// attempt.
    async fn register(&self, attempt: &CallAttempt) -> Result<(), DomainError>;

    /// Find an active attempt by ID
    async fn get(&self, attempt_id: Uuid) -> Result<Option<CallAttempt>, DomainError>;

    /// Replace an active attempt
    async fn update(&self, attempt: &CallAttempt) -> Result<(), DomainError>;

    /// Find the active attempt for a lead
    async fn find_by_lead(&self, lead_id: Uuid) -> Result<Option<CallAttempt>, DomainError>;

    /// Attempts still initiated or ringing that were started before `cutoff`
    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<CallAttempt>, DomainError>;

    /// Remove an attempt, returning it if it was active
    async fn remove(&self, attempt_id: Uuid) -> Result<Option<CallAttempt>, DomainError>;

    /// Number of active attempts
    async fn count(&self) -> Result<usize, DomainError>;
}
