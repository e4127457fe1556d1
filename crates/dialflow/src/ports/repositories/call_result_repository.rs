//! CallResult Repository Port

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::CallResult;
use crate::domain::errors::DomainError;

/// Repository interface for finalized CallResult records
#[async_trait]
pub trait CallResultRepository: Send + Sync {
    /// Find the result recorded for an attempt
    async fn find(&self, attempt_id: Uuid) -> Result<Option<CallResult>, DomainError>;

    /// Insert a result unless one already exists for the same attempt.
    ///
    /// Returns the stored result and whether this call inserted it. The
    /// check and the insert are a single atomic step.
    async fn insert_if_absent(
        &self,
        result: CallResult,
    ) -> Result<(CallResult, bool), DomainError>;

    /// Results recorded for a lead, oldest first
    async fn find_by_lead(&self, lead_id: Uuid) -> Result<Vec<CallResult>, DomainError>;
}
