//! Outcome Sink Port
//!
//! Downstream consumers of finalized call results (analytics, CRM sync,
//! notifiers). Each sink is invoked independently and at least once; a
//! failing sink never affects the recorded result.

use async_trait::async_trait;

use crate::domain::entities::CallResult;
use crate::domain::errors::DomainError;

/// Outcome delivery interface
///
/// # Example
///
/// ```rust,ignore
/// use dialflow::ports::OutcomeSink;
///
/// struct CrmSync { /* http client */ }
///
/// #[async_trait]
/// impl OutcomeSink for CrmSync {
///     fn name(&self) -> &str { "crm" }
///
///     async fn deliver(&self, result: &CallResult) -> Result<(), DomainError> {
///         // Push the result upstream
///     }
/// }
/// ```
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    /// Sink name used in logs
    fn name(&self) -> &str;

    /// Deliver one finalized result
    async fn deliver(&self, result: &CallResult) -> Result<(), DomainError>;

    /// Deliver with sink-specific retry.
    ///
    /// Default implementation: single attempt
    async fn deliver_with_retry(&self, result: &CallResult) -> Result<(), DomainError> {
        self.deliver(result).await
    }
}
