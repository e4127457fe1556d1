//! Telephony Port
//!
//! Abstract interface that every telephony vendor adapter implements.
//! Number normalization, vendor authentication and callback payload shapes
//! stay inside the adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::value_objects::CallStatus;

/// Provider's view of a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCallStatus {
    pub provider_call_id: String,
    pub status: CallStatus,
    pub duration_secs: Option<u64>,
}

/// A vendor status callback translated at the adapter boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub attempt_id: Uuid,
    pub status: CallStatus,
    pub duration_secs: Option<u64>,
    pub recording_url: Option<String>,
    pub provider_call_id: Option<String>,
}

impl ProviderEvent {
    pub fn new(attempt_id: Uuid, status: CallStatus) -> Self {
        Self {
            attempt_id,
            status,
            duration_secs: None,
            recording_url: None,
            provider_call_id: None,
        }
    }

    pub fn with_duration(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_recording(mut self, url: impl Into<String>) -> Self {
        self.recording_url = Some(url.into());
        self
    }

    pub fn with_provider_call_id(mut self, id: impl Into<String>) -> Self {
        self.provider_call_id = Some(id.into());
        self
    }
}

/// Telephony vendor interface
///
/// # Example
///
/// ```rust,ignore
/// use dialflow::ports::TelephonyPort;
///
/// struct TwilioAdapter { /* reqwest client */ }
///
/// #[async_trait]
/// impl TelephonyPort for TwilioAdapter {
///     async fn place_call(&self, to: &str, attempt_id: Uuid) -> Result<String, DomainError> {
///         // POST to the vendor, return its call SID
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait TelephonyPort: Send + Sync {
    /// Place an outbound call, returning the provider call identifier.
    ///
    /// `attempt_id` is round-tripped through the vendor's status callbacks.
    async fn place_call(&self, to: &str, attempt_id: Uuid) -> Result<String, DomainError>;

    /// Hang up a live call
    async fn hangup(&self, provider_call_id: &str) -> Result<(), DomainError>;

    /// Fetch the provider's current status for a call
    async fn get_status(&self, provider_call_id: &str)
        -> Result<ProviderCallStatus, DomainError>;

    /// Fetch the recording reference for a finished call, if any
    async fn get_recording(&self, provider_call_id: &str) -> Result<Option<String>, DomainError>;

    /// Provider name (e.g., "twilio", "exotel")
    fn name(&self) -> &str;
}
