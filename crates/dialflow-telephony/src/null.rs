//! Null telephony adapter
//!
//! Selected when no vendor is configured. Logs every request and never
//! reaches the network; status callbacks must be injected by hand.

use async_trait::async_trait;
use dialflow::{CallStatus, DomainError, ProviderCallStatus, TelephonyPort};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default, Clone)]
pub struct NullTelephony;

impl NullTelephony {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TelephonyPort for NullTelephony {
    async fn place_call(&self, to: &str, attempt_id: Uuid) -> Result<String, DomainError> {
        info!(attempt_id = %attempt_id, to = %to, "Dry run: call not placed");
        Ok(format!("null-{}", attempt_id))
    }

    async fn hangup(&self, provider_call_id: &str) -> Result<(), DomainError> {
        info!(call_id = %provider_call_id, "Dry run: hangup");
        Ok(())
    }

    async fn get_status(&self, provider_call_id: &str) -> Result<ProviderCallStatus, DomainError> {
        Ok(ProviderCallStatus {
            provider_call_id: provider_call_id.to_string(),
            status: CallStatus::Initiated,
            duration_secs: None,
        })
    }

    async fn get_recording(&self, _provider_call_id: &str) -> Result<Option<String>, DomainError> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "null"
    }
}
