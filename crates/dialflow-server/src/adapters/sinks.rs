//! Outcome Sinks
//!
//! Delivers finalized results to HTTP webhooks (HMAC signed, retried with
//! exponential backoff) and to the `analytics` tracing target.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use dialflow::{CallResult, DomainError, OutcomeSink};

use crate::config::WebhookSinkConfig;

pub const SIGNATURE_HEADER: &str = "X-Dialflow-Signature";

/// HTTP webhook sink
pub struct WebhookSink {
    client: Client,
    config: WebhookSinkConfig,
    retry_base_delay_ms: u64,
    retry_max_delay_ms: u64,
}

impl WebhookSink {
    pub fn new(
        config: WebhookSinkConfig,
        retry_base_delay_ms: u64,
        retry_max_delay_ms: u64,
    ) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("dialflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                DomainError::ExternalService(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            retry_base_delay_ms,
            retry_max_delay_ms,
        })
    }

    /// `sha256=<hex>` HMAC of the request body
    pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, DomainError> {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        type HmacSha256 = Hmac<Sha256>;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| DomainError::Validation(format!("Invalid signing key: {}", e)))?;
        mac.update(payload);
        let bytes = mac.finalize().into_bytes();

        Ok(format!("sha256={}", hex::encode(bytes)))
    }

    /// Delay before retry number `retry` (1-based)
    fn backoff(&self, retry: u32) -> Duration {
        let mut delay = self.retry_base_delay_ms;
        for _ in 1..retry {
            delay = (delay * 2).min(self.retry_max_delay_ms);
        }
        Duration::from_millis(delay.min(self.retry_max_delay_ms))
    }
}

#[async_trait]
impl OutcomeSink for WebhookSink {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn deliver(&self, result: &CallResult) -> Result<(), DomainError> {
        let body = serde_json::to_vec(result).map_err(|e| {
            DomainError::ExternalService(format!("Failed to serialize result: {e}"))
        })?;

        let mut request = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json");

        if let Some(secret) = &self.config.secret {
            request = request.header(SIGNATURE_HEADER, Self::sign_payload(secret, &body)?);
        }

        let response = request.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                DomainError::Timeout(format!("webhook {}", self.config.name))
            } else {
                DomainError::ExternalService(format!("Webhook {} failed: {}", self.config.name, e))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(sink = %self.config.name, attempt_id = %result.attempt_id, "Result delivered");
            Ok(())
        } else {
            let response_body = response.text().await.unwrap_or_default();
            Err(DomainError::ExternalService(format!(
                "Webhook {} returned {}: {}",
                self.config.name, status, response_body
            )))
        }
    }

    async fn deliver_with_retry(&self, result: &CallResult) -> Result<(), DomainError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Wait before retry
                tokio::time::sleep(self.backoff(attempt)).await;
            }

            match self.deliver(result).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!(sink = %self.config.name, attempt, error = %e, "Delivery attempt failed");
                    last_error = Some(e);
                }
            }
        }

        // All retries exhausted
        let error = last_error
            .unwrap_or_else(|| DomainError::ExternalService("no delivery attempted".into()));
        warn!(sink = %self.config.name, attempt_id = %result.attempt_id, error = %error, "Webhook delivery gave up");
        Err(error)
    }
}

/// Emits every result as a structured event on the `analytics` target
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutcomeSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn deliver(&self, result: &CallResult) -> Result<(), DomainError> {
        info!(
            target: "analytics",
            attempt_id = %result.attempt_id,
            lead_id = %result.lead_id,
            campaign_id = %result.campaign_id,
            status = %result.status,
            outcome = %result.outcome,
            duration_secs = result.duration_secs,
            lead_score = result.lead_score,
            temperature = ?result.temperature,
            turns = result.transcript.len(),
            appointment_at = ?result.appointment_at,
            callback_at = ?result.callback_at,
            "call_result"
        );
        Ok(())
    }
}
