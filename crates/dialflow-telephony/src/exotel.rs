//! Exotel adapter (regional provider)
//!
//! Exotel dials the lead and hands the answered call to a configured flow.
//! The attempt id travels in `CustomField` and comes back on every status
//! callback.

use std::time::Duration;

use async_trait::async_trait;
use dialflow::{CallStatus, DomainError, ProviderCallStatus, TelephonyPort};
use serde::Deserialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::ExotelConfig;
use crate::error::TelephonyError;
use crate::normalize::{normalize_phone, to_national};

const PROVIDER: &str = "exotel";

#[derive(Debug, Deserialize)]
struct CallEnvelope {
    #[serde(rename = "Call")]
    call: CallResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CallResource {
    sid: String,
    status: String,
    #[serde(default)]
    duration: Option<serde_json::Value>,
    #[serde(default)]
    recording_url: Option<String>,
}

impl CallResource {
    fn duration_secs(&self) -> Option<u64> {
        match self.duration.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Exotel voice adapter
pub struct ExotelAdapter {
    client: reqwest::Client,
    config: ExotelConfig,
}

impl ExotelAdapter {
    pub fn new(config: ExotelConfig) -> Result<Self, TelephonyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> String {
        format!(
            "https://{}/v1/Accounts/{}",
            self.config.subdomain, self.config.account_sid
        )
    }

    fn connect_form(&self, national_to: &str, attempt_id: Uuid) -> Vec<(&'static str, String)> {
        vec![
            ("From", national_to.to_string()),
            ("CallerId", self.config.caller_id.clone()),
            ("Url", self.config.flow_url.clone()),
            ("CallType", "trans".to_string()),
            ("TimeOut", self.config.ring_timeout_secs.to_string()),
            (
                "StatusCallback",
                format!(
                    "{}/webhooks/{}/status?attempt_id={}",
                    self.config.callback_base, PROVIDER, attempt_id
                ),
            ),
            ("StatusCallbackEvents[0]", "answered".to_string()),
            ("StatusCallbackEvents[1]", "terminal".to_string()),
            ("CustomField", attempt_id.to_string()),
        ]
    }

    async fn fetch_call(&self, sid: &str) -> Result<CallResource, TelephonyError> {
        let response = self
            .client
            .get(format!("{}/Calls/{}.json", self.base_url(), sid))
            .basic_auth(&self.config.api_key, Some(&self.config.api_token))
            .send()
            .await?;
        let envelope: CallEnvelope = parse_json(response).await?;
        Ok(envelope.call)
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, TelephonyError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TelephonyError::Rejected {
            provider: PROVIDER,
            status: status.as_u16(),
            body,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| TelephonyError::UnexpectedResponse {
            provider: PROVIDER,
            detail: e.to_string(),
        })
}

#[async_trait]
impl TelephonyPort for ExotelAdapter {
    async fn place_call(&self, to: &str, attempt_id: Uuid) -> Result<String, DomainError> {
        let e164 = normalize_phone(to, &self.config.default_country)?;
        let national = to_national(&e164, &self.config.default_country);
        debug!(attempt_id = %attempt_id, to = %national, "Placing Exotel call");

        let response = self
            .client
            .post(format!("{}/Calls/connect.json", self.base_url()))
            .basic_auth(&self.config.api_key, Some(&self.config.api_token))
            .form(&self.connect_form(&national, attempt_id))
            .send()
            .await
            .map_err(TelephonyError::from)?;

        let envelope: CallEnvelope = parse_json(response)
            .await
            .inspect_err(|e| error!(attempt_id = %attempt_id, error = %e, "Exotel rejected call"))?;

        info!(attempt_id = %attempt_id, call_sid = %envelope.call.sid, "Exotel call placed");
        Ok(envelope.call.sid)
    }

    async fn hangup(&self, provider_call_id: &str) -> Result<(), DomainError> {
        // The connect API has no hangup; the flow ends the call on its own
        debug!(call_sid = %provider_call_id, "Exotel hangup is handled by the flow");
        Ok(())
    }

    async fn get_status(&self, provider_call_id: &str) -> Result<ProviderCallStatus, DomainError> {
        let call = self.fetch_call(provider_call_id).await?;
        let status: CallStatus =
            call.status
                .parse()
                .map_err(|e: String| TelephonyError::UnexpectedResponse {
                    provider: PROVIDER,
                    detail: e,
                })?;
        Ok(ProviderCallStatus {
            duration_secs: call.duration_secs(),
            provider_call_id: call.sid,
            status,
        })
    }

    async fn get_recording(&self, provider_call_id: &str) -> Result<Option<String>, DomainError> {
        let call = self.fetch_call(provider_call_id).await?;
        Ok(call.recording_url.filter(|url| !url.is_empty()))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
