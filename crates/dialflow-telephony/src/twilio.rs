//! Twilio adapter (global provider)

use std::time::Duration;

use async_trait::async_trait;
use dialflow::{CallStatus, DomainError, ProviderCallStatus, TelephonyPort};
use serde::Deserialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::TwilioConfig;
use crate::error::TelephonyError;
use crate::normalize::normalize_phone;

const PROVIDER: &str = "twilio";

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    status: String,
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordingList {
    #[serde(default)]
    recordings: Vec<RecordingResource>,
}

#[derive(Debug, Deserialize)]
struct RecordingResource {
    uri: String,
}

/// Twilio Programmable Voice adapter
pub struct TwilioAdapter {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioAdapter {
    pub fn new(config: TwilioConfig) -> Result<Self, TelephonyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Calls.json",
            self.config.api_base, self.config.account_sid
        )
    }

    fn call_url(&self, sid: &str) -> String {
        format!(
            "{}/Accounts/{}/Calls/{}.json",
            self.config.api_base, self.config.account_sid, sid
        )
    }

    fn webhook_url(&self, kind: &str, attempt_id: Uuid) -> String {
        format!(
            "{}/webhooks/{}/{}?attempt_id={}",
            self.config.callback_base, PROVIDER, kind, attempt_id
        )
    }

    fn place_call_form(&self, to: &str, attempt_id: Uuid) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("To", to.to_string()),
            ("From", self.config.from_number.clone()),
            // Answered calls fetch the opening line from the speech webhook
            ("Url", self.webhook_url("speech", attempt_id)),
            ("Method", "POST".to_string()),
            ("StatusCallback", self.webhook_url("status", attempt_id)),
            ("StatusCallbackMethod", "POST".to_string()),
            ("Timeout", self.config.ring_timeout_secs.to_string()),
            ("MachineDetection", "Enable".to_string()),
        ];
        for event in ["initiated", "ringing", "answered", "completed"] {
            form.push(("StatusCallbackEvent", event.to_string()));
        }
        if self.config.record {
            form.push(("Record", "true".to_string()));
        }
        form
    }

    async fn fetch_call(&self, sid: &str) -> Result<CallResource, TelephonyError> {
        let response = self
            .client
            .get(self.call_url(sid))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await?;
        parse_json(response).await
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
impl TelephonyPort for TwilioAdapter {
    async fn place_call(&self, to: &str, attempt_id: Uuid) -> Result<String, DomainError> {
        let to = normalize_phone(to, &self.config.default_country)?;
        debug!(attempt_id = %attempt_id, to = %to, "Placing Twilio call");

        let response = self
            .client
            .post(self.calls_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&self.place_call_form(&to, attempt_id))
            .send()
            .await
            .map_err(TelephonyError::from)?;

        let call: CallResource = parse_json(response)
            .await
            .inspect_err(|e| error!(attempt_id = %attempt_id, error = %e, "Twilio rejected call"))?;

        info!(attempt_id = %attempt_id, call_sid = %call.sid, "Twilio call placed");
        Ok(call.sid)
    }

    async fn hangup(&self, provider_call_id: &str) -> Result<(), DomainError> {
        debug!(call_sid = %provider_call_id, "Hanging up Twilio call");
        let response = self
            .client
            .post(self.call_url(provider_call_id))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("Status", "completed")])
            .send()
            .await
            .map_err(TelephonyError::from)?;
        let _: CallResource = parse_json(response).await?;
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
            provider_call_id: call.sid,
            status,
            duration_secs: call.duration.and_then(|d| d.parse().ok()),
        })
    }

    async fn get_recording(&self, provider_call_id: &str) -> Result<Option<String>, DomainError> {
        let url = format!(
            "{}/Accounts/{}/Calls/{}/Recordings.json",
            self.config.api_base, self.config.account_sid, provider_call_id
        );
        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await
            .map_err(TelephonyError::from)?;
        let list: RecordingList = parse_json(response).await?;

        Ok(list
            .recordings
            .first()
            .map(|r| recording_media_url(&self.config.api_base, &r.uri)))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

/// Recording URIs come back as `/2010-04-01/.../RE123.json`; the media lives
/// at the same path with an audio extension
fn recording_media_url(api_base: &str, uri: &str) -> String {
    let host = api_base
        .find("/20")
        .map(|idx| &api_base[..idx])
        .unwrap_or(api_base);
    format!("{}{}.mp3", host, uri.trim_end_matches(".json"))
}

/// TwiML that speaks `text` and, unless the call is ending, gathers the
/// lead's next utterance as speech
pub fn render_twiml(text: &str, gather_action: &str, hangup: bool, language: &str) -> String {
    let say = format!(
        "<Say language=\"{}\">{}</Say>",
        xml_escape(language),
        xml_escape(text)
    );
    let tail = if hangup {
        "<Hangup/>".to_string()
    } else {
        // Silence falls through the Gather; the redirect re-prompts
        format!(
            "<Gather input=\"speech\" action=\"{}\" method=\"POST\" language=\"{}\" speechTimeout=\"auto\"/><Redirect method=\"POST\">{}</Redirect>",
            xml_escape(gather_action),
            xml_escape(language),
            xml_escape(gather_action)
        )
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>{}{}</Response>",
        say, tail
    )
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
