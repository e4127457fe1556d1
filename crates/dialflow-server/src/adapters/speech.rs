//! Speech Adapters
//!
//! A generic HTTP speech service (raw audio in, JSON text out; JSON text in,
//! raw audio out) and a null engine for dry runs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use dialflow::{DomainError, SpeechToText, TextToSpeech};

const SPEECH_TIMEOUT: Duration = Duration::from_secs(20);

pub struct HttpSpeech {
    client: Client,
    stt_url: Option<String>,
    tts_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(alias = "transcript")]
    text: String,
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
}

impl HttpSpeech {
    pub fn new(
        stt_url: Option<String>,
        tts_url: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(SPEECH_TIMEOUT)
            .build()
            .map_err(|e| {
                DomainError::ExternalService(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            stt_url,
            tts_url,
            api_key,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }
}

fn send_error(what: &str, e: reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::Timeout(what.to_string())
    } else {
        DomainError::ExternalService(format!("{} failed: {}", what, e))
    }
}

#[async_trait]
impl SpeechToText for HttpSpeech {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, DomainError> {
        let url = self
            .stt_url
            .as_deref()
            .ok_or_else(|| DomainError::Validation("speech-to-text URL not configured".into()))?;

        let response = self
            .authorize(self.client.post(url))
            .header("Content-Type", "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| send_error("transcription", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DomainError::ExternalService(format!(
                "Speech-to-text error ({}): {}",
                status, error_text
            )));
        }

        let body: TranscriptionResponse = response.json().await.map_err(|e| {
            DomainError::ExternalService(format!("Invalid transcription response: {}", e))
        })?;
        Ok(body.text.trim().to_string())
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[async_trait]
impl TextToSpeech for HttpSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, DomainError> {
        let url = self
            .tts_url
            .as_deref()
            .ok_or_else(|| DomainError::Validation("text-to-speech URL not configured".into()))?;

        let response = self
            .authorize(self.client.post(url))
            .json(&SynthesisRequest { text })
            .send()
            .await
            .map_err(|e| send_error("synthesis", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DomainError::ExternalService(format!(
                "Text-to-speech error ({}): {}",
                status, error_text
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| DomainError::ExternalService(format!("Invalid synthesis body: {}", e)))?;
        Ok(audio.to_vec())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Transcribes nothing and synthesizes silence
#[derive(Debug, Default, Clone)]
pub struct NullSpeech;

impl NullSpeech {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SpeechToText for NullSpeech {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String, DomainError> {
        Ok(String::new())
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[async_trait]
impl TextToSpeech for NullSpeech {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, DomainError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "null"
    }
}
