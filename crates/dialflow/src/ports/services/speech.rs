//! Speech Ports
//!
//! Speech-to-text and text-to-speech engines. The conversation engine only
//! ever sees text; these sit at the telephony edge.

use async_trait::async_trait;

use crate::domain::errors::DomainError;

#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe raw audio into text
    async fn transcribe(&self, audio: &[u8]) -> Result<String, DomainError>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize text into audio bytes
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, DomainError>;

    fn name(&self) -> &str;
}
