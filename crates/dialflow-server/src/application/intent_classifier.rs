//! Two-tier intent classifier
//!
//! The pattern tier answers most utterances without a network round-trip.
//! Only when no pattern matches is the language model asked for a label.

use std::sync::Arc;
use std::time::Duration;

use dialflow::{
    ChatMessage, CompletionOptions, ConversationStage, DomainError, Intent, IntentMatch,
    IntentSource, LanguageModel, PatternClassifier,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;

pub struct IntentClassifier {
    patterns: PatternClassifier,
    llm: Option<Arc<dyn LanguageModel>>,
    fallback_confidence: f32,
    timeout: Duration,
}

impl IntentClassifier {
    pub fn new(config: &ClassifierConfig, llm: Option<Arc<dyn LanguageModel>>) -> Self {
        let extras = config.extra_patterns.iter().filter_map(|entry| {
            match entry.intent.parse::<Intent>() {
                Ok(intent) => Some((intent, entry.pattern.clone())),
                Err(e) => {
                    warn!(error = %e, pattern = %entry.pattern, "Ignoring extra pattern");
                    None
                }
            }
        });
        let patterns = PatternClassifier::new(config.pattern_confidence).prepend(extras);

        Self {
            patterns,
            llm: llm.filter(|_| config.fallback_enabled),
            fallback_confidence: config.fallback_confidence,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }

    /// Classify one lead utterance. Model errors and timeouts propagate so the
    /// caller can count them.
    pub async fn classify(
        &self,
        text: &str,
        stage: ConversationStage,
    ) -> Result<IntentMatch, DomainError> {
        if let Some(hit) = self.patterns.classify(text) {
            debug!(intent = %hit.intent, "Pattern tier matched");
            return Ok(hit);
        }

        let Some(llm) = &self.llm else {
            return Ok(IntentMatch::unknown(self.fallback_confidence));
        };
        if text.trim().is_empty() {
            return Ok(IntentMatch::unknown(self.fallback_confidence));
        }

        let messages = [
            ChatMessage::system(classification_prompt(stage)),
            ChatMessage::user(text.trim()),
        ];
        let response = tokio::time::timeout(
            self.timeout,
            llm.complete(&messages, &CompletionOptions::for_classification()),
        )
        .await
        .map_err(|_| DomainError::Timeout("intent classification".to_string()))??;

        let matched = parse_model_label(&response.content, self.fallback_confidence);
        debug!(
            intent = %matched.intent,
            confidence = matched.confidence,
            source = ?matched.source,
            "Model tier classified"
        );
        Ok(matched)
    }
}

fn classification_prompt(stage: ConversationStage) -> String {
    let labels = Intent::ALL
        .iter()
        .map(|i| i.label())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You classify one utterance from a prospect on a sales call. \
         The call is in the {stage} stage. \
         Reply with exactly one label from: {labels}. \
         Optionally append '|' and a confidence between 0 and 1."
    )
}

#[derive(Deserialize)]
struct LabelJson {
    intent: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Read a label out of model output: JSON `{"intent": .., "confidence": ..}`,
/// `label`, `label|0.8` or `label 0.8`. Anything else is `unknown`.
fn parse_model_label(raw: &str, fallback_confidence: f32) -> IntentMatch {
    let raw = raw.trim();

    if raw.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<LabelJson>(raw) {
            if let Ok(intent) = parsed.intent.parse::<Intent>() {
                let confidence = parsed.confidence.unwrap_or(fallback_confidence);
                return IntentMatch::new(intent, confidence, IntentSource::Model);
            }
        }
        return IntentMatch::unknown(fallback_confidence);
    }

    let line = raw.lines().next().unwrap_or_default();
    let line = line.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '.');
    let (label, confidence) = match line.split_once('|') {
        Some((label, conf)) => (label.trim(), conf.trim().parse::<f32>().ok()),
        None => match line.rsplit_once(' ') {
            Some((label, conf)) if conf.parse::<f32>().is_ok() => {
                (label.trim(), conf.parse::<f32>().ok())
            }
            _ => (line, None),
        },
    };

    match label.parse::<Intent>() {
        Ok(intent) => IntentMatch::new(
            intent,
            confidence.unwrap_or(fallback_confidence),
            IntentSource::Model,
        ),
        Err(_) => IntentMatch::unknown(fallback_confidence),
    }
}
