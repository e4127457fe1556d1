//! Server configuration
//!
//! Loaded from an optional TOML file (`DIALFLOW_CONFIG`, default
//! `dialflow.toml`) and overlaid with environment variables for secrets.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use dialflow::RetryPolicy;
use dialflow_telephony::{ExotelConfig, TwilioConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub dispatcher: DispatcherConfig,
    pub conversation: ConversationConfig,
    pub classifier: ClassifierConfig,
    pub compliance: ComplianceConfig,
    pub telephony: TelephonyConfig,
    pub llm: LlmConfig,
    pub speech: SpeechConfig,
    pub sinks: SinksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Bearer token for the /dialflow routes; unset disables auth
    pub api_key: Option<String>,
    /// Public base URL vendors call back on
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            api_key: None,
            public_base_url: "http://localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Concurrent live calls allowed on the telephony account
    pub max_concurrent_calls: usize,
    /// Total dial attempts per request
    pub max_retries: u32,
    pub retry_delay_secs: i64,
    pub demotion_step: i32,
    /// Upper bound on how long the dispatcher sleeps before re-checking the queue
    pub recheck_interval_secs: u64,
    /// Attempts still initiated/ringing after this long are reaped as failed
    pub stale_after_secs: i64,
    pub sweep_interval_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 5,
            max_retries: 3,
            retry_delay_secs: 30 * 60,
            demotion_step: 1,
            recheck_interval_secs: 60,
            stale_after_secs: 10 * 60,
            sweep_interval_secs: 60,
        }
    }
}

impl DispatcherConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay_secs: self.retry_delay_secs,
            demotion_step: self.demotion_step,
        }
    }

    pub fn recheck_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_interval_secs.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub max_consecutive_errors: u32,
    /// Recent turns included in each generation prompt
    pub history_turns: usize,
    pub reply_timeout_secs: u64,
    pub agent_name: String,
    pub company_name: String,
    /// One-line description of what is being offered
    pub offering: String,
    /// Speech language passed to the telephony layer
    pub language: String,
    pub clarify_utterance: String,
    pub goodbye_utterance: String,
    pub error_goodbye_utterance: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 3,
            history_turns: 10,
            reply_timeout_secs: 8,
            agent_name: "Priya".to_string(),
            company_name: "Dialflow".to_string(),
            offering: "help local businesses get more customers online".to_string(),
            language: "en-IN".to_string(),
            clarify_utterance: "Sorry, I didn't catch that. Could you please repeat?".to_string(),
            goodbye_utterance: "Thank you for your time. Have a great day!".to_string(),
            error_goodbye_utterance:
                "I'm having some trouble on my side. I'll call you back later. Thank you!"
                    .to_string(),
        }
    }
}

impl ConversationConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs.max(1))
    }
}

/// Extra pattern applied before the built-in taxonomy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    pub intent: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub pattern_confidence: f32,
    /// Confidence reported when the model tier output cannot be parsed
    pub fallback_confidence: f32,
    pub fallback_enabled: bool,
    pub timeout_secs: u64,
    pub extra_patterns: Vec<PatternEntry>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            pattern_confidence: dialflow::PATTERN_CONFIDENCE,
            fallback_confidence: 0.5,
            fallback_enabled: true,
            timeout_secs: 5,
            extra_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    pub cache_ttl_days: i64,
    pub registry_url: Option<String>,
    pub registry_api_key: Option<String>,
    pub registry_timeout_secs: u64,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            cache_ttl_days: 7,
            registry_url: None,
            registry_api_key: None,
            registry_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelephonyProvider {
    Twilio,
    Exotel,
    #[default]
    Null,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelephonyConfig {
    pub provider: TelephonyProvider,
    pub twilio: Option<TwilioConfig>,
    pub exotel: Option<ExotelConfig>,
}

impl TelephonyConfig {
    /// Country code assumed for national numbers, from the selected vendor
    pub fn default_country(&self) -> &str {
        let vendor = match self.provider {
            TelephonyProvider::Twilio => self.twilio.as_ref().map(|c| c.default_country.as_str()),
            TelephonyProvider::Exotel => self.exotel.as_ref().map(|c| c.default_country.as_str()),
            TelephonyProvider::Null => None,
        };
        vendor.unwrap_or("91")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    #[default]
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Null,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    Http,
    #[default]
    Null,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub provider: SpeechProvider,
    pub stt_url: Option<String>,
    pub tts_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSinkConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_sink_retries")]
    pub max_retries: u32,
    #[serde(default = "default_sink_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinksConfig {
    pub webhooks: Vec<WebhookSinkConfig>,
    /// Emit every result as a structured `analytics` log event
    pub tracing: bool,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            webhooks: Vec::new(),
            tracing: true,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 10_000,
        }
    }
}

fn default_sink_retries() -> u32 {
    3
}

fn default_sink_timeout_ms() -> u64 {
    10_000
}

impl AppConfig {
    /// Load configuration from file (if present) and environment
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("DIALFLOW_CONFIG").unwrap_or_else(|_| "dialflow.toml".to_string());
        let mut config = if Path::new(&path).exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path))?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Overlay secrets and deployment settings from the environment
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("DIALFLOW_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = env("DIALFLOW_API_KEY") {
            self.server.api_key = Some(v);
        }
        if let Some(v) = env("DIALFLOW_PUBLIC_URL") {
            self.server.public_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = env("DIALFLOW_MAX_CONCURRENT_CALLS").and_then(|v| v.parse().ok()) {
            self.dispatcher.max_concurrent_calls = v;
        }

        if let Some(v) = env("DND_REGISTRY_URL") {
            self.compliance.registry_url = Some(v);
        }
        if let Some(v) = env("DND_REGISTRY_API_KEY") {
            self.compliance.registry_api_key = Some(v);
        }

        if let Some(v) = env("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
            if env("DIALFLOW_LLM_PROVIDER").is_none() && self.llm.provider == LlmProvider::Null {
                self.llm.provider = LlmProvider::OpenAi;
            }
        }
        if let Some(v) = env("DIALFLOW_LLM_PROVIDER") {
            self.llm.provider = match v.to_lowercase().as_str() {
                "openai" => LlmProvider::OpenAi,
                _ => LlmProvider::Null,
            };
        }

        if let Some(v) = env("SPEECH_API_KEY") {
            self.speech.api_key = Some(v);
        }

        if let Some(v) = env("DIALFLOW_TELEPHONY") {
            self.telephony.provider = match v.to_lowercase().as_str() {
                "twilio" => TelephonyProvider::Twilio,
                "exotel" => TelephonyProvider::Exotel,
                _ => TelephonyProvider::Null,
            };
        }
        let callback_base = self.server.public_base_url.clone();
        if let (Some(sid), Some(token), Some(from)) = (
            env("TWILIO_ACCOUNT_SID"),
            env("TWILIO_AUTH_TOKEN"),
            env("TWILIO_FROM_NUMBER"),
        ) {
            self.telephony.twilio = Some(match self.telephony.twilio.take() {
                Some(mut existing) => {
                    existing.account_sid = sid;
                    existing.auth_token = token;
                    existing.from_number = from;
                    existing
                }
                None => TwilioConfig::new(sid, token, from).with_callback_base(&callback_base),
            });
        }
        if let (Some(sid), Some(key), Some(token), Some(caller_id)) = (
            env("EXOTEL_ACCOUNT_SID"),
            env("EXOTEL_API_KEY"),
            env("EXOTEL_API_TOKEN"),
            env("EXOTEL_CALLER_ID"),
        ) {
            self.telephony.exotel = Some(match self.telephony.exotel.take() {
                Some(mut existing) => {
                    existing.account_sid = sid;
                    existing.api_key = key;
                    existing.api_token = token;
                    existing.caller_id = caller_id;
                    existing
                }
                None => ExotelConfig::new(sid, key, token, caller_id)
                    .with_callback_base(&callback_base)
                    .with_flow_url(env("EXOTEL_FLOW_URL").unwrap_or_default()),
            });
        }

        if let Some(url) = env("DIALFLOW_OUTCOME_WEBHOOK_URL") {
            self.sinks.webhooks.push(WebhookSinkConfig {
                name: "outcome-webhook".to_string(),
                url,
                secret: env("DIALFLOW_OUTCOME_WEBHOOK_SECRET"),
                max_retries: default_sink_retries(),
                timeout_ms: default_sink_timeout_ms(),
            });
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.dispatcher.max_concurrent_calls == 0 {
            bail!("dispatcher.max_concurrent_calls must be at least 1");
        }
        if self.dispatcher.max_retries == 0 {
            bail!("dispatcher.max_retries must be at least 1");
        }
        if self.conversation.max_consecutive_errors == 0 {
            bail!("conversation.max_consecutive_errors must be at least 1");
        }
        match self.telephony.provider {
            TelephonyProvider::Twilio if self.telephony.twilio.is_none() => {
                bail!("telephony.provider = \"twilio\" requires [telephony.twilio] or TWILIO_* variables")
            }
            TelephonyProvider::Exotel if self.telephony.exotel.is_none() => {
                bail!("telephony.provider = \"exotel\" requires [telephony.exotel] or EXOTEL_* variables")
            }
            _ => {}
        }
        if self.llm.provider == LlmProvider::OpenAi && self.llm.api_key.is_none() {
            bail!("llm.provider = \"openai\" requires OPENAI_API_KEY");
        }
        Ok(())
    }
}
