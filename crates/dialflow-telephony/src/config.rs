//! Vendor configuration

use serde::{Deserialize, Serialize};

/// Configuration for the Twilio adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Caller ID in E.164
    pub from_number: String,
    /// Public base URL that Twilio calls back (status and speech webhooks)
    pub callback_base: String,
    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,
    /// Country code (digits) assumed for national numbers
    #[serde(default = "default_country")]
    pub default_country: String,
    #[serde(default = "default_true")]
    pub record: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Seconds to let the phone ring before giving up
    #[serde(default = "default_ring_timeout_secs")]
    pub ring_timeout_secs: u32,
}

impl TwilioConfig {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            callback_base: String::new(),
            api_base: default_twilio_api_base(),
            default_country: default_country(),
            record: true,
            timeout_secs: default_timeout_secs(),
            ring_timeout_secs: default_ring_timeout_secs(),
        }
    }

    /// Set the public callback base URL
    pub fn with_callback_base(mut self, base: impl Into<String>) -> Self {
        self.callback_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the API base (used against sandboxes)
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_recording(mut self, record: bool) -> Self {
        self.record = record;
        self
    }
}

/// Configuration for the Exotel adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExotelConfig {
    pub account_sid: String,
    pub api_key: String,
    pub api_token: String,
    /// Regional API host, e.g. `api.exotel.com` or `api.in.exotel.com`
    #[serde(default = "default_exotel_subdomain")]
    pub subdomain: String,
    #[serde(default = "default_country")]
    pub default_country: String,
    /// Exophone used as caller ID
    pub caller_id: String,
    /// Flow (applet) URL that drives the answered call
    pub flow_url: String,
    pub callback_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_ring_timeout_secs")]
    pub ring_timeout_secs: u32,
}

impl ExotelConfig {
    pub fn new(
        account_sid: impl Into<String>,
        api_key: impl Into<String>,
        api_token: impl Into<String>,
        caller_id: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            api_key: api_key.into(),
            api_token: api_token.into(),
            subdomain: default_exotel_subdomain(),
            default_country: default_country(),
            caller_id: caller_id.into(),
            flow_url: String::new(),
            callback_base: String::new(),
            timeout_secs: default_timeout_secs(),
            ring_timeout_secs: default_ring_timeout_secs(),
        }
    }

    pub fn with_flow_url(mut self, url: impl Into<String>) -> Self {
        self.flow_url = url.into();
        self
    }

    pub fn with_callback_base(mut self, base: impl Into<String>) -> Self {
        self.callback_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = subdomain.into();
        self
    }
}

fn default_twilio_api_base() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

fn default_exotel_subdomain() -> String {
    "api.exotel.com".to_string()
}

fn default_country() -> String {
    "91".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_ring_timeout_secs() -> u32 {
    30
}
