//! Compliance Registry Adapters
//!
//! HTTP lookup against an upstream do-not-call registry, and a null registry
//! that clears every number.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use dialflow::{ComplianceRegistry, DndCategory, DomainError, RegistryAnswer};

/// Registry reachable at `GET {base_url}/lookup?phone=...`
pub struct HttpComplianceRegistry {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(alias = "dnd", alias = "is_blocked")]
    blocked: bool,
    #[serde(default)]
    category: Option<String>,
}

impl HttpComplianceRegistry {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            DomainError::ExternalService(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl ComplianceRegistry for HttpComplianceRegistry {
    async fn lookup(&self, phone: &str) -> Result<RegistryAnswer, DomainError> {
        let mut request = self
            .client
            .get(format!("{}/lookup", self.base_url))
            .query(&[("phone", phone)]);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DomainError::Timeout("registry lookup".to_string())
            } else {
                DomainError::ExternalService(format!("Registry request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DomainError::ExternalService(format!(
                "Registry error ({}): {}",
                status, error_text
            )));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| DomainError::ExternalService(format!("Invalid registry response: {}", e)))?;

        Ok(answer_from(body))
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn answer_from(body: LookupResponse) -> RegistryAnswer {
    if !body.blocked {
        return RegistryAnswer::clear();
    }
    RegistryAnswer::blocked(body.category.as_deref().map_or(DndCategory::FullyBlocked, category_from))
}

/// Registries label partial blocks with their own category names
fn category_from(raw: &str) -> DndCategory {
    let normalized = raw.trim().to_lowercase().replace('-', "_");
    match normalized.as_str() {
        "" | "fully_blocked" | "full" | "all" => DndCategory::FullyBlocked,
        "user_requested" => DndCategory::UserRequested,
        other => DndCategory::Partial(
            other
                .strip_prefix("partial:")
                .unwrap_or(other)
                .to_string(),
        ),
    }
}

/// Registry used when none is configured; every number is clear
#[derive(Debug, Default, Clone)]
pub struct NullComplianceRegistry;

impl NullComplianceRegistry {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ComplianceRegistry for NullComplianceRegistry {
    async fn lookup(&self, _phone: &str) -> Result<RegistryAnswer, DomainError> {
        Ok(RegistryAnswer::clear())
    }

    fn name(&self) -> &str {
        "null"
    }
}
