use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod adapters;
mod application;
mod auth;
mod config;
mod models;
mod routes;
#[cfg(test)]
mod testing;

use adapters::{
    HttpComplianceRegistry, HttpSpeech, InMemoryAttemptRepository, InMemoryCallResultRepository,
    InMemoryDndRepository, NullComplianceRegistry, NullLanguageModel, NullSpeech,
    OpenAiLanguageModel, TracingSink, WebhookSink,
};
use application::{Engine, EngineContext};
use config::{AppConfig, LlmProvider, SpeechProvider, TelephonyProvider};
use dialflow::{
    ComplianceRegistry, LanguageModel, OutcomeSink, SpeechToText, TelephonyPort, TextToSpeech,
};
use dialflow_telephony::{ExotelAdapter, NullTelephony, TwilioAdapter};

/// How long live calls get to wrap up after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub config: Arc<AppConfig>,
}

#[derive(Serialize)]
struct HealthCheck {
    status: String,
    message: String,
    version: String,
}

async fn health_check() -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "ok".to_string(),
        message: "Dialflow is running - calls flow through the dispatcher".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Full HTTP surface: health, operator routes behind the API key, vendor callbacks
pub fn build_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .merge(routes::calls::router())
        .merge(routes::compliance::router())
        .layer(middleware::from_fn(auth::auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .merge(routes::telephony::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn build_telephony(config: &AppConfig) -> anyhow::Result<Arc<dyn TelephonyPort>> {
    let public_base = config.server.public_base_url.trim_end_matches('/');
    let telephony: Arc<dyn TelephonyPort> = match config.telephony.provider {
        TelephonyProvider::Twilio => {
            let mut twilio = config
                .telephony
                .twilio
                .clone()
                .ok_or_else(|| anyhow::anyhow!("Twilio selected without configuration"))?;
            if twilio.callback_base.is_empty() {
                twilio = twilio.with_callback_base(public_base);
            }
            Arc::new(TwilioAdapter::new(twilio)?)
        }
        TelephonyProvider::Exotel => {
            let mut exotel = config
                .telephony
                .exotel
                .clone()
                .ok_or_else(|| anyhow::anyhow!("Exotel selected without configuration"))?;
            if exotel.callback_base.is_empty() {
                exotel.callback_base = public_base.to_string();
            }
            Arc::new(ExotelAdapter::new(exotel)?)
        }
        TelephonyProvider::Null => {
            tracing::warn!("⚠️  No telephony provider configured - calls are simulated");
            Arc::new(NullTelephony::new())
        }
    };
    tracing::info!("📞 Telephony: {}", telephony.name());
    Ok(telephony)
}

fn build_llm(config: &AppConfig) -> anyhow::Result<Arc<dyn LanguageModel>> {
    let llm = &config.llm;
    match (llm.provider, llm.api_key.clone()) {
        (LlmProvider::OpenAi, Some(api_key)) => {
            tracing::info!("🧠 Language model: {} via {}", llm.model, llm.base_url);
            Ok(Arc::new(OpenAiLanguageModel::new(
                llm.base_url.clone(),
                api_key,
                llm.model.clone(),
                Duration::from_secs(llm.timeout_secs),
            )?))
        }
        _ => {
            tracing::warn!("⚠️  No language model configured - scripted replies only");
            Ok(Arc::new(NullLanguageModel::new()))
        }
    }
}

fn build_registry(config: &AppConfig) -> anyhow::Result<Arc<dyn ComplianceRegistry>> {
    let compliance = &config.compliance;
    match &compliance.registry_url {
        Some(url) => {
            tracing::info!("🛡️  DND registry: {}", url);
            Ok(Arc::new(HttpComplianceRegistry::new(
                url.clone(),
                compliance.registry_api_key.clone(),
                Duration::from_secs(compliance.registry_timeout_secs),
            )?))
        }
        None => {
            tracing::warn!("⚠️  No DND registry configured - only local blocks apply");
            Ok(Arc::new(NullComplianceRegistry::new()))
        }
    }
}

fn build_speech(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn SpeechToText>, Arc<dyn TextToSpeech>)> {
    let speech = &config.speech;
    match speech.provider {
        SpeechProvider::Http => {
            let http = Arc::new(HttpSpeech::new(
                speech.stt_url.clone(),
                speech.tts_url.clone(),
                speech.api_key.clone(),
            )?);
            tracing::info!("🗣️  Speech services enabled");
            let stt: Arc<dyn SpeechToText> = http.clone();
            let tts: Arc<dyn TextToSpeech> = http;
            Ok((stt, tts))
        }
        SpeechProvider::Null => {
            let null = Arc::new(NullSpeech::new());
            let stt: Arc<dyn SpeechToText> = null.clone();
            let tts: Arc<dyn TextToSpeech> = null;
            Ok((stt, tts))
        }
    }
}

fn build_sinks(config: &AppConfig) -> anyhow::Result<Vec<Arc<dyn OutcomeSink>>> {
    let mut sinks: Vec<Arc<dyn OutcomeSink>> = Vec::new();
    for webhook in &config.sinks.webhooks {
        tracing::info!("🔔 Outcome webhook: {} -> {}", webhook.name, webhook.url);
        sinks.push(Arc::new(WebhookSink::new(
            webhook.clone(),
            config.sinks.retry_base_delay_ms,
            config.sinks.retry_max_delay_ms,
        )?));
    }
    if config.sinks.tracing {
        sinks.push(Arc::new(TracingSink::new()));
    }
    Ok(sinks)
}

async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("🛑 Shutdown requested - no new calls will be dialed");
    token.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dialflow=debug,dialflow_server=debug")),
        )
        .init();

    tracing::info!("📟 Dialflow initializing...");
    let config = AppConfig::load()?;

    match config.server.api_key.clone() {
        Some(api_key) => {
            auth::init_api_key(api_key);
            tracing::info!("🔐 API key authentication enabled");
        }
        None => tracing::warn!("⚠️  No DIALFLOW_API_KEY set - authentication disabled"),
    }

    let (stt, tts) = build_speech(&config)?;
    let ctx = EngineContext {
        telephony: build_telephony(&config)?,
        llm: build_llm(&config)?,
        registry: build_registry(&config)?,
        stt,
        tts,
        dnd: Arc::new(InMemoryDndRepository::new()),
        attempts: Arc::new(InMemoryAttemptRepository::new()),
        results: Arc::new(InMemoryCallResultRepository::new()),
        sinks: build_sinks(&config)?,
    };

    let shutdown = CancellationToken::new();
    let engine = Arc::new(Engine::build(ctx, &config, shutdown.clone()));
    let handles = engine.start();
    tracing::info!(
        "🚦 Dispatcher started ({} concurrent calls, {} dials per request)",
        config.dispatcher.max_concurrent_calls,
        config.dispatcher.max_retries
    );

    let state = AppState {
        engine: engine.clone(),
        config: Arc::new(config.clone()),
    };
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("✅ Dialflow ready on {}", config.server.bind);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    if engine.drain(DRAIN_TIMEOUT).await {
        tracing::info!("👋 All conversations finalized");
    } else {
        tracing::warn!("⚠️  Drain timed out with conversations still live");
    }
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!("Background task failed: {}", e);
        }
    }
    Ok(())
}
