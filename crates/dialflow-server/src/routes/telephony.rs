//! Vendor Callback Routes
//!
//! - `POST /webhooks/:provider/status` - call status changes
//! - `POST /webhooks/:provider/speech` - lead speech, answered with the next
//!   agent utterance (TwiML for Twilio, synthesized audio when the caller
//!   accepts `audio/*`, JSON otherwise)

use std::collections::HashMap;

use axum::{
    body::to_bytes,
    extract::{FromRequest, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use uuid::Uuid;

use dialflow::DomainError;
use dialflow_telephony::{render_twiml, speech_text, translate_status, Provider};

use crate::application::AgentReply;
use crate::models::{CallbackQuery, SpeechReplyResponse};
use crate::AppState;

const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

fn parse_provider(raw: &str) -> Result<Provider, (StatusCode, String)> {
    raw.parse::<Provider>()
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))
}

/// Status callback. Always acknowledged once the provider is known, so
/// vendors do not retry payloads we cannot use.
pub async fn status_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<StatusCode, (StatusCode, String)> {
    let provider = parse_provider(&provider)?;

    let event = match translate_status(provider, &fields, query.attempt_id) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(provider = %provider, error = %e, "Unusable status callback");
            return Ok(StatusCode::OK);
        }
    };

    if let Err(e) = state.engine.dispatcher.handle_provider_event(event).await {
        tracing::error!(provider = %provider, error = %e, "Failed to apply status callback");
    }
    Ok(StatusCode::OK)
}

/// Speech callback: one lead utterance in, one agent utterance out
pub async fn speech_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    request: Request,
) -> Response {
    let provider = match parse_provider(&provider) {
        Ok(provider) => provider,
        Err(rejection) => return rejection.into_response(),
    };
    let wants_audio = accepts_audio(request.headers());

    let (attempt_id, text) = match read_utterance(&state, provider, query, request).await {
        Ok(parsed) => parsed,
        Err(rejection) => return rejection.into_response(),
    };

    match converse(&state, attempt_id, text).await {
        Ok(reply) => render_reply(&state, provider, attempt_id, reply, wants_audio).await,
        Err(e) => {
            tracing::warn!(attempt_id = %attempt_id, provider = %provider, error = %e, "Speech callback failed");
            if provider == Provider::Twilio {
                // Never leave the lead listening to silence
                let goodbye = &state.config.conversation.error_goodbye_utterance;
                twiml(render_twiml(
                    goodbye,
                    "",
                    true,
                    &state.config.conversation.language,
                ))
            } else {
                error_status(&e).into_response()
            }
        }
    }
}

/// Attempt id and lead text from either a vendor form or a raw audio body
async fn read_utterance(
    state: &AppState,
    provider: Provider,
    query: CallbackQuery,
    request: Request,
) -> Result<(Uuid, Option<String>), (StatusCode, String)> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("audio/") || content_type.starts_with("application/octet-stream") {
        let attempt_id = query
            .attempt_id
            .ok_or_else(|| (StatusCode::BAD_REQUEST, "missing attempt_id".to_string()))?;
        let audio = to_bytes(request.into_body(), MAX_AUDIO_BYTES)
            .await
            .map_err(|e| (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()))?;
        let text = state
            .engine
            .stt
            .transcribe(&audio)
            .await
            .map_err(|e| error_status(&e))?;
        tracing::debug!(attempt_id = %attempt_id, stt = %state.engine.stt.name(), "Audio transcribed");
        return Ok((attempt_id, Some(text)));
    }

    let fields = if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<HashMap<String, String>>::from_request(request, &())
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        fields
    } else {
        HashMap::new()
    };

    let attempt_id = query
        .attempt_id
        .or_else(|| {
            ["CustomField", "attempt_id"]
                .iter()
                .filter_map(|k| fields.get(*k))
                .find_map(|v| v.trim().parse().ok())
        })
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "missing attempt_id".to_string()))?;

    Ok((attempt_id, speech_text(provider, &fields)))
}

/// Route the utterance to the conversation, opening it on first contact
async fn converse(
    state: &AppState,
    attempt_id: Uuid,
    text: Option<String>,
) -> Result<AgentReply, DomainError> {
    let engine = &state.engine;
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        // Answer pickup or silence
        return engine.dispatcher.on_answer(attempt_id).await;
    };

    match engine.conversations.handle_speech(attempt_id, text.clone()).await {
        Err(DomainError::NotFound { .. }) => {
            // Speech arrived before the answered status callback
            engine.dispatcher.on_answer(attempt_id).await?;
            engine.conversations.handle_speech(attempt_id, text).await
        }
        other => other,
    }
}

async fn render_reply(
    state: &AppState,
    provider: Provider,
    attempt_id: Uuid,
    reply: AgentReply,
    wants_audio: bool,
) -> Response {
    if provider == Provider::Twilio {
        let action = format!(
            "{}/webhooks/twilio/speech?attempt_id={}",
            state.config.server.public_base_url.trim_end_matches('/'),
            attempt_id
        );
        return twiml(render_twiml(
            &reply.text,
            &action,
            reply.ended,
            &state.config.conversation.language,
        ));
    }

    if wants_audio {
        match state.engine.tts.synthesize(&reply.text).await {
            Ok(audio) => {
                let mut response = audio.into_response();
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    header::HeaderValue::from_static("audio/wav"),
                );
                if reply.ended {
                    response.headers_mut().insert(
                        "X-Dialflow-Hangup",
                        header::HeaderValue::from_static("true"),
                    );
                }
                return response;
            }
            Err(e) => {
                tracing::warn!(attempt_id = %attempt_id, error = %e, "Synthesis failed, replying with text");
            }
        }
    }

    Json(SpeechReplyResponse::from_reply(attempt_id, reply)).into_response()
}

fn twiml(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, "application/xml")],
        body,
    )
        .into_response()
}

fn accepts_audio(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.to_ascii_lowercase().contains("audio/"))
}

fn error_status(e: &DomainError) -> (StatusCode, String) {
    let status = match e {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        DomainError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        DomainError::Cancelled => StatusCode::GONE,
        DomainError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/:provider/status", post(status_callback))
        .route("/webhooks/:provider/speech", post(speech_callback))
}
