//! Call Routes
//!
//! Intake from the campaign scheduler plus read-only views of attempts,
//! results and engine statistics.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use dialflow::CallResult;
use dialflow_telephony::normalize_phone;

use crate::models::{AttemptResponse, StatsResponse, SubmitCallRequest, SubmitCallResponse};
use crate::AppState;

/// Enqueue a call request
pub async fn submit_call(
    State(state): State<AppState>,
    Json(payload): Json<SubmitCallRequest>,
) -> Result<(StatusCode, Json<SubmitCallResponse>), (StatusCode, String)> {
    let phone = normalize_phone(&payload.phone, state.config.telephony.default_country())
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let request = payload.into_domain(phone.clone());
    let request_id = state.engine.dispatcher.submit(request).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitCallResponse { request_id, phone }),
    ))
}

/// Finalized result of an attempt
pub async fn get_result(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<CallResult>, (StatusCode, String)> {
    state
        .engine
        .recorder
        .get(attempt_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("No result for attempt {}", attempt_id),
            )
        })
}

/// Active attempt, refreshed from the provider
pub async fn get_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<AttemptResponse>, (StatusCode, String)> {
    let attempt = match state.engine.dispatcher.refresh_attempt(attempt_id).await {
        Ok(attempt) => attempt,
        Err(e) => {
            // Provider unreachable: fall back to what we know
            tracing::debug!(attempt_id = %attempt_id, error = %e, "Attempt refresh failed");
            state
                .engine
                .attempts
                .get(attempt_id)
                .await
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        }
    };

    let attempt = attempt.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("Attempt {} is not active", attempt_id),
        )
    })?;
    let live = state.engine.conversations.is_live(attempt.id);
    Ok(Json(AttemptResponse::from_domain(attempt, live)))
}

/// Tear down a live conversation: the call is hung up and finalized
pub async fn cancel_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.engine.conversations.cancel(attempt_id) {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            format!("No live conversation for attempt {}", attempt_id),
        ))
    }
}

/// Engine statistics
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    let engine = &state.engine;
    let active_attempts = engine
        .attempts
        .count()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(StatsResponse {
        counters: engine.stats.snapshot(),
        queue: engine.queue.depth().await,
        active_attempts,
        live_conversations: engine.conversations.live_count(),
        slots_in_use: engine.slots.in_use(),
        slots_capacity: engine.slots.capacity(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dialflow/calls", post(submit_call))
        .route("/dialflow/results/:attempt_id", get(get_result))
        .route("/dialflow/attempts/:attempt_id", get(get_attempt))
        .route("/dialflow/attempts/:attempt_id/cancel", post(cancel_attempt))
        .route("/dialflow/stats", get(get_stats))
}

#[cfg(test)]
mod tests {
    use crate::testing::TestBedBuilder;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn submit(body: serde_json::Value) -> Request<Body> {
        Request::post("/dialflow/calls")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_normalizes_and_enqueues() {
        let bed = TestBedBuilder::new().build();
        let app = crate::build_router(bed.app_state());

        let response = app
            .oneshot(submit(serde_json::json!({
                "lead_id": Uuid::new_v4(),
                "campaign_id": Uuid::new_v4(),
                "phone": "98765 43210",
                "lead": {"company": "Sharma Sweets", "city": "Jaipur"}
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["phone"], "+919876543210");
        assert_eq!(bed.engine.stats.snapshot().enqueued, 1);
        assert_eq!(bed.engine.queue.depth().await.ready, 1);
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_number() {
        let bed = TestBedBuilder::new().build();
        let response = crate::build_router(bed.app_state())
            .oneshot(submit(serde_json::json!({
                "lead_id": Uuid::new_v4(),
                "campaign_id": Uuid::new_v4(),
                "phone": "call me maybe"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unknown_result_is_404() {
        let bed = TestBedBuilder::new().build();
        let response = crate::build_router(bed.app_state())
            .oneshot(
                Request::get(format!("/dialflow/results/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stats_shape() {
        let bed = TestBedBuilder::new().build();
        let response = crate::build_router(bed.app_state())
            .oneshot(Request::get("/dialflow/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["failure_rate"], 0.0);
        assert_eq!(json["queue"]["ready"], 0);
        assert_eq!(json["slots_capacity"], bed.config.dispatcher.max_concurrent_calls);
    }
}
