//! DND Routes
//!
//! Operator management of local opt-outs and lookups of the compliance
//! answer for a number.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::models::{AddBlockRequest, DndRecordResponse, DndStatusResponse};
use crate::AppState;

/// Record a permanent local block
pub async fn add_block(
    State(state): State<AppState>,
    Json(payload): Json<AddBlockRequest>,
) -> Result<(StatusCode, Json<DndRecordResponse>), (StatusCode, String)> {
    let reason = payload
        .reason
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or("operator request");

    let record = state
        .engine
        .gate
        .add_local_block(&payload.phone, reason)
        .await
        .map_err(|e| match e {
            dialflow::DomainError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(DndRecordResponse::from_domain(record)),
    ))
}

/// Compliance answer for a number (consults the registry on a cache miss)
pub async fn get_status(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<DndStatusResponse>, (StatusCode, String)> {
    let gate = &state.engine.gate;
    let check = gate.check(&phone).await;
    let record = gate
        .cached(&phone)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(DndStatusResponse::new(gate.key(&phone), check, record)))
}

/// Remove a local block or cached registry answer
pub async fn remove_block(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let removed = state
        .engine
        .gate
        .remove_block(&phone)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("No DND record for {}", phone)))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dialflow/dnd", post(add_block))
        .route("/dialflow/dnd/:phone", get(get_status).delete(remove_block))
}

#[cfg(test)]
mod tests {
    use crate::testing::TestBedBuilder;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use dialflow::CallOutcome;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_block_lookup_and_remove() {
        let bed = TestBedBuilder::new().build();
        let app = crate::build_router(bed.app_state());

        let created = app
            .clone()
            .oneshot(
                Request::post("/dialflow/dnd")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"phone": "+919800000099", "reason": "complaint"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let status = app
            .clone()
            .oneshot(
                Request::get("/dialflow/dnd/+919800000099")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(status.status(), StatusCode::OK);
        let body = to_bytes(status.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["blocked"], true);
        assert_eq!(json["record"]["source"], "local");
        assert_eq!(json["record"]["reason"], "complaint");

        let removed = app
            .clone()
            .oneshot(
                Request::delete("/dialflow/dnd/+919800000099")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(removed.status(), StatusCode::NO_CONTENT);

        let again = app
            .oneshot(
                Request::delete("/dialflow/dnd/+919800000099")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_national_format_block_stops_dialing() {
        let bed = TestBedBuilder::new().build();
        bed.start();
        let app = crate::build_router(bed.app_state());

        let created = app
            .clone()
            .oneshot(
                Request::post("/dialflow/dnd")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"phone": "09876543210"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let body = to_bytes(created.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["phone"], "+919876543210");

        let lead_id = Uuid::new_v4();
        let submitted = app
            .oneshot(
                Request::post("/dialflow/calls")
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "lead_id": lead_id,
                            "campaign_id": Uuid::new_v4(),
                            "phone": "09876543210"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(submitted.status(), StatusCode::ACCEPTED);

        let result = bed.wait_for_lead_result(lead_id).await;
        assert_eq!(result.outcome, CallOutcome::Dnd);
        assert!(bed.telephony.dialed().is_empty());
        assert_eq!(bed.engine.stats.snapshot().dnd_rejected, 1);
    }
}
