use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use engine::{ActorContext, Decision, SubmitOutcome};

use super::{client_meta, status_for};
use crate::AppState;

#[derive(serde::Deserialize)]
pub struct SubmitActionDto {
    pub signer_id: Uuid,
    /// `{"decision": "SIGN"}`, `{"decision": "APPROVE"}` or
    /// `{"decision": "REJECT", "kind": ..., "reason": ...}`.
    #[serde(flatten)]
    pub decision: Decision,
    /// Signature method recorded in the payload; defaults to ELECTRONIC.
    pub method: Option<String>,
}

pub async fn submit(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitActionDto>,
) -> Result<Json<SubmitOutcome>, (StatusCode, Json<Value>)> {
    let ctx = ActorContext::new(payload.signer_id).with_client(client_meta(&headers));
    let method = payload.method.as_deref().unwrap_or("ELECTRONIC");

    match state
        .engine
        .submit_action(&ctx, id, payload.decision, method)
        .await
    {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => Err((status_for(&e), Json(json!({ "error": e.to_string() })))),
    }
}
