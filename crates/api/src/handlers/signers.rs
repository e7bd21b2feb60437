use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use engine::PendingAction;

use super::status_for;
use crate::AppState;

pub async fn pending(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PendingAction>>, (StatusCode, Json<Value>)> {
    match state.engine.list_pending_actions(id).await {
        Ok(actions) => Ok(Json(actions)),
        Err(e) => Err((status_for(&e), Json(json!({ "error": e.to_string() })))),
    }
}
