use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use engine::{ActorContext, AuditRecord, BuildRequest, TopologySpec, WorkflowTree};

use super::{client_meta, status_for};
use crate::AppState;

#[derive(serde::Deserialize)]
pub struct CreateWorkflowDto {
    pub sender_id: Uuid,
    pub reference: String,
    pub subject: String,
    pub message: Option<String>,
    #[serde(default)]
    pub context: Value,
    /// Defaults to 30 days, matching the usual certificate window.
    pub expires_in_days: Option<i64>,
    pub topology: TopologySpec,
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateWorkflowDto>,
) -> Result<(StatusCode, Json<WorkflowTree>), (StatusCode, Json<Value>)> {
    let ctx = ActorContext::new(payload.sender_id).with_client(client_meta(&headers));
    let request = BuildRequest {
        reference: payload.reference,
        subject: payload.subject,
        message: payload.message,
        context: payload.context,
        expires_in_days: payload.expires_in_days.or(Some(30)),
        topology: payload.topology,
    };

    match state
        .engine
        .create_workflow(&ctx, request, state.directory.as_ref())
        .await
    {
        Ok(tree) => Ok((StatusCode::CREATED, Json(tree))),
        Err(e) => Err((status_for(&e), Json(json!({ "error": e.to_string() })))),
    }
}

pub async fn get_state(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<WorkflowTree>, (StatusCode, Json<Value>)> {
    match state.engine.get_workflow_state(id).await {
        Ok(tree) => Ok(Json(tree)),
        Err(e) => Err((status_for(&e), Json(json!({ "error": e.to_string() })))),
    }
}

pub async fn get_by_code(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<WorkflowTree>, (StatusCode, Json<Value>)> {
    match state.engine.get_workflow_state_by_code(&code).await {
        Ok(tree) => Ok(Json(tree)),
        Err(e) => Err((status_for(&e), Json(json!({ "error": e.to_string() })))),
    }
}

pub async fn remove(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    match state.engine.delete_workflow(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err((status_for(&e), Json(json!({ "error": e.to_string() })))),
    }
}

pub async fn audit(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AuditRecord>>, (StatusCode, Json<Value>)> {
    match state.engine.audit_trail(id).await {
        Ok(records) => Ok(Json(records)),
        Err(e) => Err((status_for(&e), Json(json!({ "error": e.to_string() })))),
    }
}

#[derive(serde::Deserialize)]
pub struct CancelWorkflowDto {
    pub user_id: Uuid,
    pub reason: String,
}

pub async fn cancel(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CancelWorkflowDto>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let ctx = ActorContext::new(payload.user_id).with_client(client_meta(&headers));
    match state.engine.cancel_workflow(&ctx, id, &payload.reason).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err((status_for(&e), Json(json!({ "error": e.to_string() })))),
    }
}
