//! Audit event types.
//!
//! Every state transition produces one or more [`AuditRecord`]s.  They are
//! append-only: the sink persists them inside the same transaction as the
//! transition, and nothing ever mutates or deletes them.  Records reference
//! workflows and actions by id only — weak back-references, no ownership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ActorContext, ClientMeta};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventKind {
    WorkflowCreated,
    DocumentSigned,
    ActionRejected,
    LineCompletedNextActivated,
    WorkflowCompleted,
    WorkflowRejected,
    WorkflowCancelled,
    WorkflowExpired,
}

impl std::fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::WorkflowCreated => "WORKFLOW_CREATED",
            Self::DocumentSigned => "DOCUMENT_SIGNED",
            Self::ActionRejected => "ACTION_REJECTED",
            Self::LineCompletedNextActivated => "LINE_COMPLETED_NEXT_ACTIVATED",
            Self::WorkflowCompleted => "WORKFLOW_COMPLETED",
            Self::WorkflowRejected => "WORKFLOW_REJECTED",
            Self::WorkflowCancelled => "WORKFLOW_CANCELLED",
            Self::WorkflowExpired => "WORKFLOW_EXPIRED",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AuditEventKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WORKFLOW_CREATED" => Ok(Self::WorkflowCreated),
            "DOCUMENT_SIGNED" => Ok(Self::DocumentSigned),
            "ACTION_REJECTED" => Ok(Self::ActionRejected),
            "LINE_COMPLETED_NEXT_ACTIVATED" => Ok(Self::LineCompletedNextActivated),
            "WORKFLOW_COMPLETED" => Ok(Self::WorkflowCompleted),
            "WORKFLOW_REJECTED" => Ok(Self::WorkflowRejected),
            "WORKFLOW_CANCELLED" => Ok(Self::WorkflowCancelled),
            "WORKFLOW_EXPIRED" => Ok(Self::WorkflowExpired),
            other => Err(format!("unknown audit event type: {other}")),
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub workflow_id: Option<Uuid>,
    pub action_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub event: AuditEventKind,
    /// Structured event payload — topology snapshots, signature evidence,
    /// line numbers, whatever the event needs.
    pub payload: serde_json::Value,
    pub client: ClientMeta,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Record an event attributed to `ctx`.
    pub fn new(
        event: AuditEventKind,
        payload: serde_json::Value,
        ctx: &ActorContext,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: None,
            action_id: None,
            user_id: Some(ctx.user_id),
            event,
            payload,
            client: ctx.client.clone(),
            recorded_at: now,
        }
    }

    pub fn for_workflow(mut self, workflow_id: Uuid) -> Self {
        self.workflow_id = Some(workflow_id);
        self
    }

    pub fn for_action(mut self, action_id: Uuid) -> Self {
        self.action_id = Some(action_id);
        self
    }
}
