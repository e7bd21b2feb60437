//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no domain behaviour.
//! Domain types, status enums and the cascade live in the `engine` crate;
//! statuses are stored here as their canonical TEXT form (`IN_PROGRESS`,
//! `NEW`, …) and parsed on the way back out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// signature_workflows
// ---------------------------------------------------------------------------

/// A persisted workflow header row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowRow {
    pub id: Uuid,
    pub public_code: String,
    pub reference: String,
    pub subject: String,
    pub message: Option<String>,
    pub status: String,
    pub sender_id: Uuid,
    /// Opaque document-context snapshot taken at build time.
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub init_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// signature_lines
// ---------------------------------------------------------------------------

/// A persisted addressee line row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LineRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub line_number: i32,
    pub status: String,
    pub started_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// signature_groups
// ---------------------------------------------------------------------------

/// A persisted addressee group row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub line_id: Uuid,
    pub group_number: i32,
    /// `ALL` or `ANY`.
    pub rule: String,
    pub status: String,
}

// ---------------------------------------------------------------------------
// signature_actions
// ---------------------------------------------------------------------------

/// A persisted signature action row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActionRow {
    pub id: Uuid,
    pub group_id: Uuid,
    pub signer_id: Uuid,
    pub kind: String,
    pub status: String,
    pub action_date: Option<DateTime<Utc>>,
    /// Serialised `SignaturePayload`, present once the action is terminal.
    pub signature: Option<serde_json::Value>,
    pub reject_kind: Option<String>,
    pub reject_reason: Option<String>,
    pub notification_sent: bool,
    pub notification_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// signature_audit_log
// ---------------------------------------------------------------------------

/// A persisted audit record.  Append-only — there is no update path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditRow {
    pub id: Uuid,
    pub workflow_id: Option<Uuid>,
    pub action_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// pending-action projection
// ---------------------------------------------------------------------------

/// One row of the pending-work inbox query (action joined up to its
/// workflow).  Read-only projection, never written back.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingActionRow {
    pub action_id: Uuid,
    pub signer_id: Uuid,
    pub kind: String,
    pub line_number: i32,
    pub line_status: String,
    pub workflow_id: Uuid,
    pub public_code: String,
    pub subject: String,
    pub expiration_date: Option<DateTime<Utc>>,
}
