//! `SignatureEngine` — the async orchestrator around the pure cascade.
//!
//! Every mutating operation runs as one transaction with the workflow row
//! locked `FOR UPDATE`, so concurrent signers (and the external
//! cancel/expire sweep) serialize per workflow and a completed line
//! advances at most once.  Audit records ride the same transaction; they
//! are durable exactly when the transition is.  Notifications go out after
//! commit and are fire-and-forget.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use db::repository::{actions as action_repo, audit as audit_repo, workflows as workflow_repo};
use db::{DbError, DbPool};
use hooks::{Notification, NotificationEmitter, NotificationKind, SignerDirectory};

use crate::audit::{AuditEventKind, AuditRecord};
use crate::builder::{build_workflow, BuildRequest};
use crate::cascade::apply_action;
use crate::models::{
    ActionKind, ActionStatus, ActorContext, Decision, LineStatus, SignaturePayload, WorkflowStatus,
    WorkflowTree,
};
use crate::{persist, EngineError};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What a caller gets back from [`SignatureEngine::submit_action`].
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub workflow_status: WorkflowStatus,
    /// The signature evidence recorded on the action.
    pub signature: SignaturePayload,
    /// True when this submission completed the final line — the governed
    /// document may now be treated as finally authorized.
    pub finally_authorized: bool,
}

/// One entry of a signer's pending-work inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    pub action_id: Uuid,
    pub workflow_id: Uuid,
    pub public_code: String,
    pub subject: String,
    pub kind: ActionKind,
    pub line_number: u32,
    /// False while the action's line has not been reached yet (advance
    /// visibility only).
    pub line_active: bool,
    /// Informational: the workflow's expiration time has already passed.
    /// Enforcement is the external sweep's job, not the reader's.
    pub expired: bool,
}

// ---------------------------------------------------------------------------
// SignatureEngine
// ---------------------------------------------------------------------------

/// Stateless orchestrator for signature workflows.
///
/// Construct one per process and share it; all per-workflow state lives in
/// the database.
pub struct SignatureEngine {
    pool: DbPool,
    notifier: Arc<dyn NotificationEmitter>,
}

impl SignatureEngine {
    pub fn new(pool: DbPool, notifier: Arc<dyn NotificationEmitter>) -> Self {
        Self { pool, notifier }
    }

    /// Build and persist a new workflow from a declarative topology.
    ///
    /// # Errors
    /// `InvalidTopology`, `NoEligibleSigners`, `Directory` at build time;
    /// `Database` if the insert fails (nothing is persisted then).
    #[instrument(skip(self, ctx, request, directory), fields(sender = %ctx.user_id))]
    pub async fn create_workflow(
        &self,
        ctx: &ActorContext,
        request: BuildRequest,
        directory: &dyn SignerDirectory,
    ) -> Result<WorkflowTree, EngineError> {
        let now = Utc::now();
        let output = build_workflow(ctx, request, directory, now).await?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        persist::insert_tree(&mut tx, &output.tree).await?;
        persist::append_audit(&mut tx, std::slice::from_ref(&output.audit)).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            workflow_id = %output.tree.workflow.id,
            public_code = %output.tree.workflow.public_code,
            lines = output.tree.lines.len(),
            "workflow created"
        );

        dispatch_notifications(self.notifier.as_ref(), &output.notifications).await;
        Ok(output.tree)
    }

    /// Apply one signer decision and run the full cascade atomically.
    ///
    /// Either the whole chain (action → group → line → activation or
    /// completion, plus all audit records) commits, or none of it does.
    #[instrument(skip(self, ctx, decision), fields(workflow_id = %workflow_id, signer = %ctx.user_id))]
    pub async fn submit_action(
        &self,
        ctx: &ActorContext,
        workflow_id: Uuid,
        decision: Decision,
        signature_method: &str,
    ) -> Result<SubmitOutcome, EngineError> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let row = workflow_repo::lock_workflow(&mut tx, workflow_id)
            .await
            .map_err(|e| not_found(e, workflow_id))?;
        let mut tree = persist::load_tree(&mut tx, row).await?;

        let signature = SignaturePayload {
            method: signature_method.to_string(),
            timestamp: now,
            content_hash: content_hash(&tree.workflow.public_code, ctx.user_id, now),
            client: ctx.client.clone(),
            workflow_code: tree.workflow.public_code.clone(),
        };

        let outcome = apply_action(&mut tree, ctx, decision, signature, now)?;

        persist::persist_dirty(&mut tx, &tree, &outcome.dirty).await?;
        persist::append_audit(&mut tx, &outcome.audit).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            status = %outcome.workflow_status,
            finally_authorized = outcome.finally_authorized,
            "signing action applied"
        );

        dispatch_notifications(self.notifier.as_ref(), &outcome.notifications).await;

        Ok(SubmitOutcome {
            workflow_status: outcome.workflow_status,
            signature: outcome.signature,
            finally_authorized: outcome.finally_authorized,
        })
    }

    /// Explicit external cancellation.  The engine never cancels on its
    /// own; the surrounding system decides and calls in.
    #[instrument(skip(self, ctx), fields(workflow_id = %workflow_id))]
    pub async fn cancel_workflow(
        &self,
        ctx: &ActorContext,
        workflow_id: Uuid,
        reason: &str,
    ) -> Result<(), EngineError> {
        self.close_workflow(
            ctx,
            workflow_id,
            WorkflowStatus::Cancelled,
            AuditEventKind::WorkflowCancelled,
            serde_json::json!({ "reason": reason }),
        )
        .await
    }

    /// Explicit expiry, driven by the external timed sweep.
    #[instrument(skip(self, ctx), fields(workflow_id = %workflow_id))]
    pub async fn expire_workflow(
        &self,
        ctx: &ActorContext,
        workflow_id: Uuid,
    ) -> Result<(), EngineError> {
        self.close_workflow(
            ctx,
            workflow_id,
            WorkflowStatus::Expired,
            AuditEventKind::WorkflowExpired,
            serde_json::json!({}),
        )
        .await
    }

    async fn close_workflow(
        &self,
        ctx: &ActorContext,
        workflow_id: Uuid,
        status: WorkflowStatus,
        event: AuditEventKind,
        payload: serde_json::Value,
    ) -> Result<(), EngineError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let row = workflow_repo::lock_workflow(&mut tx, workflow_id)
            .await
            .map_err(|e| not_found(e, workflow_id))?;
        let tree = persist::load_tree(&mut tx, row).await?;
        if tree.workflow.status.is_terminal() {
            return Err(EngineError::WorkflowNotActive {
                workflow_id,
                status: tree.workflow.status,
            });
        }

        workflow_repo::update_workflow_state(&mut tx, workflow_id, &status.to_string(), None)
            .await?;
        let record = AuditRecord::new(event, payload, ctx, now).for_workflow(workflow_id);
        persist::append_audit(&mut tx, std::slice::from_ref(&record)).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(%status, "workflow closed externally");
        dispatch_notifications(
            self.notifier.as_ref(),
            &pending_closure_notifications(&tree),
        )
        .await;
        Ok(())
    }

    /// Permanently delete a workflow; lines, groups and actions cascade at
    /// the schema level.  Audit records hold weak references and survive.
    #[instrument(skip(self), fields(workflow_id = %workflow_id))]
    pub async fn delete_workflow(&self, workflow_id: Uuid) -> Result<(), EngineError> {
        workflow_repo::delete_workflow(&self.pool, workflow_id)
            .await
            .map_err(|e| not_found(e, workflow_id))?;
        info!("workflow deleted");
        Ok(())
    }

    /// Read-only snapshot of the full tree.  Never takes the write lock.
    pub async fn get_workflow_state(&self, workflow_id: Uuid) -> Result<WorkflowTree, EngineError> {
        let row = workflow_repo::get_workflow(&self.pool, workflow_id)
            .await
            .map_err(|e| not_found(e, workflow_id))?;
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        persist::load_tree(&mut conn, row).await
    }

    /// Read-only tree lookup by the short public code.
    pub async fn get_workflow_state_by_code(
        &self,
        public_code: &str,
    ) -> Result<WorkflowTree, EngineError> {
        let row = workflow_repo::get_workflow_by_code(&self.pool, public_code)
            .await
            .map_err(|e| match e {
                DbError::NotFound => EngineError::WorkflowCodeNotFound(public_code.to_string()),
                other => other.into(),
            })?;
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        persist::load_tree(&mut conn, row).await
    }

    /// A signer's pending-work inbox, with advance visibility of upcoming
    /// lines and an informational expiry annotation.
    pub async fn list_pending_actions(
        &self,
        signer_id: Uuid,
    ) -> Result<Vec<PendingAction>, EngineError> {
        let now = Utc::now();
        let rows = action_repo::list_pending_for_signer(&self.pool, signer_id).await?;

        rows.into_iter()
            .map(|row| {
                let kind: ActionKind = row.kind.parse().map_err(DbError::Corrupt)?;
                let line_status: LineStatus = row.line_status.parse().map_err(DbError::Corrupt)?;
                Ok(PendingAction {
                    action_id: row.action_id,
                    workflow_id: row.workflow_id,
                    public_code: row.public_code,
                    subject: row.subject,
                    kind,
                    line_number: row.line_number as u32,
                    line_active: line_status == LineStatus::InProgress,
                    expired: row.expiration_date.map(|e| e < now).unwrap_or(false),
                })
            })
            .collect()
    }

    /// Full audit trail for one workflow, oldest first.
    pub async fn audit_trail(&self, workflow_id: Uuid) -> Result<Vec<AuditRecord>, EngineError> {
        let rows = audit_repo::list_for_workflow(&self.pool, workflow_id).await?;
        rows.into_iter()
            .map(|row| persist::audit_from_row(row).map_err(EngineError::from))
            .collect()
    }
}

/// Closure notices for signers who were already alerted of a pending
/// action that will now never be acted on.  Signers whose line was never
/// reached were never contacted and stay uncontacted.
pub(crate) fn pending_closure_notifications(tree: &WorkflowTree) -> Vec<Notification> {
    let mut notes = Vec::new();
    for line in &tree.lines {
        for action in tree.actions_of_line(line.id) {
            if action.status == ActionStatus::New && action.notification_sent {
                notes.push(Notification {
                    signer_id: action.signer_id,
                    kind: NotificationKind::WorkflowClosed,
                    workflow_id: tree.workflow.id,
                    public_code: tree.workflow.public_code.clone(),
                    subject: tree.workflow.subject.clone(),
                    line_number: line.line_number,
                });
            }
        }
    }
    notes
}

fn not_found(e: DbError, workflow_id: Uuid) -> EngineError {
    match e {
        DbError::NotFound => EngineError::WorkflowNotFound(workflow_id),
        other => other.into(),
    }
}

/// SHA-256 over the signed content reference.
fn content_hash(public_code: &str, signer_id: Uuid, now: chrono::DateTime<Utc>) -> String {
    let digest = Sha256::digest(format!("{public_code}:{signer_id}:{}", now.to_rfc3339()));
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Deliver notifications after commit.  Failures are logged, never
/// surfaced — delivery must not undo a committed cascade.
pub async fn dispatch_notifications(notifier: &dyn NotificationEmitter, notes: &[Notification]) {
    for note in notes {
        if let Err(e) = notifier.notify(note).await {
            warn!(
                signer = %note.signer_id,
                workflow = %note.workflow_id,
                error = %e,
                "notification delivery failed"
            );
        }
    }
}
