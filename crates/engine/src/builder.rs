//! Workflow builder — declarative topology in, live workflow tree out.
//!
//! Resolves each group's role through the [`SignerDirectory`], then
//! constructs the full tree atomically: workflow `IN_PROGRESS`, line 1
//! active and started, every later line `NEW`.  The output also carries
//! the `WORKFLOW_CREATED` audit record and the pending notifications for
//! line 1's signers; the caller persists and dispatches them.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use hooks::{Notification, NotificationKind, SignerDirectory};

use crate::audit::{AuditEventKind, AuditRecord};
use crate::models::{
    Action, ActionKind, ActionStatus, ActorContext, Group, GroupRule, GroupStatus, Line,
    LineStatus, Workflow, WorkflowStatus, WorkflowTree,
};
use crate::topology::TopologySpec;
use crate::{code, EngineError};

/// Everything needed to start one signature process.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Free-text reference (e.g. a case or certificate number).
    pub reference: String,
    pub subject: String,
    pub message: Option<String>,
    /// Opaque document context snapshotted onto the workflow.
    pub context: serde_json::Value,
    /// Days until the workflow may be expired by the external sweep.
    pub expires_in_days: Option<i64>,
    pub topology: TopologySpec,
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutput {
    pub tree: WorkflowTree,
    /// The `WORKFLOW_CREATED` record, to be appended with the tree insert.
    pub audit: AuditRecord,
    /// Pending alerts for line 1's signers.
    pub notifications: Vec<Notification>,
}

/// Build a fully-populated workflow from a topology and resolved signers.
///
/// # Errors
/// - [`EngineError::InvalidTopology`] for a structurally unusable topology.
/// - [`EngineError::NoEligibleSigners`] when a group's role resolves empty.
/// - [`EngineError::Directory`] when the directory itself fails.
pub async fn build_workflow(
    ctx: &ActorContext,
    request: BuildRequest,
    directory: &dyn SignerDirectory,
    now: DateTime<Utc>,
) -> Result<BuildOutput, EngineError> {
    request.topology.validate()?;

    let workflow_id = Uuid::new_v4();
    let public_code = code::generate();

    let mut lines = Vec::with_capacity(request.topology.lines.len());
    let mut groups = Vec::new();
    let mut actions = Vec::new();
    let mut topology_snapshot = Vec::new();

    for (line_idx, line_spec) in request.topology.lines.iter().enumerate() {
        let line_number = (line_idx + 1) as u32;
        let first_line = line_idx == 0;

        let line = Line {
            id: Uuid::new_v4(),
            workflow_id,
            line_number,
            status: if first_line { LineStatus::InProgress } else { LineStatus::New },
            started_date: first_line.then_some(now),
            completed_date: None,
        };

        let mut line_snapshot = Vec::new();

        for (group_idx, group_spec) in line_spec.groups.iter().enumerate() {
            let mut signers = directory.resolve(&group_spec.role).await?;
            dedupe_preserving_order(&mut signers);

            if signers.is_empty() {
                return Err(EngineError::NoEligibleSigners {
                    role: group_spec.role.clone(),
                });
            }

            // A multi-signer first-responder group needs only one signature;
            // a single-signer group is trivially ALL.
            let rule = if group_spec.first_responder_sufficient && signers.len() > 1 {
                GroupRule::Any
            } else {
                GroupRule::All
            };

            let group = Group {
                id: Uuid::new_v4(),
                line_id: line.id,
                group_number: (group_idx + 1) as u32,
                rule,
                status: if first_line { GroupStatus::InProgress } else { GroupStatus::New },
            };

            line_snapshot.push(json!({
                "group_number": group.group_number,
                "role": group_spec.role,
                "rule": rule.to_string(),
                "signers": signers,
            }));

            for signer_id in &signers {
                actions.push(Action {
                    id: Uuid::new_v4(),
                    group_id: group.id,
                    signer_id: *signer_id,
                    kind: ActionKind::Sign,
                    status: ActionStatus::New,
                    action_date: None,
                    signature: None,
                    reject_kind: None,
                    reject_reason: None,
                    notification_sent: false,
                    notification_date: None,
                    created_at: now,
                });
            }

            groups.push(group);
        }

        topology_snapshot.push(json!({
            "line_number": line_number,
            "groups": line_snapshot,
        }));

        lines.push(line);
    }

    let workflow = Workflow {
        id: workflow_id,
        public_code: public_code.clone(),
        reference: request.reference,
        subject: request.subject,
        message: request.message,
        status: WorkflowStatus::InProgress,
        sender_id: ctx.user_id,
        context: request.context,
        created_at: now,
        init_date: Some(now),
        expiration_date: request.expires_in_days.map(|days| now + Duration::days(days)),
        completion_date: None,
    };

    let mut tree = WorkflowTree {
        workflow,
        lines,
        groups,
        actions,
    };

    // Line 1 is active from the start, so its signers are notified at
    // creation and their actions flagged accordingly.
    let first_line_id = tree.lines[0].id;
    let notifications = mark_and_collect_notifications(&mut tree, first_line_id, now);

    let audit = AuditRecord::new(
        AuditEventKind::WorkflowCreated,
        json!({
            "public_code": public_code,
            "reference": tree.workflow.reference,
            "lines": tree.lines.len(),
            "total_actions": tree.total_actions(),
            "topology": topology_snapshot,
        }),
        ctx,
        now,
    )
    .for_workflow(workflow_id);

    Ok(BuildOutput {
        tree,
        audit,
        notifications,
    })
}

/// Flag every action of `line_id` as notified and return the alerts to
/// dispatch.  Shared with the cascade's next-line activation.
pub(crate) fn mark_and_collect_notifications(
    tree: &mut WorkflowTree,
    line_id: Uuid,
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let line_number = tree
        .lines
        .iter()
        .find(|l| l.id == line_id)
        .map(|l| l.line_number)
        .unwrap_or(0);
    let workflow_id = tree.workflow.id;
    let public_code = tree.workflow.public_code.clone();
    let subject = tree.workflow.subject.clone();

    let group_ids: Vec<Uuid> = tree.groups_of_line(line_id).map(|g| g.id).collect();

    let mut notes = Vec::new();
    for action in tree
        .actions
        .iter_mut()
        .filter(|a| group_ids.contains(&a.group_id))
    {
        action.notification_sent = true;
        action.notification_date = Some(now);
        notes.push(Notification {
            signer_id: action.signer_id,
            kind: NotificationKind::SignaturePending,
            workflow_id,
            public_code: public_code.clone(),
            subject: subject.clone(),
            line_number,
        });
    }
    notes
}

fn dedupe_preserving_order(signers: &mut Vec<Uuid>) {
    let mut seen = std::collections::HashSet::new();
    signers.retain(|s| seen.insert(*s));
}
