//! The signing cascade — the pure state machine at the heart of the engine.
//!
//! One submitted action drives the full derived-status recomputation:
//! action → group → line → next-line activation or workflow completion,
//! with rejection short-circuiting the whole chain.  No I/O happens here;
//! [`apply_action`] mutates the in-memory tree and reports everything the
//! caller must persist, append and dispatch.  The async engine wraps one
//! call in one transaction, so either the whole cascade commits or none
//! of it does.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use hooks::{Notification, NotificationKind};

use crate::audit::{AuditEventKind, AuditRecord};
use crate::builder::mark_and_collect_notifications;
use crate::models::{
    ActionStatus, ActorContext, Decision, GroupRule, GroupStatus, LineStatus, SignaturePayload,
    WorkflowStatus, WorkflowTree,
};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Entities touched by a cascade, so the persistence layer writes only
/// what changed.
#[derive(Debug, Default, Clone)]
pub struct DirtySet {
    pub workflow: bool,
    pub lines: Vec<Uuid>,
    pub groups: Vec<Uuid>,
    pub actions: Vec<Uuid>,
}

impl DirtySet {
    fn mark_line(&mut self, id: Uuid) {
        if !self.lines.contains(&id) {
            self.lines.push(id);
        }
    }

    fn mark_group(&mut self, id: Uuid) {
        if !self.groups.contains(&id) {
            self.groups.push(id);
        }
    }

    fn mark_action(&mut self, id: Uuid) {
        if !self.actions.contains(&id) {
            self.actions.push(id);
        }
    }
}

/// Everything one `apply_action` call produced.
#[derive(Debug)]
pub struct CascadeOutcome {
    /// Workflow status after the cascade.
    pub workflow_status: WorkflowStatus,
    /// The action that was acted on.
    pub action_id: Uuid,
    /// The signature payload recorded on the action.
    pub signature: SignaturePayload,
    /// True when this call completed the final line — the governed
    /// document may now be treated as finally authorized.
    pub finally_authorized: bool,
    /// Audit records, in emission order.  The per-action record
    /// (`DOCUMENT_SIGNED` / `ACTION_REJECTED`) is always last.
    pub audit: Vec<AuditRecord>,
    /// Alerts to dispatch after commit: the newly-activated line's
    /// signers, or closure notices for signers left pending by a
    /// rejection.
    pub notifications: Vec<Notification>,
    pub dirty: DirtySet,
}

// ---------------------------------------------------------------------------
// apply_action
// ---------------------------------------------------------------------------

/// Apply one signer decision to the tree and run the full cascade.
///
/// # Errors
/// - [`EngineError::WorkflowNotActive`] when the workflow was cancelled,
///   expired or never started.
/// - [`EngineError::NoPendingAction`] when no `NEW` action exists for this
///   signer in the currently active line (wrong signer, line not reached,
///   workflow already finished).
/// - [`EngineError::DuplicateSubmission`] when the signer already acted in
///   the still-active line.
///
/// Errors leave the tree untouched.
pub fn apply_action(
    tree: &mut WorkflowTree,
    ctx: &ActorContext,
    decision: Decision,
    signature: SignaturePayload,
    now: DateTime<Utc>,
) -> Result<CascadeOutcome, EngineError> {
    let workflow_id = tree.workflow.id;

    // ------------------------------------------------------------------
    // Preconditions — no mutation happens past an error.
    // ------------------------------------------------------------------
    match tree.workflow.status {
        WorkflowStatus::InProgress => {}
        // A finished workflow has no active line; the signer's act can no
        // longer be pending.
        WorkflowStatus::Completed | WorkflowStatus::Rejected => {
            return Err(EngineError::NoPendingAction {
                workflow_id,
                signer_id: ctx.user_id,
            });
        }
        status => {
            return Err(EngineError::WorkflowNotActive {
                workflow_id,
                status,
            });
        }
    }

    let (line_id, line_number) = tree
        .active_line()
        .map(|l| (l.id, l.line_number))
        .ok_or(EngineError::NoPendingAction {
            workflow_id,
            signer_id: ctx.user_id,
        })?;

    // Indexed lookup: signer → pending (created_at, id) within the
    // active line.
    let mut pending_by_signer: HashMap<Uuid, Vec<(DateTime<Utc>, Uuid)>> = HashMap::new();
    let mut actor_already_acted = false;
    for action in tree.actions_of_line(line_id) {
        if action.status == ActionStatus::New {
            pending_by_signer
                .entry(action.signer_id)
                .or_default()
                .push((action.created_at, action.id));
        } else if action.signer_id == ctx.user_id {
            actor_already_acted = true;
        }
    }

    let action_id = match pending_by_signer.get(&ctx.user_id).map(Vec::as_slice) {
        Some(&[(_, id)]) => id,
        Some(candidates @ &[first, ..]) => {
            // Should not happen given build-time deduplication; worth a
            // trace as a data-integrity condition.  Earliest-created wins.
            warn!(
                %workflow_id,
                signer_id = %ctx.user_id,
                candidates = candidates.len(),
                "multiple pending actions for one signer in the active line"
            );
            let (_, id) = candidates
                .iter()
                .fold(first, |best, c| if c.0 < best.0 { *c } else { best });
            id
        }
        None | Some(&[]) if actor_already_acted => {
            return Err(EngineError::DuplicateSubmission {
                workflow_id,
                signer_id: ctx.user_id,
            });
        }
        None | Some(&[]) => {
            return Err(EngineError::NoPendingAction {
                workflow_id,
                signer_id: ctx.user_id,
            });
        }
    };

    // Resolve arena positions before any mutation; a miss means the tree
    // itself is inconsistent and nothing may change.
    let not_pending = || EngineError::NoPendingAction {
        workflow_id,
        signer_id: ctx.user_id,
    };
    let action_idx = tree
        .actions
        .iter()
        .position(|a| a.id == action_id)
        .ok_or_else(not_pending)?;
    let group_id = tree.actions[action_idx].group_id;
    let group_idx = tree
        .groups
        .iter()
        .position(|g| g.id == group_id)
        .ok_or_else(not_pending)?;
    let line_idx = tree
        .lines
        .iter()
        .position(|l| l.id == line_id)
        .ok_or_else(not_pending)?;

    // ------------------------------------------------------------------
    // 1. Mark the action terminal.
    // ------------------------------------------------------------------
    let mut dirty = DirtySet::default();
    let terminal = decision.terminal_status();

    let action = &mut tree.actions[action_idx];
    action.status = terminal;
    action.action_date = Some(now);
    action.signature = Some(signature.clone());
    if let Decision::Reject { kind, reason } = &decision {
        action.reject_kind = kind.clone();
        action.reject_reason = Some(reason.clone());
    }
    dirty.mark_action(action_id);

    let mut audit = Vec::new();
    let mut notifications = Vec::new();
    let mut finally_authorized = false;

    // ------------------------------------------------------------------
    // 2. Rejection short-circuits group, line and workflow.
    // ------------------------------------------------------------------
    if terminal == ActionStatus::Rejected {
        tree.groups[group_idx].status = GroupStatus::Rejected;
        dirty.mark_group(group_id);

        tree.lines[line_idx].status = LineStatus::Rejected;
        dirty.mark_line(line_id);

        tree.workflow.status = WorkflowStatus::Rejected;
        dirty.workflow = true;

        // Signers still pending in the active line learn the workflow
        // closed under them.
        notifications = tree
            .actions_of_line(line_id)
            .into_iter()
            .filter(|a| a.status == ActionStatus::New)
            .map(|a| Notification {
                signer_id: a.signer_id,
                kind: NotificationKind::WorkflowClosed,
                workflow_id,
                public_code: tree.workflow.public_code.clone(),
                subject: tree.workflow.subject.clone(),
                line_number,
            })
            .collect();

        let (reject_kind, reject_reason) = match &decision {
            Decision::Reject { kind, reason } => (kind.clone(), Some(reason.clone())),
            _ => (None, None),
        };

        audit.push(
            AuditRecord::new(
                AuditEventKind::WorkflowRejected,
                json!({
                    "rejected_line": line_number,
                    "reject_kind": &reject_kind,
                    "reject_reason": &reject_reason,
                }),
                ctx,
                now,
            )
            .for_workflow(workflow_id),
        );
        audit.push(
            AuditRecord::new(
                AuditEventKind::ActionRejected,
                json!({
                    "line_number": line_number,
                    "reject_kind": reject_kind,
                    "reject_reason": reject_reason,
                    "signature": &signature,
                }),
                ctx,
                now,
            )
            .for_workflow(workflow_id)
            .for_action(action_id),
        );

        return Ok(CascadeOutcome {
            workflow_status: WorkflowStatus::Rejected,
            action_id,
            signature,
            finally_authorized: false,
            audit,
            notifications,
            dirty,
        });
    }

    // ------------------------------------------------------------------
    // 3. Recompute the owning group.
    // ------------------------------------------------------------------
    let group_satisfied = match tree.groups[group_idx].rule {
        // OR: the first satisfied action suffices.
        GroupRule::Any => true,
        // AND: every action must be terminal and non-reject.
        GroupRule::All => tree
            .actions_of_group(group_id)
            .all(|a| a.status.is_satisfied()),
    };

    if group_satisfied {
        tree.groups[group_idx].status = GroupStatus::Completed;
        dirty.mark_group(group_id);
    }

    // ------------------------------------------------------------------
    // 4. Recompute the line; activate the successor or finish.
    // ------------------------------------------------------------------
    if group_satisfied {
        let line_complete = tree
            .groups_of_line(line_id)
            .all(|g| g.status == GroupStatus::Completed);

        if line_complete {
            let line = &mut tree.lines[line_idx];
            line.status = LineStatus::Completed;
            line.completed_date = Some(now);
            dirty.mark_line(line_id);

            let next_number = line_number + 1;
            let next_idx = tree
                .lines
                .iter()
                .position(|l| l.line_number == next_number);

            if let Some(next_idx) = next_idx {
                let next_line = &mut tree.lines[next_idx];
                let next_id = next_line.id;
                next_line.status = LineStatus::InProgress;
                next_line.started_date = Some(now);
                dirty.mark_line(next_id);

                for group in tree.groups.iter_mut().filter(|g| g.line_id == next_id) {
                    group.status = GroupStatus::InProgress;
                    dirty.mark_group(group.id);
                }

                notifications = mark_and_collect_notifications(tree, next_id, now);
                for action in tree.actions_of_line(next_id) {
                    dirty.mark_action(action.id);
                }

                audit.push(
                    AuditRecord::new(
                        AuditEventKind::LineCompletedNextActivated,
                        json!({
                            "completed_line": line_number,
                            "activated_line": next_number,
                            "notified_signers": notifications.len(),
                        }),
                        ctx,
                        now,
                    )
                    .for_workflow(workflow_id),
                );
            } else {
                // No successor: the workflow is complete.
                tree.workflow.status = WorkflowStatus::Completed;
                tree.workflow.completion_date = Some(now);
                dirty.workflow = true;
                finally_authorized = true;

                audit.push(
                    AuditRecord::new(
                        AuditEventKind::WorkflowCompleted,
                        json!({
                            "final_line": line_number,
                            "total_actions": tree.total_actions(),
                        }),
                        ctx,
                        now,
                    )
                    .for_workflow(workflow_id),
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // 5. Per-action audit record, independent of cascade outcome.
    // ------------------------------------------------------------------
    audit.push(
        AuditRecord::new(
            AuditEventKind::DocumentSigned,
            json!({
                "line_number": line_number,
                "signature": &signature,
            }),
            ctx,
            now,
        )
        .for_workflow(workflow_id)
        .for_action(action_id),
    );

    Ok(CascadeOutcome {
        workflow_status: tree.workflow.status,
        action_id,
        signature,
        finally_authorized,
        audit,
        notifications,
        dirty,
    })
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Action, ActionKind, ClientMeta, Group, Line, Workflow,
    };

    // -------------------------------------------------------------------
    // Fixtures: build trees directly, one (rule, signers) tuple per group.
    // -------------------------------------------------------------------

    fn make_tree(spec: &[&[(GroupRule, &[Uuid])]]) -> WorkflowTree {
        let now = Utc::now();
        let workflow_id = Uuid::new_v4();
        let mut lines = Vec::new();
        let mut groups = Vec::new();
        let mut actions = Vec::new();

        for (line_idx, line_spec) in spec.iter().enumerate() {
            let first = line_idx == 0;
            let line = Line {
                id: Uuid::new_v4(),
                workflow_id,
                line_number: (line_idx + 1) as u32,
                status: if first { LineStatus::InProgress } else { LineStatus::New },
                started_date: first.then_some(now),
                completed_date: None,
            };

            for (group_idx, (rule, signers)) in line_spec.iter().enumerate() {
                let group = Group {
                    id: Uuid::new_v4(),
                    line_id: line.id,
                    group_number: (group_idx + 1) as u32,
                    rule: *rule,
                    status: if first { GroupStatus::InProgress } else { GroupStatus::New },
                };
                for signer_id in signers.iter() {
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
            lines.push(line);
        }

        WorkflowTree {
            workflow: Workflow {
                id: workflow_id,
                public_code: "TEST-TEST-TEST-TEST".into(),
                reference: "EXP-1".into(),
                subject: "test".into(),
                message: None,
                status: WorkflowStatus::InProgress,
                sender_id: Uuid::new_v4(),
                context: serde_json::Value::Null,
                created_at: now,
                init_date: Some(now),
                expiration_date: None,
                completion_date: None,
            },
            lines,
            groups,
            actions,
        }
    }

    fn payload(tree: &WorkflowTree) -> SignaturePayload {
        SignaturePayload {
            method: "ELECTRONIC".into(),
            timestamp: Utc::now(),
            content_hash: "deadbeef".into(),
            client: ClientMeta::default(),
            workflow_code: tree.workflow.public_code.clone(),
        }
    }

    fn sign(tree: &mut WorkflowTree, signer: Uuid) -> Result<CascadeOutcome, EngineError> {
        let ctx = ActorContext::new(signer);
        let p = payload(tree);
        apply_action(tree, &ctx, Decision::Sign, p, Utc::now())
    }

    fn reject(tree: &mut WorkflowTree, signer: Uuid, reason: &str) -> Result<CascadeOutcome, EngineError> {
        let ctx = ActorContext::new(signer);
        let p = payload(tree);
        apply_action(
            tree,
            &ctx,
            Decision::Reject { kind: None, reason: reason.into() },
            p,
            Utc::now(),
        )
    }

    fn assert_at_most_one_active_line(tree: &WorkflowTree) {
        let active = tree
            .lines
            .iter()
            .filter(|l| l.status == LineStatus::InProgress)
            .count();
        assert!(active <= 1, "{active} lines IN_PROGRESS");
        if tree.workflow.status == WorkflowStatus::InProgress {
            assert_eq!(active, 1);
        }
    }

    // -------------------------------------------------------------------
    // Group semantics
    // -------------------------------------------------------------------

    #[test]
    fn and_group_waits_for_every_signer() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tree = make_tree(&[&[(GroupRule::All, &[a, b])]]);

        let out = sign(&mut tree, a).unwrap();
        assert_eq!(out.workflow_status, WorkflowStatus::InProgress);
        assert!(!out.finally_authorized);
        let group = &tree.groups[0];
        assert_eq!(group.status, GroupStatus::InProgress);
        assert_at_most_one_active_line(&tree);

        let out = sign(&mut tree, b).unwrap();
        assert_eq!(out.workflow_status, WorkflowStatus::Completed);
        assert!(out.finally_authorized);
        assert_eq!(tree.groups[0].status, GroupStatus::Completed);
    }

    #[test]
    fn or_group_completes_on_first_signature() {
        let (b, c) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tree = make_tree(&[&[(GroupRule::Any, &[b, c])]]);

        let out = sign(&mut tree, b).unwrap();
        assert_eq!(out.workflow_status, WorkflowStatus::Completed);
        assert!(out.finally_authorized);

        // Exactly one cascade fired; the loser gets a structured failure.
        let err = sign(&mut tree, c).unwrap_err();
        assert!(matches!(err, EngineError::NoPendingAction { .. }));
        assert_eq!(tree.workflow.status, WorkflowStatus::Completed);
    }

    #[test]
    fn and_group_never_completes_with_pending_new_action() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut tree = make_tree(&[&[(GroupRule::All, &[a, b, c])]]);

        sign(&mut tree, a).unwrap();
        sign(&mut tree, c).unwrap();
        let group = &tree.groups[0];
        let has_new = tree
            .actions_of_group(group.id)
            .any(|x| x.status == ActionStatus::New);
        assert!(has_new);
        assert_ne!(group.status, GroupStatus::Completed);
    }

    // -------------------------------------------------------------------
    // Precondition failures perform no mutation
    // -------------------------------------------------------------------

    #[test]
    fn wrong_signer_fails_without_mutation() {
        let a = Uuid::new_v4();
        let mut tree = make_tree(&[&[(GroupRule::All, &[a])]]);
        let before = serde_json::to_value(&tree).unwrap();

        let err = sign(&mut tree, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, EngineError::NoPendingAction { .. }));
        assert_eq!(serde_json::to_value(&tree).unwrap(), before);
    }

    #[test]
    fn signer_on_inactive_line_fails_until_reached() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tree = make_tree(&[
            &[(GroupRule::All, &[a])],
            &[(GroupRule::All, &[b])],
        ]);

        // B's line is still NEW.
        let err = sign(&mut tree, b).unwrap_err();
        assert!(matches!(err, EngineError::NoPendingAction { .. }));

        sign(&mut tree, a).unwrap();
        // Line 2 is active now.
        let out = sign(&mut tree, b).unwrap();
        assert_eq!(out.workflow_status, WorkflowStatus::Completed);
    }

    #[test]
    fn double_submission_in_active_line_is_flagged() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tree = make_tree(&[&[(GroupRule::All, &[a, b])]]);

        sign(&mut tree, a).unwrap();
        let err = sign(&mut tree, a).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateSubmission { .. }));
        // B can still finish.
        assert!(sign(&mut tree, b).unwrap().finally_authorized);
    }

    #[test]
    fn cancelled_workflow_refuses_actions() {
        let a = Uuid::new_v4();
        let mut tree = make_tree(&[&[(GroupRule::All, &[a])]]);
        tree.workflow.status = WorkflowStatus::Cancelled;

        let err = sign(&mut tree, a).unwrap_err();
        assert!(matches!(
            err,
            EngineError::WorkflowNotActive { status: WorkflowStatus::Cancelled, .. }
        ));
    }

    // -------------------------------------------------------------------
    // Rejection
    // -------------------------------------------------------------------

    #[test]
    fn rejection_halts_progression() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tree = make_tree(&[
            &[(GroupRule::All, &[a])],
            &[(GroupRule::Any, &[b])],
        ]);

        let out = reject(&mut tree, a, "document incomplete").unwrap();
        assert_eq!(out.workflow_status, WorkflowStatus::Rejected);
        assert!(!out.finally_authorized);
        assert!(out.notifications.is_empty());

        // Line 2 never activates.
        assert_eq!(tree.line_by_number(2).unwrap().status, LineStatus::New);
        assert_eq!(tree.lines[0].status, LineStatus::Rejected);
        assert_eq!(tree.groups[0].status, GroupStatus::Rejected);

        let kinds: Vec<AuditEventKind> = out.audit.iter().map(|r| r.event).collect();
        assert_eq!(
            kinds,
            vec![AuditEventKind::WorkflowRejected, AuditEventKind::ActionRejected]
        );

        // Nothing proceeds past a rejection.
        let err = sign(&mut tree, b).unwrap_err();
        assert!(matches!(err, EngineError::NoPendingAction { .. }));
    }

    #[test]
    fn rejection_records_reason_on_action() {
        let a = Uuid::new_v4();
        let mut tree = make_tree(&[&[(GroupRule::All, &[a])]]);

        reject(&mut tree, a, "wrong certificate number").unwrap();
        let action = &tree.actions[0];
        assert_eq!(action.status, ActionStatus::Rejected);
        assert_eq!(action.reject_reason.as_deref(), Some("wrong certificate number"));
        assert!(action.action_date.is_some());
    }

    #[test]
    fn rejection_sends_closure_notices_to_remaining_pending_signers() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tree = make_tree(&[&[(GroupRule::All, &[a, b])]]);

        let out = reject(&mut tree, a, "not authorised").unwrap();
        assert_eq!(out.notifications.len(), 1);
        assert_eq!(out.notifications[0].signer_id, b);
        assert_eq!(out.notifications[0].kind, NotificationKind::WorkflowClosed);
        assert_eq!(out.notifications[0].line_number, 1);
    }

    // -------------------------------------------------------------------
    // Line advancement and completion
    // -------------------------------------------------------------------

    #[test]
    fn scripted_two_line_scenario() {
        // Line 1: single AND group (A).  Line 2: OR group (B, C).
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut tree = make_tree(&[
            &[(GroupRule::All, &[a])],
            &[(GroupRule::Any, &[b, c])],
        ]);

        let out = sign(&mut tree, a).unwrap();
        assert_eq!(tree.lines[0].status, LineStatus::Completed);
        assert_eq!(tree.lines[1].status, LineStatus::InProgress);
        assert!(tree.lines[1].started_date.is_some());
        assert_at_most_one_active_line(&tree);

        // B and C are both notified, flags stamped.
        let notified: Vec<Uuid> = out.notifications.iter().map(|n| n.signer_id).collect();
        assert_eq!(notified.len(), 2);
        assert!(notified.contains(&b) && notified.contains(&c));
        let line2 = tree.line_by_number(2).unwrap();
        for action in tree.actions_of_line(line2.id) {
            assert!(action.notification_sent);
            assert!(action.notification_date.is_some());
        }
        assert!(out
            .audit
            .iter()
            .any(|r| r.event == AuditEventKind::LineCompletedNextActivated));

        // B signs: group, line and workflow complete.
        let out = sign(&mut tree, b).unwrap();
        assert_eq!(out.workflow_status, WorkflowStatus::Completed);
        assert!(out.finally_authorized);

        // C is too late.
        let err = sign(&mut tree, c).unwrap_err();
        assert!(matches!(err, EngineError::NoPendingAction { .. }));
    }

    #[test]
    fn single_line_single_signer_completes_in_one_call() {
        let a = Uuid::new_v4();
        let mut tree = make_tree(&[&[(GroupRule::All, &[a])]]);

        let out = sign(&mut tree, a).unwrap();
        assert_eq!(out.workflow_status, WorkflowStatus::Completed);
        assert!(out.finally_authorized);
        assert!(tree.workflow.completion_date.is_some());
        assert_eq!(tree.lines[0].status, LineStatus::Completed);
    }

    #[test]
    fn final_line_emits_exactly_one_workflow_completed() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tree = make_tree(&[
            &[(GroupRule::All, &[a])],
            &[(GroupRule::All, &[b])],
        ]);

        let mut completed_events = 0;
        for signer in [a, b] {
            let out = sign(&mut tree, signer).unwrap();
            completed_events += out
                .audit
                .iter()
                .filter(|r| r.event == AuditEventKind::WorkflowCompleted)
                .count();
        }
        assert_eq!(completed_events, 1);
        assert_eq!(tree.workflow.status, WorkflowStatus::Completed);
    }

    #[test]
    fn multi_group_line_completes_only_when_all_groups_do() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tree = make_tree(&[&[
            (GroupRule::All, &[a]),
            (GroupRule::All, &[b]),
        ]]);

        sign(&mut tree, a).unwrap();
        assert_eq!(tree.lines[0].status, LineStatus::InProgress);
        assert_eq!(tree.workflow.status, WorkflowStatus::InProgress);

        sign(&mut tree, b).unwrap();
        assert_eq!(tree.lines[0].status, LineStatus::Completed);
        assert_eq!(tree.workflow.status, WorkflowStatus::Completed);
    }

    // -------------------------------------------------------------------
    // Audit / outcome details
    // -------------------------------------------------------------------

    #[test]
    fn per_action_audit_record_is_always_last() {
        let a = Uuid::new_v4();
        let mut tree = make_tree(&[&[(GroupRule::All, &[a])]]);

        let out = sign(&mut tree, a).unwrap();
        let last = out.audit.last().unwrap();
        assert_eq!(last.event, AuditEventKind::DocumentSigned);
        assert_eq!(last.action_id, Some(out.action_id));
        assert_eq!(last.workflow_id, Some(tree.workflow.id));
    }

    #[test]
    fn earliest_created_candidate_wins_on_integrity_violation() {
        let a = Uuid::new_v4();
        let mut tree = make_tree(&[&[(GroupRule::Any, &[a])]]);

        // Forge a second pending action for the same signer, created later.
        let mut extra = tree.actions[0].clone();
        extra.id = Uuid::new_v4();
        extra.created_at = extra.created_at + chrono::Duration::seconds(5);
        let first_id = tree.actions[0].id;
        tree.actions.push(extra);

        let out = sign(&mut tree, a).unwrap();
        assert_eq!(out.action_id, first_id);
    }

    // -------------------------------------------------------------------
    // Snapshot round-trip
    // -------------------------------------------------------------------

    #[test]
    fn serialized_snapshot_resumes_to_identical_final_state() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let spec: &[&[(GroupRule, &[Uuid])]] = &[
            &[(GroupRule::All, &[a])],
            &[(GroupRule::Any, &[b, c])],
        ];

        // Uninterrupted run.
        let mut direct = make_tree(spec);
        let mut resumed = direct.clone();

        sign(&mut direct, a).unwrap();
        sign(&mut direct, b).unwrap();

        // Interrupted run: persist and reload between the two cascades.
        sign(&mut resumed, a).unwrap();
        let snapshot = serde_json::to_string(&resumed).unwrap();
        let mut resumed: WorkflowTree = serde_json::from_str(&snapshot).unwrap();
        sign(&mut resumed, b).unwrap();

        assert_eq!(direct.workflow.status, resumed.workflow.status);
        for (d, r) in direct.lines.iter().zip(resumed.lines.iter()) {
            assert_eq!(d.status, r.status);
        }
        for (d, r) in direct.groups.iter().zip(resumed.groups.iter()) {
            assert_eq!(d.status, r.status);
        }
        for (d, r) in direct.actions.iter().zip(resumed.actions.iter()) {
            assert_eq!(d.status, r.status);
        }
    }
}
