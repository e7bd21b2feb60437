//! Mapping between the domain tree and the `db` crate's row structs.
//!
//! Statuses travel as their canonical TEXT form; a row that fails to parse
//! back is surfaced as `DbError::Corrupt` rather than panicking.  All
//! writes here expect to run inside the caller's transaction.

use sqlx::PgConnection;

use db::models::{ActionRow, AuditRow, GroupRow, LineRow, WorkflowRow};
use db::repository::{actions, audit as audit_repo, workflows};
use db::DbError;

use crate::audit::AuditRecord;
use crate::cascade::DirtySet;
use crate::models::{Action, ClientMeta, Group, Line, Workflow, WorkflowTree};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Row conversions
// ---------------------------------------------------------------------------

fn parse<T: std::str::FromStr<Err = String>>(s: &str) -> Result<T, DbError> {
    s.parse().map_err(DbError::Corrupt)
}

pub fn workflow_to_row(w: &Workflow) -> WorkflowRow {
    WorkflowRow {
        id: w.id,
        public_code: w.public_code.clone(),
        reference: w.reference.clone(),
        subject: w.subject.clone(),
        message: w.message.clone(),
        status: w.status.to_string(),
        sender_id: w.sender_id,
        context: w.context.clone(),
        created_at: w.created_at,
        init_date: w.init_date,
        expiration_date: w.expiration_date,
        completion_date: w.completion_date,
    }
}

pub fn workflow_from_row(row: WorkflowRow) -> Result<Workflow, DbError> {
    Ok(Workflow {
        id: row.id,
        public_code: row.public_code,
        reference: row.reference,
        subject: row.subject,
        message: row.message,
        status: parse(&row.status)?,
        sender_id: row.sender_id,
        context: row.context,
        created_at: row.created_at,
        init_date: row.init_date,
        expiration_date: row.expiration_date,
        completion_date: row.completion_date,
    })
}

pub fn line_to_row(l: &Line) -> LineRow {
    LineRow {
        id: l.id,
        workflow_id: l.workflow_id,
        line_number: l.line_number as i32,
        status: l.status.to_string(),
        started_date: l.started_date,
        completed_date: l.completed_date,
    }
}

pub fn line_from_row(row: LineRow) -> Result<Line, DbError> {
    Ok(Line {
        id: row.id,
        workflow_id: row.workflow_id,
        line_number: row.line_number as u32,
        status: parse(&row.status)?,
        started_date: row.started_date,
        completed_date: row.completed_date,
    })
}

pub fn group_to_row(g: &Group) -> GroupRow {
    GroupRow {
        id: g.id,
        line_id: g.line_id,
        group_number: g.group_number as i32,
        rule: g.rule.to_string(),
        status: g.status.to_string(),
    }
}

pub fn group_from_row(row: GroupRow) -> Result<Group, DbError> {
    Ok(Group {
        id: row.id,
        line_id: row.line_id,
        group_number: row.group_number as u32,
        rule: parse(&row.rule)?,
        status: parse(&row.status)?,
    })
}

pub fn action_to_row(a: &Action) -> Result<ActionRow, DbError> {
    let signature = match &a.signature {
        Some(sig) => Some(
            serde_json::to_value(sig)
                .map_err(|e| DbError::Corrupt(format!("unserialisable signature: {e}")))?,
        ),
        None => None,
    };
    Ok(ActionRow {
        id: a.id,
        group_id: a.group_id,
        signer_id: a.signer_id,
        kind: a.kind.to_string(),
        status: a.status.to_string(),
        action_date: a.action_date,
        signature,
        reject_kind: a.reject_kind.clone(),
        reject_reason: a.reject_reason.clone(),
        notification_sent: a.notification_sent,
        notification_date: a.notification_date,
        created_at: a.created_at,
    })
}

pub fn action_from_row(row: ActionRow) -> Result<Action, DbError> {
    let signature = match row.signature {
        Some(value) => Some(
            serde_json::from_value(value)
                .map_err(|e| DbError::Corrupt(format!("bad signature payload: {e}")))?,
        ),
        None => None,
    };
    Ok(Action {
        id: row.id,
        group_id: row.group_id,
        signer_id: row.signer_id,
        kind: parse(&row.kind)?,
        status: parse(&row.status)?,
        action_date: row.action_date,
        signature,
        reject_kind: row.reject_kind,
        reject_reason: row.reject_reason,
        notification_sent: row.notification_sent,
        notification_date: row.notification_date,
        created_at: row.created_at,
    })
}

pub fn audit_to_row(r: &AuditRecord) -> AuditRow {
    AuditRow {
        id: r.id,
        workflow_id: r.workflow_id,
        action_id: r.action_id,
        user_id: r.user_id,
        event_type: r.event.to_string(),
        payload: r.payload.clone(),
        ip_address: r.client.ip_address.clone(),
        user_agent: r.client.user_agent.clone(),
        recorded_at: r.recorded_at,
    }
}

pub fn audit_from_row(row: AuditRow) -> Result<AuditRecord, DbError> {
    Ok(AuditRecord {
        id: row.id,
        workflow_id: row.workflow_id,
        action_id: row.action_id,
        user_id: row.user_id,
        event: parse(&row.event_type)?,
        payload: row.payload,
        client: ClientMeta {
            ip_address: row.ip_address,
            user_agent: row.user_agent,
        },
        recorded_at: row.recorded_at,
    })
}

// ---------------------------------------------------------------------------
// Tree load / store
// ---------------------------------------------------------------------------

/// Load the full tree below an already-fetched workflow row.
///
/// Children come back in canonical order (line, group, creation time), so
/// the tree's ordering guarantees hold without re-sorting.
pub async fn load_tree(
    conn: &mut PgConnection,
    row: WorkflowRow,
) -> Result<WorkflowTree, EngineError> {
    let workflow_id = row.id;
    let workflow = workflow_from_row(row)?;

    let lines = workflows::list_lines(&mut *conn, workflow_id)
        .await?
        .into_iter()
        .map(line_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    let groups = workflows::list_groups(&mut *conn, workflow_id)
        .await?
        .into_iter()
        .map(group_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    let actions = actions::list_actions(&mut *conn, workflow_id)
        .await?
        .into_iter()
        .map(action_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WorkflowTree {
        workflow,
        lines,
        groups,
        actions,
    })
}

/// Insert a freshly-built tree, parent-first.
pub async fn insert_tree(conn: &mut PgConnection, tree: &WorkflowTree) -> Result<(), EngineError> {
    workflows::insert_workflow(&mut *conn, &workflow_to_row(&tree.workflow)).await?;
    for line in &tree.lines {
        workflows::insert_line(&mut *conn, &line_to_row(line)).await?;
    }
    for group in &tree.groups {
        workflows::insert_group(&mut *conn, &group_to_row(group)).await?;
    }
    for action in &tree.actions {
        actions::insert_action(&mut *conn, &action_to_row(action)?).await?;
    }
    Ok(())
}

/// Write back exactly the entities a cascade touched.
pub async fn persist_dirty(
    conn: &mut PgConnection,
    tree: &WorkflowTree,
    dirty: &DirtySet,
) -> Result<(), EngineError> {
    if dirty.workflow {
        workflows::update_workflow_state(
            &mut *conn,
            tree.workflow.id,
            &tree.workflow.status.to_string(),
            tree.workflow.completion_date,
        )
        .await?;
    }
    for line_id in &dirty.lines {
        let line = tree
            .lines
            .iter()
            .find(|l| l.id == *line_id)
            .ok_or_else(|| DbError::Corrupt(format!("dirty line {line_id} missing from tree")))?;
        workflows::update_line_state(&mut *conn, &line_to_row(line)).await?;
    }
    for group_id in &dirty.groups {
        let group = tree
            .group(*group_id)
            .ok_or_else(|| DbError::Corrupt(format!("dirty group {group_id} missing from tree")))?;
        workflows::update_group_status(&mut *conn, group.id, &group.status.to_string()).await?;
    }
    for action_id in &dirty.actions {
        let action = tree
            .action(*action_id)
            .ok_or_else(|| DbError::Corrupt(format!("dirty action {action_id} missing from tree")))?;
        actions::update_action(&mut *conn, &action_to_row(action)?).await?;
    }
    Ok(())
}

/// Append audit records inside the caller's transaction.
pub async fn append_audit(
    conn: &mut PgConnection,
    records: &[AuditRecord],
) -> Result<(), EngineError> {
    for record in records {
        audit_repo::append(&mut *conn, &audit_to_row(record)).await?;
    }
    Ok(())
}
