//! Signature action repository functions.

use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::{
    models::{ActionRow, PendingActionRow},
    DbError, DbPool,
};

/// Insert one signature action.
pub async fn insert_action(conn: &mut PgConnection, row: &ActionRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO signature_actions
            (id, group_id, signer_id, kind, status, action_date, signature,
             reject_kind, reject_reason, notification_sent, notification_date, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(row.id)
    .bind(row.group_id)
    .bind(row.signer_id)
    .bind(&row.kind)
    .bind(&row.status)
    .bind(row.action_date)
    .bind(&row.signature)
    .bind(&row.reject_kind)
    .bind(&row.reject_reason)
    .bind(row.notification_sent)
    .bind(row.notification_date)
    .bind(row.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// All actions belonging to a workflow (joined through groups and lines),
/// ordered by line, group, then creation time.
pub async fn list_actions<'e, E: PgExecutor<'e>>(
    ex: E,
    workflow_id: Uuid,
) -> Result<Vec<ActionRow>, DbError> {
    let rows = sqlx::query_as::<_, ActionRow>(
        r#"
        SELECT a.*
        FROM signature_actions a
        JOIN signature_groups g ON g.id = a.group_id
        JOIN signature_lines l ON l.id = g.line_id
        WHERE l.workflow_id = $1
        ORDER BY l.line_number ASC, g.group_number ASC, a.created_at ASC
        "#,
    )
    .bind(workflow_id)
    .fetch_all(ex)
    .await?;

    Ok(rows)
}

/// Rewrite an action's mutable fields (status, timestamps, payload,
/// rejection detail, notification flags).
pub async fn update_action(conn: &mut PgConnection, row: &ActionRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        UPDATE signature_actions
        SET status = $1, action_date = $2, signature = $3,
            reject_kind = $4, reject_reason = $5,
            notification_sent = $6, notification_date = $7
        WHERE id = $8
        "#,
    )
    .bind(&row.status)
    .bind(row.action_date)
    .bind(&row.signature)
    .bind(&row.reject_kind)
    .bind(&row.reject_reason)
    .bind(row.notification_sent)
    .bind(row.notification_date)
    .bind(row.id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Pending-work inbox: every NEW action for `signer_id` whose line is
/// active (or upcoming) and whose workflow is still in progress.
///
/// Expiry is *not* filtered here — the caller annotates rows whose
/// workflow expiration has passed; enforcement is an external concern.
pub async fn list_pending_for_signer(
    pool: &DbPool,
    signer_id: Uuid,
) -> Result<Vec<PendingActionRow>, DbError> {
    let rows = sqlx::query_as::<_, PendingActionRow>(
        r#"
        SELECT a.id AS action_id, a.signer_id, a.kind,
               l.line_number, l.status AS line_status,
               w.id AS workflow_id, w.public_code, w.subject, w.expiration_date
        FROM signature_actions a
        JOIN signature_groups g ON g.id = a.group_id
        JOIN signature_lines l ON l.id = g.line_id
        JOIN signature_workflows w ON w.id = l.workflow_id
        WHERE a.signer_id = $1
          AND a.status = 'NEW'
          AND l.status IN ('NEW', 'IN_PROGRESS')
          AND w.status = 'IN_PROGRESS'
        ORDER BY w.created_at ASC, l.line_number ASC
        "#,
    )
    .bind(signer_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
