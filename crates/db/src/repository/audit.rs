//! Audit log repository functions.
//!
//! Append-only: there is no update or delete path for audit rows, by
//! schema contract.  Appends ride the same transaction as the cascade
//! that produced them, so an audit record is durable iff its triggering
//! transition committed.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{models::AuditRow, DbError, DbPool};

/// Append one audit record inside the caller's transaction.
pub async fn append(conn: &mut PgConnection, row: &AuditRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO signature_audit_log
            (id, workflow_id, action_id, user_id, event_type, payload,
             ip_address, user_agent, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(row.id)
    .bind(row.workflow_id)
    .bind(row.action_id)
    .bind(row.user_id)
    .bind(&row.event_type)
    .bind(&row.payload)
    .bind(&row.ip_address)
    .bind(&row.user_agent)
    .bind(row.recorded_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Full audit trail for one workflow, oldest first.
pub async fn list_for_workflow(pool: &DbPool, workflow_id: Uuid) -> Result<Vec<AuditRow>, DbError> {
    let rows = sqlx::query_as::<_, AuditRow>(
        r#"
        SELECT * FROM signature_audit_log
        WHERE workflow_id = $1
        ORDER BY recorded_at ASC
        "#,
    )
    .bind(workflow_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
