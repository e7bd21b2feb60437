//! Workflow / line / group repository functions.
//!
//! The signing cascade mutates a whole workflow tree atomically, so every
//! write here binds to a caller-owned `PgConnection` (inside a
//! transaction).  Tree reads are generic over the executor so they serve
//! both pooled queries and in-transaction loads.

use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::{
    models::{GroupRow, LineRow, WorkflowRow},
    DbError, DbPool,
};

// ---------------------------------------------------------------------------
// signature_workflows
// ---------------------------------------------------------------------------

/// Insert a freshly-built workflow header row.
pub async fn insert_workflow(conn: &mut PgConnection, row: &WorkflowRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO signature_workflows
            (id, public_code, reference, subject, message, status, sender_id,
             context, created_at, init_date, expiration_date, completion_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(row.id)
    .bind(&row.public_code)
    .bind(&row.reference)
    .bind(&row.subject)
    .bind(&row.message)
    .bind(&row.status)
    .bind(row.sender_id)
    .bind(&row.context)
    .bind(row.created_at)
    .bind(row.init_date)
    .bind(row.expiration_date)
    .bind(row.completion_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Fetch a workflow header by its primary key (shared read).
pub async fn get_workflow(pool: &DbPool, id: Uuid) -> Result<WorkflowRow, DbError> {
    sqlx::query_as::<_, WorkflowRow>("SELECT * FROM signature_workflows WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Fetch a workflow header by its short public code (shared read).
pub async fn get_workflow_by_code(pool: &DbPool, code: &str) -> Result<WorkflowRow, DbError> {
    sqlx::query_as::<_, WorkflowRow>("SELECT * FROM signature_workflows WHERE public_code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Fetch a workflow header with `FOR UPDATE`, serialising every mutating
/// call (signing, cancellation, expiry) on this workflow until the
/// surrounding transaction ends.
pub async fn lock_workflow(conn: &mut PgConnection, id: Uuid) -> Result<WorkflowRow, DbError> {
    sqlx::query_as::<_, WorkflowRow>("SELECT * FROM signature_workflows WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DbError::NotFound)
}

/// Update the mutable workflow header fields after a cascade.
pub async fn update_workflow_state(
    conn: &mut PgConnection,
    id: Uuid,
    status: &str,
    completion_date: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE signature_workflows SET status = $1, completion_date = $2 WHERE id = $3",
    )
    .bind(status)
    .bind(completion_date)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Permanently delete a workflow; lines, groups and actions cascade at the
/// schema level.  Audit records are weak references and survive.
pub async fn delete_workflow(pool: &DbPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM signature_workflows WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// signature_lines
// ---------------------------------------------------------------------------

/// Insert one addressee line.
pub async fn insert_line(conn: &mut PgConnection, row: &LineRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO signature_lines
            (id, workflow_id, line_number, status, started_date, completed_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(row.id)
    .bind(row.workflow_id)
    .bind(row.line_number)
    .bind(&row.status)
    .bind(row.started_date)
    .bind(row.completed_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// All lines of a workflow in ascending line order.
pub async fn list_lines<'e, E: PgExecutor<'e>>(
    ex: E,
    workflow_id: Uuid,
) -> Result<Vec<LineRow>, DbError> {
    let rows = sqlx::query_as::<_, LineRow>(
        "SELECT * FROM signature_lines WHERE workflow_id = $1 ORDER BY line_number ASC",
    )
    .bind(workflow_id)
    .fetch_all(ex)
    .await?;

    Ok(rows)
}

/// Update a line's derived state after a cascade.
pub async fn update_line_state(conn: &mut PgConnection, row: &LineRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        UPDATE signature_lines
        SET status = $1, started_date = $2, completed_date = $3
        WHERE id = $4
        "#,
    )
    .bind(&row.status)
    .bind(row.started_date)
    .bind(row.completed_date)
    .bind(row.id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// signature_groups
// ---------------------------------------------------------------------------

/// Insert one addressee group.
pub async fn insert_group(conn: &mut PgConnection, row: &GroupRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO signature_groups (id, line_id, group_number, rule, status)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(row.id)
    .bind(row.line_id)
    .bind(row.group_number)
    .bind(&row.rule)
    .bind(&row.status)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// All groups belonging to a workflow (joined through lines), ordered by
/// line then group number.
pub async fn list_groups<'e, E: PgExecutor<'e>>(
    ex: E,
    workflow_id: Uuid,
) -> Result<Vec<GroupRow>, DbError> {
    let rows = sqlx::query_as::<_, GroupRow>(
        r#"
        SELECT g.*
        FROM signature_groups g
        JOIN signature_lines l ON l.id = g.line_id
        WHERE l.workflow_id = $1
        ORDER BY l.line_number ASC, g.group_number ASC
        "#,
    )
    .bind(workflow_id)
    .fetch_all(ex)
    .await?;

    Ok(rows)
}

/// Update a group's derived status after a cascade.
pub async fn update_group_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: &str,
) -> Result<(), DbError> {
    sqlx::query("UPDATE signature_groups SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
