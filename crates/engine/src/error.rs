//! Engine-level error types.

use thiserror::Error;
use uuid::Uuid;

use crate::models::WorkflowStatus;

/// Errors produced by the signature workflow engine (build + signing time).
///
/// A rejection decision is *not* an error — it returns `Ok` with workflow
/// status `REJECTED`.  The infrastructure variants abort the surrounding
/// transaction and leave state untouched.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Build-time errors ------

    /// The declarative topology is structurally unusable.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// A required group's role resolved to an empty signer set.
    #[error("no eligible signers for role '{role}'")]
    NoEligibleSigners { role: String },

    // ------ Signing-time errors ------

    #[error("workflow {0} not found")]
    WorkflowNotFound(Uuid),

    /// No workflow carries the given public code.
    #[error("no workflow with code '{0}'")]
    WorkflowCodeNotFound(String),

    /// No NEW action for this signer in the currently active line.  Covers
    /// the wrong signer, a line the workflow has not reached, and a
    /// workflow already past the signer's line.
    #[error("no pending action for signer {signer_id} in workflow {workflow_id}")]
    NoPendingAction {
        workflow_id: Uuid,
        signer_id: Uuid,
    },

    /// The workflow was cancelled, expired or never started.
    #[error("workflow {workflow_id} is not active (status {status})")]
    WorkflowNotActive {
        workflow_id: Uuid,
        status: WorkflowStatus,
    },

    /// The signer already acted in the still-active line and submitted
    /// again.
    #[error("signer {signer_id} already acted in the active line of workflow {workflow_id}")]
    DuplicateSubmission {
        workflow_id: Uuid,
        signer_id: Uuid,
    },

    // ------ Infrastructure errors ------

    /// Signer directory failure at build time.
    #[error("signer directory error: {0}")]
    Directory(#[from] hooks::HookError),

    /// Persistence or audit-sink failure; the transaction rolled back.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}
