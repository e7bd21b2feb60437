//! The boundary traits — the contracts the surrounding system must fulfil.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::HookError;

/// Resolves a role (or addressing rule) to the concrete, ordered set of
/// users eligible to act for it.
///
/// Used by the workflow builder only — once a workflow exists its signer
/// set is frozen inside the action records.
#[async_trait]
pub trait SignerDirectory: Send + Sync {
    /// Resolve `role` to an ordered list of signer identities.
    ///
    /// An empty result is a legal answer; the builder turns it into a
    /// `NoEligibleSigners` failure.
    async fn resolve(&self, role: &str) -> Result<Vec<Uuid>, HookError>;
}

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// The signer has a newly-pending signature action.
    SignaturePending,
    /// The workflow the signer participated in reached a terminal state.
    WorkflowClosed,
}

/// One pending alert for one signer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub signer_id: Uuid,
    pub kind: NotificationKind,
    pub workflow_id: Uuid,
    /// Short shareable workflow code, safe to put in a message body.
    pub public_code: String,
    pub subject: String,
    /// Line the pending action sits on.
    pub line_number: u32,
}

/// Delivers notifications to signers.
///
/// Fire-and-forget from the engine's perspective: delivery failures are
/// logged by the caller and never block or roll back a signing cascade.
#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn notify(&self, note: &Notification) -> Result<(), HookError>;
}
