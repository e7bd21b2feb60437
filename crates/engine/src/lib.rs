//! `engine` crate — domain models, the workflow builder, the signing
//! cascade state machine, and the async `SignatureEngine` orchestrator.
//!
//! Layering, inside out:
//! 1. [`models`] — the workflow tree (workflow → lines → groups → actions)
//!    as a flat arena of entities keyed by id.
//! 2. [`topology`] + [`builder`] — declarative topology in, fully-populated
//!    `IN_PROGRESS` tree out.
//! 3. [`cascade`] — the pure state machine: one submitted action in, the
//!    full derived-status recomputation out.  No I/O.
//! 4. [`engine`] — wraps the above in per-workflow exclusive transactions,
//!    persists through the `db` crate, appends audit records, and fires
//!    notifications through the `hooks` traits.

pub mod models;
pub mod topology;
pub mod builder;
pub mod cascade;
pub mod engine;
pub mod audit;
pub mod code;
pub mod error;
pub mod persist;

pub use models::{
    Action, ActionKind, ActionStatus, ActorContext, ClientMeta, Decision, Group, GroupRule,
    GroupStatus, Line, LineStatus, SignaturePayload, Workflow, WorkflowStatus, WorkflowTree,
};
pub use topology::{GroupSpec, LineSpec, TopologySpec};
pub use builder::{build_workflow, BuildOutput, BuildRequest};
pub use cascade::{apply_action, CascadeOutcome, DirtySet};
pub use engine::{PendingAction, SignatureEngine, SubmitOutcome};
pub use audit::{AuditEventKind, AuditRecord};
pub use error::EngineError;

#[cfg(test)]
mod engine_tests;
