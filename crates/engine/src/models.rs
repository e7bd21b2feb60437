//! Core domain models for the signature workflow engine.
//!
//! These types are the source of truth for what a signature workflow looks
//! like in memory.  The tree is held as a flat arena — `Vec<Line>`,
//! `Vec<Group>`, `Vec<Action>` keyed by id with non-owning parent
//! references — instead of a nested object graph, so cascade lookups never
//! chase cyclic owning pointers.  Serialises cleanly with serde, which is
//! also what makes mid-cascade snapshots reloadable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Lifecycle of a whole workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    NotStarted,
    InProgress,
    Completed,
    /// A signer rejected; progression halted.  Recovery is re-issuance as a
    /// new workflow, never a retry of this one.
    Rejected,
    Expired,
    Cancelled,
}

impl WorkflowStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Rejected | Self::Expired | Self::Cancelled
        )
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NOT_STARTED"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_STARTED" => Ok(Self::NotStarted),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "REJECTED" => Ok(Self::Rejected),
            "EXPIRED" => Ok(Self::Expired),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(format!("unknown workflow status: {other}")),
        }
    }
}

/// Lifecycle of one addressee line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    New,
    InProgress,
    Completed,
    Rejected,
}

impl std::fmt::Display for LineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl std::str::FromStr for LineStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(format!("unknown line status: {other}")),
        }
    }
}

/// Lifecycle of one addressee group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    New,
    InProgress,
    Completed,
    Rejected,
}

impl std::fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl std::str::FromStr for GroupStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(format!("unknown group status: {other}")),
        }
    }
}

/// Satisfaction rule of a group, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupRule {
    /// Every action in the group must be satisfied (AND).
    All,
    /// Any single satisfied action completes the group (OR).
    Any,
}

impl std::fmt::Display for GroupRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "ALL"),
            Self::Any => write!(f, "ANY"),
        }
    }
}

impl std::str::FromStr for GroupRule {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALL" => Ok(Self::All),
            "ANY" => Ok(Self::Any),
            other => Err(format!("unknown group rule: {other}")),
        }
    }
}

/// What kind of act a signer is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Sign,
    Approve,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sign => write!(f, "SIGN"),
            Self::Approve => write!(f, "APPROVE"),
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SIGN" => Ok(Self::Sign),
            "APPROVE" => Ok(Self::Approve),
            other => Err(format!("unknown action kind: {other}")),
        }
    }
}

/// Lifecycle of one signature action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    New,
    Signed,
    Approved,
    Rejected,
}

impl ActionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::New)
    }

    /// Terminal and counting towards group satisfaction.
    pub fn is_satisfied(self) -> bool {
        matches!(self, Self::Signed | Self::Approved)
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Signed => write!(f, "SIGNED"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl std::str::FromStr for ActionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "SIGNED" => Ok(Self::Signed),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(format!("unknown action status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Request-scoped context
// ---------------------------------------------------------------------------

/// Originating-client metadata attached to signatures and audit records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Who is acting, and from where.  Passed explicitly into every mutating
/// operation — audit attribution never reads ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorContext {
    pub user_id: Uuid,
    pub client: ClientMeta,
}

impl ActorContext {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            client: ClientMeta::default(),
        }
    }

    pub fn with_client(mut self, client: ClientMeta) -> Self {
        self.client = client;
        self
    }
}

// ---------------------------------------------------------------------------
// Signature payload
// ---------------------------------------------------------------------------

/// The opaque evidence recorded with a terminal action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePayload {
    /// Signature method, e.g. `ELECTRONIC`.
    pub method: String,
    pub timestamp: DateTime<Utc>,
    /// SHA-256 over the signed content reference.
    pub content_hash: String,
    pub client: ClientMeta,
    /// Short code of the owning workflow, for out-of-band verification.
    pub workflow_code: String,
}

/// What the signer decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Sign,
    Approve,
    Reject {
        kind: Option<String>,
        reason: String,
    },
}

impl Decision {
    /// Terminal action status this decision maps to.
    pub fn terminal_status(&self) -> ActionStatus {
        match self {
            Self::Sign => ActionStatus::Signed,
            Self::Approve => ActionStatus::Approved,
            Self::Reject { .. } => ActionStatus::Rejected,
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// One signature process for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    /// Short shareable code (`XXXX-XXXX-XXXX-XXXX`), safe to reference
    /// out-of-band without leaking the internal key.
    pub public_code: String,
    pub reference: String,
    pub subject: String,
    pub message: Option<String>,
    pub status: WorkflowStatus,
    pub sender_id: Uuid,
    /// Opaque document-context snapshot taken at build time.
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub init_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
}

/// An ordered stage within a workflow.  Lines advance strictly in
/// ascending `line_number` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub id: Uuid,
    pub workflow_id: Uuid,
    /// 1-based, unique within the workflow.
    pub line_number: u32,
    pub status: LineStatus,
    pub started_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
}

/// A cluster of required actions within a line sharing one AND/OR rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub line_id: Uuid,
    pub group_number: u32,
    pub rule: GroupRule,
    pub status: GroupStatus,
}

/// One required act by one specific signer.  A signer needed in two
/// groups gets two distinct actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub group_id: Uuid,
    pub signer_id: Uuid,
    pub kind: ActionKind,
    pub status: ActionStatus,
    pub action_date: Option<DateTime<Utc>>,
    pub signature: Option<SignaturePayload>,
    pub reject_kind: Option<String>,
    pub reject_reason: Option<String>,
    pub notification_sent: bool,
    pub notification_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// WorkflowTree
// ---------------------------------------------------------------------------

/// The full aggregate: one workflow and its line/group/action arena.
///
/// Vectors are kept in canonical order — lines by `line_number`, groups by
/// (line, `group_number`), actions by (group, `created_at`) — which the
/// builder and the persistence loader both guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTree {
    pub workflow: Workflow,
    pub lines: Vec<Line>,
    pub groups: Vec<Group>,
    pub actions: Vec<Action>,
}

impl WorkflowTree {
    /// The single `IN_PROGRESS` line, if any.
    pub fn active_line(&self) -> Option<&Line> {
        self.lines.iter().find(|l| l.status == LineStatus::InProgress)
    }

    /// Line with the given sequence number.
    pub fn line_by_number(&self, line_number: u32) -> Option<&Line> {
        self.lines.iter().find(|l| l.line_number == line_number)
    }

    pub fn line_mut(&mut self, id: Uuid) -> Option<&mut Line> {
        self.lines.iter_mut().find(|l| l.id == id)
    }

    pub fn group(&self, id: Uuid) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_mut(&mut self, id: Uuid) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    pub fn action(&self, id: Uuid) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn action_mut(&mut self, id: Uuid) -> Option<&mut Action> {
        self.actions.iter_mut().find(|a| a.id == id)
    }

    /// Groups belonging to a line, in group order.
    pub fn groups_of_line(&self, line_id: Uuid) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(move |g| g.line_id == line_id)
    }

    /// Actions belonging to a group, in creation order.
    pub fn actions_of_group(&self, group_id: Uuid) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(move |a| a.group_id == group_id)
    }

    /// Actions belonging to a line (all its groups), in canonical order.
    pub fn actions_of_line(&self, line_id: Uuid) -> Vec<&Action> {
        let group_ids: Vec<Uuid> = self.groups_of_line(line_id).map(|g| g.id).collect();
        self.actions
            .iter()
            .filter(|a| group_ids.contains(&a.group_id))
            .collect()
    }

    /// Total number of actions in the tree.
    pub fn total_actions(&self) -> usize {
        self.actions.len()
    }
}
