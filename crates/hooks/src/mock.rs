//! Mock hook implementations — test doubles for the boundary traits.
//!
//! Useful in unit and integration tests where a real identity provider or
//! delivery channel is either unavailable or irrelevant.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{HookError, Notification, NotificationEmitter, SignerDirectory};

/// A directory backed by a programmer-specified role → signers map.
#[derive(Default)]
pub struct MockDirectory {
    roles: HashMap<String, Vec<Uuid>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the signers a role resolves to (builder-style).
    pub fn with_role(mut self, role: impl Into<String>, signers: Vec<Uuid>) -> Self {
        self.roles.insert(role.into(), signers);
        self
    }
}

#[async_trait]
impl SignerDirectory for MockDirectory {
    async fn resolve(&self, role: &str) -> Result<Vec<Uuid>, HookError> {
        // Unknown roles resolve empty rather than erroring, so tests can
        // exercise the builder's NoEligibleSigners path.
        Ok(self.roles.get(role).cloned().unwrap_or_default())
    }
}

/// A notifier that records every notification it receives.
pub struct MockNotifier {
    /// All notifications seen, in call order.
    pub sent: Arc<Mutex<Vec<Notification>>>,
    /// When set, every `notify` call fails with this message.
    fail_with: Option<String>,
}

impl MockNotifier {
    /// A notifier that always succeeds.
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    /// A notifier that always fails — for asserting the engine shrugs off
    /// delivery failures.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(msg.into()),
        }
    }

    /// Number of notifications delivered so far.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Signer ids notified so far, in call order.
    pub fn notified_signers(&self) -> Vec<Uuid> {
        self.sent.lock().unwrap().iter().map(|n| n.signer_id).collect()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationEmitter for MockNotifier {
    async fn notify(&self, note: &Notification) -> Result<(), HookError> {
        self.sent.lock().unwrap().push(note.clone());
        match &self.fail_with {
            Some(msg) => Err(HookError::Unavailable(msg.clone())),
            None => Ok(()),
        }
    }
}
