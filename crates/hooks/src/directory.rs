//! `StaticDirectory` — a signer directory backed by a fixed role map.
//!
//! The surrounding deployment usually wires the engine to its own identity
//! store; for single-node installs and the CLI, a role → signers map loaded
//! from configuration is enough.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{HookError, SignerDirectory};

/// Role map loaded from configuration.  Resolution order is the order the
/// signers appear in the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticDirectory {
    roles: HashMap<String, Vec<Uuid>>,
}

impl StaticDirectory {
    pub fn new(roles: HashMap<String, Vec<Uuid>>) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl SignerDirectory for StaticDirectory {
    async fn resolve(&self, role: &str) -> Result<Vec<Uuid>, HookError> {
        Ok(self.roles.get(role).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_configured_roles_in_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let dir = StaticDirectory::new(HashMap::from([("DNCD".to_string(), vec![a, b])]));
        assert_eq!(dir.resolve("DNCD").await.unwrap(), vec![a, b]);
        assert!(dir.resolve("UNKNOWN").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deserialises_from_plain_role_map() {
        let json = r#"{ "DIRECTOR": ["6f2a1af1-9c3b-4f86-b64c-0ce1febc4c16"] }"#;
        let dir: StaticDirectory = serde_json::from_str(json).unwrap();
        assert_eq!(dir.resolve("DIRECTOR").await.unwrap().len(), 1);
    }
}
