//! Declarative workflow topology — validate this before building.
//!
//! A topology says *how many* lines a workflow has and *which role* each
//! group addresses; the builder later resolves roles to concrete signers.
//!
//! Rules enforced:
//! 1. At least one line.
//! 2. Every line contains at least one group.
//! 3. Every group names a non-empty role.

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// One group of addressees sharing a satisfaction rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Role or addressing rule the signer directory resolves.
    pub role: String,
    /// When the role resolves to several signers, one signature suffices
    /// (the group is promoted to OR).
    #[serde(default)]
    pub first_responder_sufficient: bool,
}

/// One sequential stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSpec {
    pub groups: Vec<GroupSpec>,
}

/// The whole ordered chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySpec {
    pub lines: Vec<LineSpec>,
}

impl TopologySpec {
    /// Validate the topology's structure.
    ///
    /// # Errors
    /// [`EngineError::InvalidTopology`] describing the first violation.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.lines.is_empty() {
            return Err(EngineError::InvalidTopology(
                "topology has no lines".to_string(),
            ));
        }

        for (idx, line) in self.lines.iter().enumerate() {
            let line_number = idx + 1;
            if line.groups.is_empty() {
                return Err(EngineError::InvalidTopology(format!(
                    "line {line_number} has no groups"
                )));
            }
            for group in &line.groups {
                if group.role.trim().is_empty() {
                    return Err(EngineError::InvalidTopology(format!(
                        "line {line_number} has a group with an empty role"
                    )));
                }
            }
        }

        Ok(())
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn group(role: &str) -> GroupSpec {
        GroupSpec {
            role: role.to_string(),
            first_responder_sufficient: false,
        }
    }

    #[test]
    fn two_line_topology_is_valid() {
        let spec = TopologySpec {
            lines: vec![
                LineSpec { groups: vec![group("DIRECTOR")] },
                LineSpec { groups: vec![group("VERIFIER")] },
            ],
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn empty_topology_is_rejected() {
        let spec = TopologySpec { lines: vec![] };
        assert!(matches!(
            spec.validate(),
            Err(EngineError::InvalidTopology(_))
        ));
    }

    #[test]
    fn line_without_groups_is_rejected() {
        let spec = TopologySpec {
            lines: vec![
                LineSpec { groups: vec![group("DIRECTOR")] },
                LineSpec { groups: vec![] },
            ],
        };
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidTopology(ref msg) if msg.contains("line 2")));
    }

    #[test]
    fn blank_role_is_rejected() {
        let spec = TopologySpec {
            lines: vec![LineSpec { groups: vec![group("  ")] }],
        };
        assert!(matches!(
            spec.validate(),
            Err(EngineError::InvalidTopology(_))
        ));
    }
}
