//! Ownership-conflict resolution.
//!
//! When a specification hands a resolver a State that belongs to another
//! owner, or a Projection whose receiver is another State, the owner's
//! arbiter is asked once, synchronously, what to do. The answer set is
//! closed: reassign, copy, default, or abort.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{MechanismId, ProjectionId, StateId};

/// Answer to an ownership conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipDecision {
    /// Move the existing object to the requester and reuse it.
    #[default]
    Reassign,
    /// Deep-copy the existing object and give the copy to the requester.
    Copy,
    /// Leave the existing object alone and build a default instead.
    Default,
    /// Fail resolution with a configuration error.
    Abort,
}

/// What is being contested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictSubject {
    State {
        state: StateId,
        name: String,
        current_owner: MechanismId,
    },
    Projection {
        projection: ProjectionId,
        name: String,
        current_receiver: StateId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipConflict {
    pub subject: ConflictSubject,
    /// Owner asking for the object.
    pub requested_by: MechanismId,
    /// Name of the slot the object was specified for.
    pub slot: String,
}

impl fmt::Display for OwnershipConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            ConflictSubject::State { name, current_owner, .. } => write!(
                f,
                "state '{name}' assigned to '{}' of mechanism {} already belongs to mechanism {current_owner}",
                self.slot, self.requested_by
            ),
            ConflictSubject::Projection { name, current_receiver, .. } => write!(
                f,
                "projection '{name}' specified for '{}' already projects to state {current_receiver}",
                self.slot
            ),
        }
    }
}

/// Decision function consulted on ownership conflicts.
pub trait OwnershipArbiter: Send + Sync + fmt::Debug {
    fn decide(&self, conflict: &OwnershipConflict) -> OwnershipDecision;
}

/// Always answers with the same decision. The unattended default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OwnershipPolicy {
    decision: OwnershipDecision,
}

impl OwnershipPolicy {
    pub fn new(decision: OwnershipDecision) -> Self {
        Self { decision }
    }
}

impl OwnershipArbiter for OwnershipPolicy {
    fn decide(&self, _conflict: &OwnershipConflict) -> OwnershipDecision {
        self.decision
    }
}

/// Arbiter backed by a caller-supplied closure, e.g. an interactive prompt.
pub struct FnArbiter<F>(pub F);

impl<F> fmt::Debug for FnArbiter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnArbiter")
    }
}

impl<F> OwnershipArbiter for FnArbiter<F>
where
    F: Fn(&OwnershipConflict) -> OwnershipDecision + Send + Sync,
{
    fn decide(&self, conflict: &OwnershipConflict) -> OwnershipDecision {
        (self.0)(conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> OwnershipConflict {
        OwnershipConflict {
            subject: ConflictSubject::State {
                state: StateId(3),
                name: "in".into(),
                current_owner: MechanismId(1),
            },
            requested_by: MechanismId(2),
            slot: "in".into(),
        }
    }

    #[test]
    fn test_default_policy_reassigns() {
        assert_eq!(OwnershipPolicy::default().decide(&conflict()), OwnershipDecision::Reassign);
    }

    #[test]
    fn test_fn_arbiter_sees_conflict() {
        let arbiter = FnArbiter(|c: &OwnershipConflict| {
            if c.requested_by == MechanismId(2) { OwnershipDecision::Copy } else { OwnershipDecision::Abort }
        });
        assert_eq!(arbiter.decide(&conflict()), OwnershipDecision::Copy);
    }

    #[test]
    fn test_decision_deserializes_snake_case() {
        let d: OwnershipDecision = serde_json::from_str("\"abort\"").unwrap();
        assert_eq!(d, OwnershipDecision::Abort);
    }
}
