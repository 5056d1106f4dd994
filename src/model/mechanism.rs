//! Mechanism — the owner node that holds States.
//!
//! Only the owner-side surface the resolvers consume lives here:
//! preferences, the default projection type declaration, the ownership
//! arbiter, the per-owner value attributes and the value log.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{StateId, StateKind, Value};
use crate::log::{Log, LogLevel};
use crate::ownership::OwnershipArbiter;

/// Opaque mechanism identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MechanismId(pub u64);

impl std::fmt::Display for MechanismId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-owner preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Record and report soft default substitutions.
    pub verbose: bool,
    pub log_level: LogLevel,
}

/// An owner of States.
#[derive(Debug)]
pub struct Mechanism {
    pub id: MechanismId,
    pub name: String,
    pub prefs: Preferences,
    /// Overrides the per-kind default projection type for this owner's States.
    pub default_projection_type: Option<String>,
    arbiter: Arc<dyn OwnershipArbiter>,
    attributes: HashMap<String, Value>,
    states: HashMap<StateKind, IndexMap<String, StateId>>,
    log: Mutex<Log>,
}

impl Mechanism {
    pub(crate) fn new(
        id: MechanismId,
        name: String,
        prefs: Preferences,
        arbiter: Arc<dyn OwnershipArbiter>,
    ) -> Self {
        Self {
            id,
            name,
            prefs,
            default_projection_type: None,
            arbiter,
            attributes: HashMap::new(),
            states: HashMap::new(),
            log: Mutex::new(Log::default()),
        }
    }

    pub fn arbiter(&self) -> &Arc<dyn OwnershipArbiter> {
        &self.arbiter
    }

    /// Replace the decision function consulted on ownership conflicts.
    pub fn set_arbiter(&mut self, arbiter: Arc<dyn OwnershipArbiter>) {
        self.arbiter = arbiter;
    }

    /// Value recorded under `key` (e.g. `"DefaultInputState.value"`).
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    pub(crate) fn set_attribute(&mut self, key: String, value: Value) {
        self.attributes.insert(key, value);
    }

    pub(crate) fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    /// This owner's installed States of `kind`, in resolution order.
    pub fn states(&self, kind: StateKind) -> Option<&IndexMap<String, StateId>> {
        self.states.get(&kind)
    }

    pub(crate) fn install_states(&mut self, kind: StateKind, states: IndexMap<String, StateId>) {
        self.states.insert(kind, states);
    }

    /// Drop `state` from whichever collection holds it, returning where it sat.
    pub(crate) fn forget_state(&mut self, state: StateId) -> Option<StateSlot> {
        for (kind, collection) in self.states.iter_mut() {
            if let Some(index) = collection.values().position(|id| *id == state) {
                let (key, _) = collection.shift_remove_index(index)?;
                return Some(StateSlot { kind: *kind, index, key });
            }
        }
        None
    }

    /// Put a forgotten State back where [`Mechanism::forget_state`] found it.
    pub(crate) fn restore_state(&mut self, slot: StateSlot, state: StateId) {
        let collection = self.states.entry(slot.kind).or_default();
        let index = slot.index.min(collection.len());
        collection.shift_insert(index, slot.key, state);
    }

    /// Append-only value log. The lock serializes writers for this owner.
    pub fn log(&self) -> &Mutex<Log> {
        &self.log
    }
}

/// Position of a State inside one of its owner's collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StateSlot {
    pub kind: StateKind,
    pub index: usize,
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::{OwnershipDecision, OwnershipPolicy};

    fn mechanism() -> Mechanism {
        Mechanism::new(
            MechanismId(1),
            "m".into(),
            Preferences::default(),
            Arc::new(OwnershipPolicy::new(OwnershipDecision::Reassign)),
        )
    }

    #[test]
    fn test_forget_state() {
        let mut m = mechanism();
        let mut states = IndexMap::new();
        states.insert("a".to_string(), StateId(1));
        states.insert("b".to_string(), StateId(2));
        m.install_states(StateKind::Input, states);

        let slot = m.forget_state(StateId(1)).unwrap();
        assert_eq!(slot, StateSlot { kind: StateKind::Input, index: 0, key: "a".into() });
        let names: Vec<_> = m.states(StateKind::Input).unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["b"]);
        assert!(m.forget_state(StateId(1)).is_none());

        m.restore_state(slot, StateId(1));
        let names: Vec<_> = m.states(StateKind::Input).unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_attribute() {
        let mut m = mechanism();
        m.set_attribute("in.value".into(), Value::Int(1));
        assert_eq!(m.remove_attribute("in.value"), Some(Value::Int(1)));
        assert!(m.attributes().is_empty());
    }
}
