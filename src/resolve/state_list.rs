//! State-list resolver: all States of one kind for an owner.

use indexmap::IndexMap;
use tracing::debug;

use crate::diagnostics::DiagnosticKind;
use crate::log::Context;
use crate::model::{MechanismId, StateId, StateKind, Value};
use crate::session::Session;
use crate::spec::{StateEntry, StateListSpec, StateParams, StateSpec};
use crate::{Error, Result};

impl Session {
    /// Resolve a State list against per-State constraint values.
    ///
    /// `constraint` must be a list with one item per State, except for a
    /// `Single` spec, which is resolved against the whole constraint. An
    /// empty spec builds one default State per constraint item. The number
    /// of entries must match the number of constraint items.
    ///
    /// One State may fill only one entry: a list that resolves to the same
    /// State twice, or to two States with one name, is a configuration
    /// error.
    ///
    /// On error, States created by this call are discarded, States it took
    /// over from other owners are handed back, and nothing is returned.
    pub fn resolve_state_list(
        &mut self,
        owner: MechanismId,
        spec: StateListSpec,
        kind: StateKind,
        constraint: &Value,
        constraint_name: &str,
        context: &Context,
    ) -> Result<IndexMap<String, StateId>> {
        let watermark = self.next_state_watermark();
        let mark = self.begin_transfers();
        let result = self.resolve_entries(owner, spec, kind, constraint, constraint_name, context);
        if result.is_err() {
            self.rollback_transfers(mark)?;
            for id in self.state_ids_from(watermark) {
                self.discard_state(id)?;
            }
        } else {
            self.commit_transfers();
        }
        result
    }

    fn resolve_entries(
        &mut self,
        owner: MechanismId,
        spec: StateListSpec,
        kind: StateKind,
        constraint: &Value,
        constraint_name: &str,
        context: &Context,
    ) -> Result<IndexMap<String, StateId>> {
        let owner_name = self.mechanism(owner)?.name.clone();
        let mut states: IndexMap<String, StateId> = IndexMap::new();

        let spec = if spec.is_empty() {
            self.diagnose(
                owner,
                DiagnosticKind::DefaultStateList,
                kind.name(),
                format!(
                    "no {kind}s specified for {owner_name}; defaults will be created using its {constraint_name} ({constraint})"
                ),
            );
            let items = constraint_items(constraint, kind, constraint_name)?;
            StateListSpec::List(items.iter().cloned().map(StateEntry::from).collect())
        } else {
            spec
        };

        match spec {
            StateListSpec::Single(spec) => {
                let name = format!("Default{}", kind.name());
                let id = self.resolve_state(owner, kind, &name, spec, None, constraint, constraint_name, context)?;
                self.add_resolved(&mut states, id, &owner_name)?;
            }
            StateListSpec::Map(entries) => {
                let items = constraint_items(constraint, kind, constraint_name)?;
                check_count(entries.len(), items.len(), kind, &owner_name, constraint_name)?;
                for ((name, spec), item) in entries.into_iter().zip(items) {
                    let id = self.resolve_state(owner, kind, &name, spec, None, item, constraint_name, context)?;
                    self.add_resolved(&mut states, id, &owner_name)?;
                }
            }
            StateListSpec::List(entries) => {
                let items = constraint_items(constraint, kind, constraint_name)?;
                let count = entries.len();
                check_count(count, items.len(), kind, &owner_name, constraint_name)?;
                for (index, (entry, item)) in entries.into_iter().zip(items).enumerate() {
                    let (head, params) = split_params(entry, kind, &owner_name)?;
                    let (name, spec) = match head {
                        StateEntry::Name(requested) => {
                            let name = if states.contains_key(&requested) {
                                format!("{requested}-{index}")
                            } else {
                                requested
                            };
                            (name, StateSpec::Value(item.clone()))
                        }
                        StateEntry::Spec(spec) => (default_name(kind, count, index), spec),
                        StateEntry::WithParams(..) => nested_params_error(kind, &owner_name)?,
                    };
                    let id = self.resolve_state(owner, kind, &name, spec, params, item, constraint_name, context)?;
                    self.add_resolved(&mut states, id, &owner_name)?;
                }
            }
            StateListSpec::Empty => {}
        }

        debug!(owner = %owner, kind = %kind, count = states.len(), "resolved state list");
        Ok(states)
    }

    fn add_resolved(&self, states: &mut IndexMap<String, StateId>, id: StateId, owner: &str) -> Result<()> {
        let state = self.state(id)?;
        if let Some((listed, _)) = states.iter().find(|(_, listed)| **listed == id) {
            return Err(Error::ConfigurationError(format!(
                "{} {} of {owner} is specified more than once (first as {listed})",
                state.kind, state.name
            )));
        }
        if states.contains_key(&state.name) {
            return Err(Error::ConfigurationError(format!(
                "more than one {} of {owner} is named {}",
                state.kind, state.name
            )));
        }
        states.insert(state.name.clone(), id);
        Ok(())
    }
}

/// Constraint items, one per State. A non-list constraint is a programmer error.
fn constraint_items<'a>(constraint: &'a Value, kind: StateKind, constraint_name: &str) -> Result<&'a [Value]> {
    constraint.as_list().ok_or_else(|| {
        Error::InvariantViolation(format!(
            "{constraint_name} ({constraint}) for {kind}s must be an indexable list of values"
        ))
    })
}

fn check_count(entries: usize, items: usize, kind: StateKind, owner: &str, constraint_name: &str) -> Result<()> {
    if entries > items {
        return Err(Error::ConfigurationError(format!(
            "there are too many {kind}s specified ({entries}) in {owner} for the number of values ({items}) in its {constraint_name}"
        )));
    }
    if entries < items {
        return Err(Error::ConfigurationError(format!(
            "there are fewer {kind}s specified ({entries}) than the number of values ({items}) in the {constraint_name} of {owner}"
        )));
    }
    Ok(())
}

fn split_params(entry: StateEntry, kind: StateKind, owner: &str) -> Result<(StateEntry, Option<StateParams>)> {
    match entry {
        StateEntry::WithParams(head, params) => match *head {
            StateEntry::WithParams(..) => nested_params_error(kind, owner),
            head => Ok((head, Some(params))),
        },
        other => Ok((other, None)),
    }
}

fn nested_params_error<T>(kind: StateKind, owner: &str) -> Result<T> {
    Err(Error::ConfigurationError(format!(
        "list of {kind}s for {owner} has an entry with more than one parameter set"
    )))
}

/// `Default<Kind>` for a sole entry, `Default<Kind>-<n>` (1-based) otherwise.
fn default_name(kind: StateKind, count: usize, index: usize) -> String {
    if count == 1 {
        format!("Default{}", kind.name())
    } else {
        format!("Default{}-{}", kind.name(), index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::construction("test")
    }

    #[test]
    fn test_default_names() {
        assert_eq!(default_name(StateKind::Input, 1, 0), "DefaultInputState");
        assert_eq!(default_name(StateKind::Output, 3, 2), "DefaultOutputState-3");
    }

    #[test]
    fn test_non_list_constraint_is_invariant_violation() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        let err = s
            .resolve_state_list(m, StateListSpec::Empty, StateKind::Input, &Value::Int(3), "variable", &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn test_duplicate_names_are_suffixed_by_position() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        let constraint = Value::from(vec![vec![0], vec![1]]);
        let states = s
            .resolve_state_list(
                m,
                StateListSpec::List(vec!["x".into(), "x".into()]),
                StateKind::Input,
                &constraint,
                "variable",
                &ctx(),
            )
            .unwrap();
        assert_eq!(states.keys().collect::<Vec<_>>(), vec!["x", "x-1"]);
        assert_eq!(s.state(states["x-1"]).unwrap().value, Value::from(vec![1.0]));
    }

    #[test]
    fn test_entry_params_are_applied() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        let entry = StateEntry::from("in").with_params(StateParams::default().with_param("gain", 2));
        let states = s
            .resolve_state_list(
                m,
                StateListSpec::List(vec![entry]),
                StateKind::Input,
                &Value::from(vec![vec![0, 0]]),
                "variable",
                &ctx(),
            )
            .unwrap();
        assert_eq!(s.state(states["in"]).unwrap().params.get("gain"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_failure_discards_created_states() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        let entries = vec![
            StateEntry::Spec(StateSpec::value(vec![0])),
            StateEntry::Spec(StateSpec::Tuple(Value::Int(1), crate::spec::ProjectionSpec::keyword("Mapping"))),
        ];
        let err = s
            .resolve_state_list(
                m,
                StateListSpec::List(entries),
                StateKind::Input,
                &Value::from(vec![vec![0], vec![0]]),
                "variable",
                &ctx(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
        assert_eq!(s.state_count(), 0);
        assert!(s.mechanism(m).unwrap().attributes().is_empty());
    }

    #[test]
    fn test_same_state_twice_is_error() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        let id = s
            .create_state(m, StateKind::Input, Value::from(vec![0, 0]), StateParams::default(), Some("x"), &ctx())
            .unwrap();
        let entries = vec![
            StateEntry::Spec(StateSpec::Existing(id)),
            StateEntry::Spec(StateSpec::Existing(id)),
        ];
        let err = s
            .resolve_state_list(
                m,
                StateListSpec::List(entries),
                StateKind::Input,
                &Value::from(vec![vec![0, 0], vec![0, 0]]),
                "variable",
                &ctx(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
        assert_eq!(s.state_count(), 1);
        assert_eq!(s.state(id).unwrap().owner, m);
    }
}
