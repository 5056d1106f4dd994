//! JSON front-end for specifications.
//!
//! Loosely-typed JSON is mapped onto the closed spec variants:
//!
//! ```text
//! 5, [0, 0]                                  → StateSpec::Value
//! "InputState"                               → StateSpec::Kind
//! "Mapping"                                  → StateSpec::Projection(Keyword)
//! {"value": .., "params": {..}}              → StateSpec::Map
//! {"value": .., "projection": ..}            → StateSpec::ValueProjection
//! [5, "ControlSignal"]                       → StateSpec::Tuple
//! {"projectionType": .., "projectionParams": {..}, "sender": 3}
//!                                            → StateSpec::Projection(Map)
//! ```
//!
//! A 2-element array is only read as a tuple when its second item is a
//! registered projection keyword or a projection mapping; otherwise it is
//! a plain value.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value as Json;

use super::{
    ProjectionSpec, ProjectionSpecMap, ProjectionTypeRef, StateEntry, StateListSpec, StateParams,
    StateSpec, StateSpecMap,
};
use crate::function::LinearCombination;
use crate::model::params::{
    FUNCTION_PARAMS, PROJECTION_PARAMS, PROJECTION_SENDER, PROJECTION_TYPE, STATE_PARAMS,
    STATE_PROJECTIONS, STATE_VALUE,
};
use crate::model::{ParamMap, StateId, StateKind, Value};
use crate::registry::ProjectionTypeRegistry;
use crate::{Error, Result};

const VALUE_PROJECTION: &str = "projection";
const STATE_FUNCTION: &str = "function";

impl ProjectionSpec {
    /// Parse a projection specification.
    pub fn from_json(json: &Json, types: &ProjectionTypeRegistry) -> Result<Self> {
        match json {
            Json::String(keyword) => Ok(match types.get(keyword) {
                Some(t) => ProjectionSpec::Type(t),
                None => ProjectionSpec::Keyword(keyword.clone()),
            }),
            Json::Object(entries) if is_projection_map(json) => {
                let projection_type = match entries.get(PROJECTION_TYPE) {
                    None | Some(Json::Null) => None,
                    Some(Json::String(k)) => Some(match types.get(k) {
                        Some(t) => ProjectionTypeRef::Type(t),
                        None => ProjectionTypeRef::Keyword(k.clone()),
                    }),
                    Some(other) => Some(ProjectionTypeRef::Keyword(other.to_string())),
                };
                let params = entries.get(PROJECTION_PARAMS).map(param_map).transpose()?;
                let sender = match entries.get(PROJECTION_SENDER) {
                    None | Some(Json::Null) => None,
                    Some(Json::Number(n)) => n.as_u64().map(StateId),
                    Some(other) => {
                        return Err(Error::ConfigurationError(format!(
                            "projection sender must be a state id, got {other}"
                        )))
                    }
                };
                Ok(ProjectionSpec::Map(ProjectionSpecMap { projection_type, params, sender }))
            }
            other => Ok(ProjectionSpec::Unrecognized(Value::from(other))),
        }
    }

    /// Parse a single spec or an array of them.
    pub fn list_from_json(json: &Json, types: &ProjectionTypeRegistry) -> Result<Vec<Self>> {
        match json {
            Json::Null => Ok(Vec::new()),
            Json::Array(items) => items.iter().map(|item| Self::from_json(item, types)).collect(),
            single => Ok(vec![Self::from_json(single, types)?]),
        }
    }
}

impl StateParams {
    /// Parse a State parameter mapping. `null` is an empty set.
    pub fn from_json(json: &Json, types: &ProjectionTypeRegistry) -> Result<Self> {
        let entries = match json {
            Json::Null => return Ok(StateParams::default()),
            Json::Object(entries) => entries,
            other => {
                return Err(Error::ConfigurationError(format!(
                    "state params must be a mapping, got {other}"
                )))
            }
        };

        let mut params = StateParams::default();
        for (key, value) in entries {
            match key.as_str() {
                STATE_PROJECTIONS => params.projections = ProjectionSpec::list_from_json(value, types)?,
                PROJECTION_TYPE => match value {
                    Json::String(k) => params.projection_type = Some(k.clone()),
                    other => {
                        return Err(Error::TypeError {
                            expected: "projection type keyword".into(),
                            got: other.to_string(),
                        })
                    }
                },
                STATE_FUNCTION => {
                    let function: LinearCombination = serde_json::from_value(value.clone())?;
                    params.function = Some(Arc::new(function));
                }
                FUNCTION_PARAMS => params.function_params = param_map(value)?,
                _ => {
                    params.extra.insert(key.clone(), Value::from(value));
                }
            }
        }
        Ok(params)
    }
}

impl StateSpec {
    /// Parse one State specification.
    pub fn from_json(json: &Json, types: &ProjectionTypeRegistry) -> Result<Self> {
        match json {
            Json::String(s) => Ok(match state_kind(s) {
                Some(kind) => StateSpec::Kind(kind),
                None => StateSpec::Projection(ProjectionSpec::from_json(json, types)?),
            }),
            Json::Object(_) if is_projection_map(json) => {
                Ok(StateSpec::Projection(ProjectionSpec::from_json(json, types)?))
            }
            Json::Object(entries) if entries.contains_key(VALUE_PROJECTION) => {
                Ok(StateSpec::ValueProjection {
                    value: entries.get(STATE_VALUE).map(Value::from).unwrap_or(Value::Null),
                    projection: ProjectionSpec::from_json(&entries[VALUE_PROJECTION], types)?,
                })
            }
            Json::Object(entries) => Ok(StateSpec::Map(StateSpecMap {
                value: entries.get(STATE_VALUE).map(Value::from),
                params: entries
                    .get(STATE_PARAMS)
                    .map(|p| StateParams::from_json(p, types))
                    .transpose()?,
            })),
            Json::Array(items) if items.len() == 2 && is_projection_like(&items[1], types) => Ok(
                StateSpec::Tuple(Value::from(&items[0]), ProjectionSpec::from_json(&items[1], types)?),
            ),
            other => Ok(StateSpec::Value(Value::from(other))),
        }
    }
}

impl StateEntry {
    /// Parse one item of a State list.
    pub fn from_json(json: &Json, types: &ProjectionTypeRegistry) -> Result<Self> {
        match json {
            Json::String(name) if state_kind(name).is_none() && !types.contains(name) => {
                Ok(StateEntry::Name(name.clone()))
            }
            Json::Array(items)
                if items.len() == 2
                    && (items[1].is_null() || (items[1].is_object() && !is_projection_map(&items[1]))) =>
            {
                let head = StateEntry::from_json(&items[0], types)?;
                Ok(head.with_params(StateParams::from_json(&items[1], types)?))
            }
            other => Ok(StateEntry::Spec(StateSpec::from_json(other, types)?)),
        }
    }
}

impl StateListSpec {
    /// Parse the specification for all States of one kind.
    pub fn from_json(json: &Json, types: &ProjectionTypeRegistry) -> Result<Self> {
        match json {
            Json::Null => Ok(StateListSpec::Empty),
            Json::Array(items) if items.is_empty() => Ok(StateListSpec::Empty),
            Json::Array(items) => Ok(StateListSpec::List(
                items.iter().map(|item| StateEntry::from_json(item, types)).collect::<Result<_>>()?,
            )),
            Json::Object(entries) if entries.is_empty() => Ok(StateListSpec::Empty),
            Json::Object(_) if is_state_map(json) => {
                Ok(StateListSpec::Single(StateSpec::from_json(json, types)?))
            }
            Json::Object(entries) => {
                let mut specs = IndexMap::with_capacity(entries.len());
                for (name, spec) in entries {
                    specs.insert(name.clone(), StateSpec::from_json(spec, types)?);
                }
                Ok(StateListSpec::Map(specs))
            }
            single => Ok(StateListSpec::Single(StateSpec::from_json(single, types)?)),
        }
    }

    pub fn from_json_str(json: &str, types: &ProjectionTypeRegistry) -> Result<Self> {
        Self::from_json(&serde_json::from_str(json)?, types)
    }
}

fn state_kind(name: &str) -> Option<StateKind> {
    StateKind::ALL.into_iter().find(|k| k.name() == name)
}

fn is_projection_map(json: &Json) -> bool {
    json.as_object().is_some_and(|entries| {
        entries.contains_key(PROJECTION_TYPE) || entries.contains_key(PROJECTION_PARAMS)
    })
}

/// Whether an object reads as a single State spec rather than name → spec.
fn is_state_map(json: &Json) -> bool {
    is_projection_map(json)
        || json.as_object().is_some_and(|entries| {
            entries.contains_key(STATE_VALUE) || entries.contains_key(STATE_PARAMS)
        })
}

fn is_projection_like(json: &Json, types: &ProjectionTypeRegistry) -> bool {
    match json {
        Json::String(keyword) => types.contains(keyword),
        other => is_projection_map(other),
    }
}

fn param_map(json: &Json) -> Result<ParamMap> {
    match Value::from(json) {
        Value::Null => Ok(ParamMap::new()),
        Value::Map(entries) => Ok(entries),
        other => Err(Error::TypeError { expected: "parameter mapping".into(), got: other.type_name().into() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn types() -> ProjectionTypeRegistry {
        ProjectionTypeRegistry::with_builtins()
    }

    #[test]
    fn test_projection_map_with_params() {
        let spec = StateSpec::from_json(
            &json!({"projectionType": "Mapping", "projectionParams": {"weight": 2}}),
            &types(),
        )
        .unwrap();
        let StateSpec::Projection(ProjectionSpec::Map(map)) = spec else {
            panic!("expected a projection mapping, got {spec:?}");
        };
        assert!(matches!(map.projection_type, Some(ProjectionTypeRef::Type(ref t)) if t.keyword == "Mapping"));
        assert_eq!(map.params.unwrap().get("weight"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_tuple_requires_projection_second_item() {
        let t = types();
        assert!(matches!(
            StateSpec::from_json(&json!([5, "ControlSignal"]), &t).unwrap(),
            StateSpec::Tuple(Value::Int(5), ProjectionSpec::Type(_))
        ));
        assert!(matches!(
            StateSpec::from_json(&json!([5, 6]), &t).unwrap(),
            StateSpec::Value(Value::List(_))
        ));
    }

    #[test]
    fn test_strings() {
        let t = types();
        assert!(matches!(StateSpec::from_json(&json!("ParameterState"), &t).unwrap(), StateSpec::Kind(StateKind::Parameter)));
        assert!(matches!(
            StateSpec::from_json(&json!("Learning"), &t).unwrap(),
            StateSpec::Projection(ProjectionSpec::Keyword(ref k)) if k == "Learning"
        ));
        assert!(matches!(StateEntry::from_json(&json!("stimulus"), &t).unwrap(), StateEntry::Name(ref n) if n == "stimulus"));
    }

    #[test]
    fn test_state_map_with_params() {
        let spec = StateSpec::from_json(
            &json!({"value": [1, 2], "params": {"projections": ["Mapping"], "functionParams": {"scale": 2}, "gain": 3}}),
            &types(),
        )
        .unwrap();
        let StateSpec::Map(map) = spec else { panic!("expected a state mapping") };
        assert_eq!(map.value, Some(Value::from(vec![1, 2])));
        let params = map.params.unwrap();
        assert_eq!(params.projections.len(), 1);
        assert_eq!(params.function_params.get("scale"), Some(&Value::Int(2)));
        assert_eq!(params.extra.get("gain"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_list_shapes() {
        let t = types();
        assert!(matches!(StateListSpec::from_json(&json!(null), &t).unwrap(), StateListSpec::Empty));
        assert!(matches!(StateListSpec::from_json(&json!(7), &t).unwrap(), StateListSpec::Single(_)));
        assert!(matches!(StateListSpec::from_json(&json!({"value": 7}), &t).unwrap(), StateListSpec::Single(_)));

        let StateListSpec::Map(named) = StateListSpec::from_json(&json!({"b": [0], "a": [1]}), &t).unwrap() else {
            panic!("expected a named list");
        };
        assert_eq!(named.keys().collect::<Vec<_>>(), vec!["b", "a"]);

        let StateListSpec::List(entries) =
            StateListSpec::from_json(&json!(["x", [[0, 0], {"gain": 1}], [1, 1]]), &t).unwrap()
        else {
            panic!("expected a list");
        };
        assert!(matches!(entries[0], StateEntry::Name(_)));
        assert!(matches!(entries[1], StateEntry::WithParams(..)));
        assert!(matches!(entries[2], StateEntry::Spec(StateSpec::Value(_))));
    }

    #[test]
    fn test_bad_sender_is_error() {
        let err = ProjectionSpec::from_json(&json!({"projectionType": "Mapping", "sender": "x"}), &types());
        assert!(matches!(err, Err(Error::ConfigurationError(_))));
    }
}
