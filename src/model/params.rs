//! ParamMap — named parameters and the well-known keys used in override sets.

use indexmap::IndexMap;

use super::Value;
use crate::{Error, Result};

/// A map of parameter names to values, in insertion order.
pub type ParamMap = IndexMap<String, Value>;

/// Overrides applied to every inbound Projection of a State.
pub const PROJECTION_PARAMS: &str = "projectionParams";
/// Overrides applied to Mapping-family Projections only.
pub const MAPPING_PARAMS: &str = "mappingParams";
/// Overrides applied to ControlSignal-family Projections only.
pub const CONTROL_SIGNAL_PARAMS: &str = "controlSignalParams";
/// Overrides passed to a State's combination function.
pub const FUNCTION_PARAMS: &str = "functionParams";

/// Projection type entry in a projection specification mapping.
pub const PROJECTION_TYPE: &str = "projectionType";
/// Optional sender entry in a projection specification mapping.
pub const PROJECTION_SENDER: &str = "sender";
/// Value entry in a State specification mapping.
pub const STATE_VALUE: &str = "value";
/// Parameters entry in a State specification mapping.
pub const STATE_PARAMS: &str = "params";
/// Inbound projection specs inside a State's parameters.
pub const STATE_PROJECTIONS: &str = "projections";

/// Read `source[key]` as a nested parameter map; absent or non-map entries yield an empty map.
pub fn sub_map(source: &ParamMap, key: &str) -> ParamMap {
    match source.get(key) {
        Some(Value::Map(entries)) => entries.clone(),
        _ => ParamMap::new(),
    }
}

/// Overlay `source[specific]` on top of `general`. Entries from the specific
/// map win on key collisions.
pub fn merge_param_maps(source: &ParamMap, specific: &str, general: &ParamMap) -> ParamMap {
    let mut merged = general.clone();
    merged.extend(sub_map(source, specific));
    merged
}

/// Read a numeric parameter, falling back to `default` when it is absent.
pub fn param_f64(params: &ParamMap, key: &str, default: f64) -> Result<f64> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value.as_float().ok_or_else(|| Error::TypeError {
            expected: format!("numeric parameter '{key}'"),
            got: value.type_name().into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_specific_over_general() {
        let mut bucket = ParamMap::new();
        bucket.insert("weight".into(), Value::Float(2.0));
        bucket.insert("bias".into(), Value::Float(0.5));

        let mut source = ParamMap::new();
        source.insert(
            "P1".into(),
            Value::Map([("weight".to_string(), Value::Float(3.0))].into_iter().collect()),
        );

        let merged = merge_param_maps(&source, "P1", &bucket);
        assert_eq!(merged.get("weight"), Some(&Value::Float(3.0)));
        assert_eq!(merged.get("bias"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn test_non_map_entry_is_ignored() {
        let mut source = ParamMap::new();
        source.insert(MAPPING_PARAMS.into(), Value::Int(7));
        assert!(sub_map(&source, MAPPING_PARAMS).is_empty());
    }

    #[test]
    fn test_param_f64() {
        let mut params = ParamMap::new();
        params.insert("slope".into(), Value::Int(2));
        params.insert("label".into(), Value::from("x"));
        assert_eq!(param_f64(&params, "slope", 1.0).unwrap(), 2.0);
        assert_eq!(param_f64(&params, "missing", 1.0).unwrap(), 1.0);
        assert!(param_f64(&params, "label", 1.0).is_err());
    }
}
