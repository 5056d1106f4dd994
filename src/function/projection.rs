//! Built-in projection functions.

use super::ProjectionFunction;
use crate::log::Context;
use crate::model::params::param_f64;
use crate::model::{ParamMap, Value};
use crate::Result;

/// Mapping: scales the sender's value by `weight` (default 1.0).
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingFunction;

impl ProjectionFunction for MappingFunction {
    fn execute(&self, input: &Value, params: &ParamMap, _context: &Context) -> Result<Value> {
        let weight = param_f64(params, "weight", 1.0)?;
        input.map_numeric(&|x| weight * x)
    }
}

/// ControlSignal: `slope * allocation + intercept`.
///
/// The allocation is the `allocation` parameter when present, otherwise
/// the projection's input value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlSignalFunction;

impl ProjectionFunction for ControlSignalFunction {
    fn execute(&self, input: &Value, params: &ParamMap, _context: &Context) -> Result<Value> {
        let slope = param_f64(params, "slope", 1.0)?;
        let intercept = param_f64(params, "intercept", 0.0)?;
        let allocation = match params.get("allocation") {
            None | Some(Value::Null) => input,
            Some(value) => value,
        };
        allocation.map_numeric(&|x| slope * x + intercept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_default_is_identity() {
        let out = MappingFunction.execute(&Value::from(vec![1, 2]), &ParamMap::new(), &Context::default()).unwrap();
        assert_eq!(out, Value::from(vec![1.0, 2.0]));
    }

    #[test]
    fn test_control_signal_allocation_overrides_input() {
        let mut params = ParamMap::new();
        params.insert("allocation".into(), Value::Float(3.0));
        params.insert("slope".into(), Value::Float(2.0));
        params.insert("intercept".into(), Value::Float(1.0));
        let out = ControlSignalFunction.execute(&Value::Float(100.0), &params, &Context::default()).unwrap();
        assert_eq!(out, Value::Float(7.0));
    }

    #[test]
    fn test_non_numeric_input_is_error() {
        assert!(MappingFunction.execute(&Value::from("x"), &ParamMap::new(), &Context::default()).is_err());
    }
}
