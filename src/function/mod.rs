//! Function contracts consumed by States and Projections.
//!
//! | Trait | Implementations | Used by |
//! |-------|-----------------|---------|
//! | `CombinationFunction` | `LinearCombination` | `State` aggregation |
//! | `ProjectionFunction` | `MappingFunction`, `ControlSignalFunction` | `Projection` update |

pub mod combination;
pub mod projection;

pub use combination::{LinearCombination, Operation};
pub use projection::{ControlSignalFunction, MappingFunction};

use std::fmt::Debug;

use crate::log::Context;
use crate::model::{ParamMap, Value};
use crate::Result;

/// Merges the values of a State's inbound Projections into one value.
///
/// `variable` holds one entry per inbound Projection, in the State's
/// projection order.
pub trait CombinationFunction: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn execute(&self, variable: &[Value], params: &ParamMap, context: &Context) -> Result<Value>;
}

/// Computes a Projection's output from its input value.
pub trait ProjectionFunction: Send + Sync + Debug {
    fn execute(&self, input: &Value, params: &ParamMap, context: &Context) -> Result<Value>;
}

/// Unwrap a single-element list back into a scalar when the State holding
/// it is scalar-shaped. Anything else passes through unchanged.
pub fn unwrap_scalar(value_is_scalar: bool, combined: Value) -> Value {
    match combined {
        Value::List(mut items) if value_is_scalar && items.len() == 1 => items.remove(0),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_scalar() {
        assert_eq!(unwrap_scalar(true, Value::from(vec![3.0])), Value::Float(3.0));
        assert_eq!(unwrap_scalar(false, Value::from(vec![3.0])), Value::from(vec![3.0]));
        assert_eq!(unwrap_scalar(true, Value::from(vec![1.0, 2.0])), Value::from(vec![1.0, 2.0]));
        assert_eq!(unwrap_scalar(true, Value::Float(3.0)), Value::Float(3.0));
    }
}
