//! Linear combination over a list of equally-shaped numeric values.

use serde::{Deserialize, Serialize};

use super::CombinationFunction;
use crate::log::Context;
use crate::model::params::param_f64;
use crate::model::{ParamMap, Value};
use crate::{Error, Result};

/// Elementwise fold applied across the combined values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Sum,
    Product,
}

impl Operation {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SUM" => Some(Operation::Sum),
            "PRODUCT" => Some(Operation::Product),
            _ => None,
        }
    }
}

/// `scale * fold(values) + offset`, elementwise. Shape-preserving: scalars
/// combine to a scalar, vectors to a vector of the same length.
///
/// Parameters (overridable per call): `operation` (`"SUM"` / `"PRODUCT"`),
/// `scale`, `offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearCombination {
    pub operation: Operation,
    pub scale: f64,
    pub offset: f64,
}

impl LinearCombination {
    pub fn sum() -> Self {
        Self { operation: Operation::Sum, scale: 1.0, offset: 0.0 }
    }

    pub fn product() -> Self {
        Self { operation: Operation::Product, ..Self::sum() }
    }
}

impl Default for LinearCombination {
    fn default() -> Self {
        Self::sum()
    }
}

impl CombinationFunction for LinearCombination {
    fn name(&self) -> &str {
        "LinearCombination"
    }

    fn execute(&self, variable: &[Value], params: &ParamMap, _context: &Context) -> Result<Value> {
        let operation = match params.get("operation") {
            None => self.operation,
            Some(Value::String(s)) => Operation::parse(s).ok_or_else(|| {
                Error::FunctionError(format!("LinearCombination: unknown operation '{s}'"))
            })?,
            Some(other) => {
                return Err(Error::TypeError {
                    expected: "operation name".into(),
                    got: other.type_name().into(),
                })
            }
        };
        let scale = param_f64(params, "scale", self.scale)?;
        let offset = param_f64(params, "offset", self.offset)?;

        let (first, rest) = variable.split_first().ok_or_else(|| {
            Error::FunctionError("LinearCombination: nothing to combine".into())
        })?;
        let mut acc = first.map_numeric(&|x| x)?;
        for item in rest {
            acc = match operation {
                Operation::Sum => acc.zip_numeric(item, &|a, b| a + b)?,
                Operation::Product => acc.zip_numeric(item, &|a, b| a * b)?,
            };
        }
        acc.map_numeric(&|x| scale * x + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::execution("test")
    }

    #[test]
    fn test_sum_scalars() {
        let f = LinearCombination::sum();
        let out = f.execute(&[Value::Int(1), Value::Int(2), Value::Int(3)], &ParamMap::new(), &ctx()).unwrap();
        assert_eq!(out, Value::Float(6.0));
    }

    #[test]
    fn test_sum_vectors() {
        let f = LinearCombination::sum();
        let out = f
            .execute(&[Value::from(vec![1.0, 2.0]), Value::from(vec![3.0, 4.0])], &ParamMap::new(), &ctx())
            .unwrap();
        assert_eq!(out, Value::from(vec![4.0, 6.0]));
    }

    #[test]
    fn test_product_with_scale_and_offset() {
        let f = LinearCombination::product();
        let mut params = ParamMap::new();
        params.insert("scale".into(), Value::Float(2.0));
        params.insert("offset".into(), Value::Float(1.0));
        let out = f.execute(&[Value::Float(2.0), Value::Float(3.0)], &params, &ctx()).unwrap();
        assert_eq!(out, Value::Float(13.0));
    }

    #[test]
    fn test_operation_override() {
        let f = LinearCombination::sum();
        let mut params = ParamMap::new();
        params.insert("operation".into(), Value::from("product"));
        let out = f.execute(&[Value::Float(2.0), Value::Float(5.0)], &params, &ctx()).unwrap();
        assert_eq!(out, Value::Float(10.0));
    }

    #[test]
    fn test_empty_is_error() {
        assert!(LinearCombination::sum().execute(&[], &ParamMap::new(), &ctx()).is_err());
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        let f = LinearCombination::sum();
        let values = [Value::from(vec![1.0, 2.0]), Value::from(vec![1.0, 2.0, 3.0])];
        assert!(f.execute(&values, &ParamMap::new(), &ctx()).is_err());
    }
}
