//! Fixed-shape numeric arrays and the explicit coercion into them.
//!
//! Every State value is stored as either a numeric scalar or a rectangular
//! numeric array. `to_fixed_shape_numeric` is the single place that turns
//! an arbitrary [`Value`] into that form; it never guesses, and a
//! non-numeric or ragged input is a typed [`Error::CoercionError`].

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::Value;
use crate::{Error, Result};

/// Highest rank a State value may be promoted to.
pub const MAX_RANK: usize = 2;

/// Row-major numeric array with a fixed shape. Rank 0 is a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericArray {
    shape: SmallVec<[usize; 4]>,
    data: Vec<f64>,
}

impl NumericArray {
    pub fn scalar(x: f64) -> Self {
        Self { shape: SmallVec::new(), data: vec![x] }
    }

    /// Read a numeric value, inferring its shape. Lists must be rectangular.
    pub fn from_value(value: &Value) -> Result<Self> {
        let shape = shape_of(value, value)?;
        let mut data = Vec::with_capacity(shape.iter().product());
        flatten_into(value, &mut data);
        Ok(Self { shape, data })
    }

    pub fn rank(&self) -> usize { self.shape.len() }
    pub fn shape(&self) -> &[usize] { &self.shape }
    pub fn data(&self) -> &[f64] { &self.data }
    pub fn len(&self) -> usize { self.data.len() }
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Prepend unit axes until the array has at least `rank` dimensions.
    pub fn at_least(mut self, rank: usize) -> Self {
        while self.shape.len() < rank {
            self.shape.insert(0, 1);
        }
        self
    }

    /// Convert back into a [`Value`]: `Float` for rank 0, nested `List`s otherwise.
    pub fn to_value(&self) -> Value {
        if self.shape.is_empty() {
            return Value::Float(self.data.first().copied().unwrap_or(0.0));
        }
        build_value(&self.shape, &self.data)
    }
}

/// Coerce `value` into a numeric array with at least `rank` dimensions.
///
/// Rank 0 leaves scalars as scalars, rank 1 wraps a scalar into a
/// one-element vector, rank 2 wraps vectors into a single row.
pub fn to_fixed_shape_numeric(value: &Value, rank: usize) -> Result<NumericArray> {
    if rank > MAX_RANK {
        return Err(Error::InvariantViolation(format!(
            "numeric coercion rank must be at most {MAX_RANK}, got {rank}"
        )));
    }
    Ok(NumericArray::from_value(value)?.at_least(rank))
}

fn shape_of(value: &Value, root: &Value) -> Result<SmallVec<[usize; 4]>> {
    match value {
        Value::Int(_) | Value::Float(_) => Ok(SmallVec::new()),
        Value::List(items) => {
            let mut shape: SmallVec<[usize; 4]> = SmallVec::new();
            shape.push(items.len());
            let Some(first) = items.first() else {
                return Ok(shape);
            };
            let inner = shape_of(first, root)?;
            for item in &items[1..] {
                if shape_of(item, root)? != inner {
                    return Err(Error::CoercionError {
                        value: root.to_string(),
                        reason: "ragged nesting".into(),
                    });
                }
            }
            shape.extend(inner);
            Ok(shape)
        }
        other => Err(Error::CoercionError {
            value: root.to_string(),
            reason: format!("non-numeric element of type {}", other.type_name()),
        }),
    }
}

fn flatten_into(value: &Value, out: &mut Vec<f64>) {
    match value {
        Value::List(items) => items.iter().for_each(|item| flatten_into(item, out)),
        other => out.extend(other.as_float()),
    }
}

fn build_value(shape: &[usize], data: &[f64]) -> Value {
    match shape {
        [] => Value::Float(data[0]),
        [n] => Value::List(data[..*n].iter().copied().map(Value::Float).collect()),
        [n, rest @ ..] => {
            let stride: usize = rest.iter().product();
            Value::List(
                (0..*n)
                    .map(|i| build_value(rest, &data[i * stride..(i + 1) * stride]))
                    .collect(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_rank_zero_stays_scalar() {
        let arr = to_fixed_shape_numeric(&Value::Int(5), 0).unwrap();
        assert_eq!(arr.rank(), 0);
        assert_eq!(arr.to_value(), Value::Float(5.0));
    }

    #[test]
    fn test_scalar_rank_one_is_wrapped() {
        let arr = to_fixed_shape_numeric(&Value::Int(5), 1).unwrap();
        assert_eq!(arr.shape(), &[1]);
        assert_eq!(arr.to_value(), Value::from(vec![5.0]));
    }

    #[test]
    fn test_vector_rank_two_becomes_row() {
        let arr = to_fixed_shape_numeric(&Value::from(vec![1, 2]), 2).unwrap();
        assert_eq!(arr.shape(), &[1, 2]);
        assert_eq!(arr.to_value(), Value::List(vec![Value::from(vec![1.0, 2.0])]));
    }

    #[test]
    fn test_matrix_round_trips_shape() {
        let m = Value::List(vec![Value::from(vec![1, 2]), Value::from(vec![3, 4])]);
        let arr = to_fixed_shape_numeric(&m, 1).unwrap();
        assert_eq!(arr.shape(), &[2, 2]);
        assert_eq!(arr.data(), &[1.0, 2.0, 3.0, 4.0]);
        assert!(arr.to_value().numeric_eq(&m));
    }

    #[test]
    fn test_non_numeric_is_coercion_error() {
        let err = to_fixed_shape_numeric(&Value::from(vec!["a", "b"]), 1).unwrap_err();
        assert!(matches!(err, Error::CoercionError { .. }));
    }

    #[test]
    fn test_ragged_is_coercion_error() {
        let ragged = Value::List(vec![Value::from(vec![1, 2]), Value::from(vec![3])]);
        assert!(matches!(
            to_fixed_shape_numeric(&ragged, 1),
            Err(Error::CoercionError { .. })
        ));
    }

    #[test]
    fn test_rank_above_max_is_invariant_violation() {
        assert!(matches!(
            to_fixed_shape_numeric(&Value::Int(1), 3),
            Err(Error::InvariantViolation(_))
        ));
    }
}
