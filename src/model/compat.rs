//! Compatibility checker.
//!
//! Structural comparison of a candidate value against a reference value or
//! against explicit constraints. Used by every resolver to decide whether
//! a requested value may be used or must be replaced by its default.
//!
//! A mismatch is a normal negative answer, never an error.

use super::{TypeClass, Value};

/// Explicit constraints for [`compatible_with`].
///
/// Each field is optional; unset fields take the defaults described on
/// [`compatible_with`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompatOptions {
    /// Required structural class (reference-less checks only).
    pub type_class: Option<TypeClass>,
    /// Required element count; `Some(0)` disables length checking.
    pub length: Option<usize>,
    /// Whether the candidate must be numeric (or a list of numbers).
    pub numeric: Option<bool>,
}

impl CompatOptions {
    pub fn any_length() -> Self {
        Self { length: Some(0), ..Self::default() }
    }

    pub fn with_type(mut self, class: TypeClass) -> Self {
        self.type_class = Some(class);
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_numeric(mut self, numeric: bool) -> Self {
        self.numeric = Some(numeric);
        self
    }
}

/// Check `candidate` against `reference` with default options.
pub fn compatible(candidate: &Value, reference: &Value) -> bool {
    compatible_with(candidate, Some(reference), &CompatOptions::default())
}

/// Full compatibility check.
///
/// With a reference:
/// - the candidate's class must equal the reference's class (numeric
///   types match each other, enums must share an enum type);
/// - the required length is the reference's length when the reference is
///   sized and length checking is not disabled with `length: Some(0)`;
/// - numeric-ness is required only when the reference itself is numeric.
///
/// Without a reference the defaults are: class `Sequence`, length `1`,
/// numeric `true`.
pub fn compatible_with(candidate: &Value, reference: Option<&Value>, opts: &CompatOptions) -> bool {
    if let Some(reference) = reference {
        if candidate == reference {
            return true;
        }
    }

    let (match_class, match_length, number_only) = match reference {
        None => (
            opts.type_class.clone().unwrap_or(TypeClass::Sequence),
            opts.length.unwrap_or(1),
            opts.numeric.unwrap_or(true),
        ),
        Some(reference) => {
            let length = match (opts.length, reference.len()) {
                (Some(0), _) | (_, None) => 0,
                (_, Some(n)) => n,
            };
            let numeric = reference.is_numeric() && opts.numeric.unwrap_or(true);
            (reference.type_class(), length, numeric)
        }
    };

    // Enum members only match members of the same enum type; a plain value
    // never matches an enum reference and vice versa.
    if candidate.type_class() != match_class {
        return false;
    }

    if candidate.is_numeric() {
        return true;
    }

    if number_only {
        match candidate {
            Value::List(items) if items.iter().all(Value::is_numeric) => {}
            _ => return false,
        }
    }

    let Some(len) = candidate.len() else {
        return true;
    };
    if match_length == 0 {
        return true;
    }
    if len != match_length {
        return false;
    }
    match (candidate, reference) {
        (Value::List(items), Some(Value::List(refs))) => items
            .iter()
            .zip(refs)
            .all(|(c, r)| c.type_class() == r.type_class()),
        _ => true,
    }
}
