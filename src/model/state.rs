//! State — a named, owned value slot (input, output or parameter) of a Mechanism.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{MechanismId, ParamMap, ProjectionId, Value};
use crate::function::CombinationFunction;

/// Opaque state identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub u64);

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which slot of its owner a State represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    Input,
    Output,
    Parameter,
}

impl StateKind {
    pub const ALL: [StateKind; 3] = [StateKind::Input, StateKind::Parameter, StateKind::Output];

    /// Category name, also the prefix of generated State names.
    pub fn name(&self) -> &'static str {
        match self {
            StateKind::Input => "InputState",
            StateKind::Output => "OutputState",
            StateKind::Parameter => "ParameterState",
        }
    }

    /// Keyword of the Projection type built when a spec does not name one.
    pub fn default_projection_type(&self) -> &'static str {
        match self {
            StateKind::Input | StateKind::Output => "Mapping",
            StateKind::Parameter => "ControlSignal",
        }
    }

    /// Minimum rank State values of this kind are coerced to.
    ///
    /// Parameter values keep scalars scalar; input and output values are
    /// always at least vectors.
    pub fn value_rank(&self) -> usize {
        match self {
            StateKind::Parameter => 0,
            StateKind::Input | StateKind::Output => 1,
        }
    }
}

impl std::fmt::Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A State owned by exactly one Mechanism.
///
/// `variable` and `base_value` are frozen at construction; `value` is
/// rewritten by every aggregation. The projection lists are back-references
/// into the session arena, never owning.
#[derive(Debug, Clone)]
pub struct State {
    pub id: StateId,
    pub name: String,
    pub kind: StateKind,
    pub owner: MechanismId,
    /// Current computed value.
    pub value: Value,
    base_value: Value,
    variable: Value,
    /// Projections for which this State is the receiver, in arrival order.
    pub receives_from: Vec<ProjectionId>,
    /// Projections for which this State is the sender.
    pub sends_to: Vec<ProjectionId>,
    pub function: Arc<dyn CombinationFunction>,
    pub function_params: ParamMap,
    /// Keyword of the Projection type used for default projections.
    pub default_projection_type: String,
    /// Any further parameters supplied with the specification.
    pub params: ParamMap,
}

impl State {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: StateId,
        name: String,
        kind: StateKind,
        owner: MechanismId,
        value: Value,
        function: Arc<dyn CombinationFunction>,
        function_params: ParamMap,
        default_projection_type: String,
        params: ParamMap,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            owner,
            base_value: value.clone(),
            variable: value.clone(),
            value,
            receives_from: Vec::new(),
            sends_to: Vec::new(),
            function,
            function_params,
            default_projection_type,
            params,
        }
    }

    /// Value supplied at construction.
    pub fn base_value(&self) -> &Value {
        &self.base_value
    }

    /// Shape/type template every value of this State is validated against.
    pub fn variable(&self) -> &Value {
        &self.variable
    }

    /// Whether the current value is a bare number rather than a vector.
    pub fn is_scalar(&self) -> bool {
        self.value.is_numeric()
    }

    pub fn receives_from(&self, projection: ProjectionId) -> bool {
        self.receives_from.contains(&projection)
    }

    /// Key under which the owner records this State's value.
    pub fn value_attribute(&self) -> String {
        format!("{}.value", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::LinearCombination;

    fn state(value: Value) -> State {
        State::new(
            StateId(1),
            "s".into(),
            StateKind::Input,
            MechanismId(1),
            value,
            Arc::new(LinearCombination::sum()),
            ParamMap::new(),
            "Mapping".into(),
            ParamMap::new(),
        )
    }

    #[test]
    fn test_new_freezes_base_value_and_variable() {
        let mut s = state(Value::from(vec![0.0, 0.0]));
        s.value = Value::from(vec![1.0, 2.0]);
        assert_eq!(s.base_value(), &Value::from(vec![0.0, 0.0]));
        assert_eq!(s.variable(), &Value::from(vec![0.0, 0.0]));
        assert_eq!(s.value_attribute(), "s.value");
    }

    #[test]
    fn test_kind_defaults() {
        assert_eq!(StateKind::Parameter.default_projection_type(), "ControlSignal");
        assert_eq!(StateKind::Input.value_rank(), 1);
        assert_eq!(StateKind::Output.name(), "OutputState");
    }
}
