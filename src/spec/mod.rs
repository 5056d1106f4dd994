//! Specifications are the loosely-typed descriptions resolvers turn into
//! concrete States and Projections.
//!
//! Every shape a caller may hand in is one variant of a closed enum, so each
//! resolver is a single `match` instead of a chain of runtime type checks.
//!
//! | Type | Describes |
//! |------|-----------|
//! | `ProjectionSpec` | one inbound Projection of a State |
//! | `StateSpec` | one State |
//! | `StateParams` | construction parameters for one State |
//! | `StateEntry` | one item of a State list |
//! | `StateListSpec` | all States of one kind for an owner |

mod json;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::function::CombinationFunction;
use crate::model::{ParamMap, ProjectionId, ProjectionType, StateId, StateKind, Value};

// ============================================================================
// Projection specifications
// ============================================================================

/// Projection type named by a specification mapping.
#[derive(Debug, Clone)]
pub enum ProjectionTypeRef {
    /// Registry keyword, e.g. `"Mapping"`. Unknown keywords fall back to the
    /// State's default type.
    Keyword(String),
    /// A type object, used as-is.
    Type(Arc<ProjectionType>),
}

/// Specification mapping for a Projection.
#[derive(Debug, Clone, Default)]
pub struct ProjectionSpecMap {
    pub projection_type: Option<ProjectionTypeRef>,
    pub params: Option<ParamMap>,
    pub sender: Option<StateId>,
}

/// One Projection specification, in resolution order.
#[derive(Debug, Clone)]
pub enum ProjectionSpec {
    /// An already-built Projection in the session.
    Existing(ProjectionId),
    /// `{projectionType, projectionParams, sender}`.
    Map(ProjectionSpecMap),
    /// A type reference.
    Type(Arc<ProjectionType>),
    /// A registry keyword.
    Keyword(String),
    /// Anything else; resolves to the State's default projection type.
    Unrecognized(Value),
}

impl ProjectionSpec {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        ProjectionSpec::Keyword(keyword.into())
    }

    /// Mapping spec naming a type keyword and its parameters.
    pub fn typed(keyword: impl Into<String>, params: ParamMap) -> Self {
        ProjectionSpec::Map(ProjectionSpecMap {
            projection_type: Some(ProjectionTypeRef::Keyword(keyword.into())),
            params: Some(params),
            sender: None,
        })
    }

    /// Mapping spec for a Projection fed by `sender`.
    pub fn from_sender(sender: StateId, projection_type: Option<&str>) -> Self {
        ProjectionSpec::Map(ProjectionSpecMap {
            projection_type: projection_type.map(|k| ProjectionTypeRef::Keyword(k.to_string())),
            params: None,
            sender: Some(sender),
        })
    }
}

impl From<ProjectionId> for ProjectionSpec {
    fn from(id: ProjectionId) -> Self {
        ProjectionSpec::Existing(id)
    }
}

impl From<Arc<ProjectionType>> for ProjectionSpec {
    fn from(t: Arc<ProjectionType>) -> Self {
        ProjectionSpec::Type(t)
    }
}

impl fmt::Display for ProjectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionSpec::Existing(id) => write!(f, "projection {id}"),
            ProjectionSpec::Map(m) => match &m.projection_type {
                Some(ProjectionTypeRef::Keyword(k)) => write!(f, "{{projectionType: {k}}}"),
                Some(ProjectionTypeRef::Type(t)) => write!(f, "{{projectionType: {}}}", t.keyword),
                None => f.write_str("{projection params}"),
            },
            ProjectionSpec::Type(t) => write!(f, "type {}", t.keyword),
            ProjectionSpec::Keyword(k) => f.write_str(k),
            ProjectionSpec::Unrecognized(v) => write!(f, "{v}"),
        }
    }
}

// ============================================================================
// State parameters
// ============================================================================

/// Construction parameters for a State.
#[derive(Debug, Clone, Default)]
pub struct StateParams {
    /// Inbound Projection specifications.
    pub projections: Vec<ProjectionSpec>,
    /// Overrides the default projection type for this State.
    pub projection_type: Option<String>,
    /// Combination function; `LinearCombination::sum()` when absent.
    pub function: Option<Arc<dyn CombinationFunction>>,
    pub function_params: ParamMap,
    /// Any other parameters, kept on the State.
    pub extra: ParamMap,
}

impl StateParams {
    pub fn with_projection(mut self, spec: ProjectionSpec) -> Self {
        self.projections.push(spec);
        self
    }

    pub fn with_projection_type(mut self, keyword: impl Into<String>) -> Self {
        self.projection_type = Some(keyword.into());
        self
    }

    pub fn with_function(mut self, function: Arc<dyn CombinationFunction>) -> Self {
        self.function = Some(function);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Fold `other` into `self`. Scalar settings from `other` win;
    /// projection lists are concatenated.
    pub fn merge(&mut self, other: StateParams) {
        self.projections.extend(other.projections);
        if other.projection_type.is_some() {
            self.projection_type = other.projection_type;
        }
        if other.function.is_some() {
            self.function = other.function;
        }
        self.function_params.extend(other.function_params);
        self.extra.extend(other.extra);
    }

    /// Replace the inbound Projection list with a single spec.
    pub(crate) fn set_sole_projection(&mut self, spec: ProjectionSpec) {
        self.projections = vec![spec];
    }
}

// ============================================================================
// State specifications
// ============================================================================

/// Specification mapping for a State: `{value, params}`.
#[derive(Debug, Clone, Default)]
pub struct StateSpecMap {
    /// Declared value; the constraint value is used when absent.
    pub value: Option<Value>,
    pub params: Option<StateParams>,
}

/// One State specification, in resolution order.
#[derive(Debug, Clone)]
pub enum StateSpec {
    /// A State kind: build a default from the constraint value.
    Kind(StateKind),
    /// An already-built State in the session.
    Existing(StateId),
    /// `{value, params}`.
    Map(StateSpecMap),
    /// Named value/projection pair. Parameter States only.
    ValueProjection { value: Value, projection: ProjectionSpec },
    /// Bare `(value, projection)` pair. Parameter States only.
    Tuple(Value, ProjectionSpec),
    /// A Projection alone: the constraint value becomes the State's value.
    Projection(ProjectionSpec),
    /// A raw value.
    Value(Value),
}

impl StateSpec {
    pub fn value(value: impl Into<Value>) -> Self {
        StateSpec::Value(value.into())
    }

    /// Short label used in diagnostics.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            StateSpec::Kind(_) => "state kind",
            StateSpec::Existing(_) => "state",
            StateSpec::Map(_) => "value",
            StateSpec::ValueProjection { .. } => "value/projection pair",
            StateSpec::Tuple(..) => "tuple",
            StateSpec::Projection(_) => "projection",
            StateSpec::Value(_) => "value",
        }
    }
}

impl From<Value> for StateSpec {
    fn from(v: Value) -> Self {
        StateSpec::Value(v)
    }
}

impl From<StateId> for StateSpec {
    fn from(id: StateId) -> Self {
        StateSpec::Existing(id)
    }
}

impl From<StateKind> for StateSpec {
    fn from(kind: StateKind) -> Self {
        StateSpec::Kind(kind)
    }
}

impl From<ProjectionSpec> for StateSpec {
    fn from(spec: ProjectionSpec) -> Self {
        StateSpec::Projection(spec)
    }
}

// ============================================================================
// State lists
// ============================================================================

/// One item of a State list.
#[derive(Debug, Clone)]
pub enum StateEntry {
    /// A name; the State is built from its constraint slice.
    Name(String),
    /// A specification; the State gets a generated default name.
    Spec(StateSpec),
    /// A specification plus extra construction parameters.
    WithParams(Box<StateEntry>, StateParams),
}

impl StateEntry {
    pub fn with_params(self, params: StateParams) -> Self {
        StateEntry::WithParams(Box::new(self), params)
    }
}

impl From<StateSpec> for StateEntry {
    fn from(spec: StateSpec) -> Self {
        StateEntry::Spec(spec)
    }
}

impl From<&str> for StateEntry {
    fn from(name: &str) -> Self {
        StateEntry::Name(name.to_string())
    }
}

impl From<Value> for StateEntry {
    fn from(v: Value) -> Self {
        StateEntry::Spec(StateSpec::Value(v))
    }
}

/// Specification for all States of one kind.
#[derive(Debug, Clone, Default)]
pub enum StateListSpec {
    /// Nothing specified: one default State per constraint item.
    #[default]
    Empty,
    List(Vec<StateEntry>),
    /// Name → specification, in insertion order.
    Map(IndexMap<String, StateSpec>),
    /// A single specification for the sole State.
    Single(StateSpec),
}

impl StateListSpec {
    pub fn is_empty(&self) -> bool {
        match self {
            StateListSpec::Empty => true,
            StateListSpec::List(entries) => entries.is_empty(),
            StateListSpec::Map(entries) => entries.is_empty(),
            StateListSpec::Single(_) => false,
        }
    }
}

impl From<Vec<StateEntry>> for StateListSpec {
    fn from(entries: Vec<StateEntry>) -> Self {
        StateListSpec::List(entries)
    }
}

impl From<IndexMap<String, StateSpec>> for StateListSpec {
    fn from(entries: IndexMap<String, StateSpec>) -> Self {
        StateListSpec::Map(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::LinearCombination;

    #[test]
    fn test_params_merge() {
        let mut base = StateParams::default()
            .with_projection(ProjectionSpec::keyword("Mapping"))
            .with_param("a", 1);
        let other = StateParams::default()
            .with_projection(ProjectionSpec::keyword("ControlSignal"))
            .with_projection_type("ControlSignal")
            .with_function(Arc::new(LinearCombination::product()))
            .with_param("a", 2);
        base.merge(other);
        assert_eq!(base.projections.len(), 2);
        assert_eq!(base.projection_type.as_deref(), Some("ControlSignal"));
        assert_eq!(base.function.as_ref().map(|f| f.name()), Some("LinearCombination"));
        assert_eq!(base.extra.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_list_emptiness() {
        assert!(StateListSpec::Empty.is_empty());
        assert!(StateListSpec::List(vec![]).is_empty());
        assert!(!StateListSpec::Single(StateSpec::value(1)).is_empty());
    }
}
