//! Projection — directed edge carrying a value from a sender into a receiver State.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::params::{CONTROL_SIGNAL_PARAMS, MAPPING_PARAMS};
use super::{ParamMap, StateId, Value};
use crate::function::ProjectionFunction;
use crate::log::Context;
use crate::Result;

/// Opaque projection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectionId(pub u64);

impl std::fmt::Display for ProjectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Projection family. Each family owns one override bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectionFamily {
    Mapping,
    ControlSignal,
}

impl ProjectionFamily {
    pub const ALL: [ProjectionFamily; 2] = [ProjectionFamily::Mapping, ProjectionFamily::ControlSignal];

    /// Override-set key holding this family's parameters.
    pub fn params_key(&self) -> &'static str {
        match self {
            ProjectionFamily::Mapping => MAPPING_PARAMS,
            ProjectionFamily::ControlSignal => CONTROL_SIGNAL_PARAMS,
        }
    }
}

/// A registered Projection type: what a keyword or class reference resolves to.
#[derive(Debug, Clone)]
pub struct ProjectionType {
    pub keyword: String,
    pub family: ProjectionFamily,
    pub default_params: ParamMap,
    pub function: Arc<dyn ProjectionFunction>,
}

impl ProjectionType {
    pub fn new(
        keyword: impl Into<String>,
        family: ProjectionFamily,
        function: Arc<dyn ProjectionFunction>,
    ) -> Self {
        Self { keyword: keyword.into(), family, default_params: ParamMap::new(), function }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_params.insert(key.into(), value.into());
        self
    }
}

/// A Projection instance living in a session arena.
#[derive(Debug, Clone)]
pub struct Projection {
    pub id: ProjectionId,
    pub name: String,
    pub type_keyword: String,
    pub family: ProjectionFamily,
    pub sender: Option<StateId>,
    pub receiver: StateId,
    /// Output of the last execution.
    pub value: Value,
    /// Instance parameters (type defaults merged with the spec's parameters).
    pub params: ParamMap,
    pub(crate) function: Arc<dyn ProjectionFunction>,
}

impl Projection {
    /// Run the projection function on `input`, with `overrides` layered over
    /// the instance parameters.
    pub fn execute(&self, input: &Value, overrides: &ParamMap, context: &Context) -> Result<Value> {
        if overrides.is_empty() {
            return self.function.execute(input, &self.params, context);
        }
        let mut params = self.params.clone();
        params.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.function.execute(input, &params, context)
    }
}
