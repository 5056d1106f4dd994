//! Aggregation pipeline: one evaluation step of a State.
//!
//! ```text
//! overrides ──► projectionParams ──┬─► mappingParams ──────┐
//!                                  └─► controlSignalParams ┤
//!                                                          ▼
//!   for P in receives_from:  overrides[P.name] over family bucket ─► P.execute ─► values[i]
//!                                                          │
//!   values ─► combination function (functionParams) ─► unwrap scalar ─► publish
//! ```
//!
//! Projection order is the State's `receives_from` order and is kept
//! exactly; each Projection only ever sees its own named override entry.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::function::unwrap_scalar;
use crate::log::Context;
use crate::model::params::{merge_param_maps, sub_map, FUNCTION_PARAMS, PROJECTION_PARAMS};
use crate::model::{compatible, MechanismId, ParamMap, ProjectionFamily, StateId, StateKind, Value};
use crate::session::Session;
use crate::{Error, Result};

/// Outcome of one update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Aggregate {
    /// The combination produced a value with at least one non-zero element.
    Computed(Value),
    /// The combination produced an all-zero value.
    Zero(Value),
    /// No inbound Projections; the State's value was left as it was.
    Unchanged,
}

impl Aggregate {
    /// The published value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Aggregate::Computed(v) | Aggregate::Zero(v) => Some(v),
            Aggregate::Unchanged => None,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Aggregate::Unchanged)
    }
}

impl Session {
    /// Aggregate the values of `state`'s inbound Projections into its new value.
    ///
    /// Errors from a Projection or the combination function propagate and
    /// leave the State's value untouched.
    pub fn update_state(
        &mut self,
        state: StateId,
        overrides: Option<&ParamMap>,
        context: &Context,
    ) -> Result<Aggregate> {
        let empty = ParamMap::new();
        let overrides = overrides.unwrap_or(&empty);

        let (is_scalar, inbound, variable) = {
            let s = self.state(state)?;
            (s.is_scalar(), s.receives_from.clone(), s.variable().clone())
        };
        if inbound.is_empty() {
            trace!(state = %state, "no inbound projections; value unchanged");
            return Ok(Aggregate::Unchanged);
        }

        let general = sub_map(overrides, PROJECTION_PARAMS);
        let buckets: HashMap<ProjectionFamily, ParamMap> = ProjectionFamily::ALL
            .into_iter()
            .map(|family| (family, merge_param_maps(overrides, family.params_key(), &general)))
            .collect();

        let mut values = Vec::with_capacity(inbound.len());
        for id in inbound {
            let projection = self.projection(id)?;
            let bucket = buckets.get(&projection.family).unwrap_or(&general);
            let params = merge_param_maps(overrides, &projection.name, bucket);
            let input = match projection.sender {
                Some(sender) => self.state(sender)?.value.clone(),
                None => variable.clone(),
            };
            let value = projection.execute(&input, &params, context)?;
            trace!(state = %state, projection = %id, value = %value, "projection updated");
            self.projection_mut(id)?.value = value.clone();
            values.push(value);
        }

        let combined = {
            let s = self.state(state)?;
            let mut function_params = s.function_params.clone();
            function_params.extend(sub_map(overrides, FUNCTION_PARAMS));
            unwrap_scalar(is_scalar, s.function.execute(&values, &function_params, context)?)
        };
        if !compatible(&combined, &variable) {
            return Err(Error::FunctionError(format!(
                "aggregated value ({combined}) of state {state} is not compatible with its variable ({variable})"
            )));
        }

        debug!(state = %state, inputs = values.len(), value = %combined, "aggregated");
        self.publish(state, combined.clone(), context)?;
        Ok(if combined.is_all_zero() { Aggregate::Zero(combined) } else { Aggregate::Computed(combined) })
    }

    /// Update every installed State of `kind` on `owner`, in order.
    pub fn update_states(
        &mut self,
        owner: MechanismId,
        kind: StateKind,
        overrides: Option<&ParamMap>,
        context: &Context,
    ) -> Result<Vec<Aggregate>> {
        let ids: Vec<StateId> = match self.mechanism(owner)?.states(kind) {
            Some(collection) => collection.values().copied().collect(),
            None => return Ok(Vec::new()),
        };
        ids.into_iter().map(|id| self.update_state(id, overrides, context)).collect()
    }
}
