//! Single-State resolver: one specification against one constraint value.

use tracing::{debug, trace};

use super::state_conflict;
use crate::diagnostics::DiagnosticKind;
use crate::log::Context;
use crate::model::{compatible, to_fixed_shape_numeric, MechanismId, StateId, StateKind, Value};
use crate::ownership::OwnershipDecision;
use crate::session::Session;
use crate::spec::{StateParams, StateSpec};
use crate::{Error, Result};

impl Session {
    /// Resolve one specification into a State of `kind` owned by `owner`.
    ///
    /// Every branch yields a value that is checked against `constraint`; an
    /// incompatible value is replaced by the constraint value (a diagnostic,
    /// not an error). An existing State is returned as-is when its owner is
    /// `owner`, or after the owner's arbiter accepts it.
    ///
    /// `constraint_name` describes the constraint in diagnostics, e.g.
    /// `"variable"`.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_state(
        &mut self,
        owner: MechanismId,
        kind: StateKind,
        name: &str,
        spec: StateSpec,
        params: Option<StateParams>,
        constraint: &Value,
        constraint_name: &str,
        context: &Context,
    ) -> Result<StateId> {
        self.mechanism(owner)?;
        let mut params = params.unwrap_or_default();
        let label = spec.label();
        // Set when a branch already rejected the requested value.
        let mut rejected: Option<String> = None;

        let value = match spec {
            StateSpec::Kind(requested) if requested == kind => constraint.clone(),
            StateSpec::Kind(requested) => {
                rejected = Some(requested.name().to_string());
                constraint.clone()
            }
            StateSpec::Existing(id) => {
                let existing = self.state(id)?;
                // A State holds its value coerced to the kind's rank.
                let coerced = to_fixed_shape_numeric(constraint, kind.value_rank()).map(|array| array.to_value());
                let usable = existing.kind == kind
                    && (compatible(&existing.value, constraint)
                        || coerced.is_ok_and(|coerced| compatible(&existing.value, &coerced)));
                let description = format!("{} ({})", existing.name, existing.value);
                if !usable {
                    rejected = Some(description);
                } else if let Some(accepted) = self.claim_state(owner, id, name)? {
                    return Ok(accepted);
                }
                constraint.clone()
            }
            StateSpec::Map(map) => {
                if let Some(extra) = map.params {
                    params.merge(extra);
                }
                match map.value {
                    Some(value) => value,
                    None => {
                        self.diagnose(
                            owner,
                            DiagnosticKind::MissingStateValue,
                            name,
                            format!("value missing from specification for {name}; default ({constraint}) will be used"),
                        );
                        constraint.clone()
                    }
                }
            }
            StateSpec::ValueProjection { value, projection } | StateSpec::Tuple(value, projection) => {
                if kind != StateKind::Parameter {
                    return Err(Error::ConfigurationError(format!(
                        "{label} ({value}, {projection}) is not permitted as a specification for {kind} {name}"
                    )));
                }
                params.set_sole_projection(projection);
                value
            }
            StateSpec::Projection(projection) => {
                params.set_sole_projection(projection);
                constraint.clone()
            }
            StateSpec::Value(value) => value,
        };

        let value = match rejected {
            Some(requested) => {
                self.report_substitution(owner, name, label, &requested, constraint, constraint_name);
                constraint.clone()
            }
            None if compatible(&value, constraint) => value,
            None => {
                self.report_substitution(owner, name, label, &value.to_string(), constraint, constraint_name);
                constraint.clone()
            }
        };

        trace!(owner = %owner, name, kind = %kind, value = %value, "resolved state value");
        self.create_state(owner, kind, value, params, Some(name), context)
    }

    /// Settle ownership of an existing State requested by `owner`.
    ///
    /// Returns the State to use, or `None` when a default should be built.
    pub(crate) fn claim_state(
        &mut self,
        owner: MechanismId,
        state: StateId,
        slot: &str,
    ) -> Result<Option<StateId>> {
        if self.state(state)?.owner == owner {
            return Ok(Some(state));
        }
        let conflict = state_conflict(self, state, owner, slot)?;
        match self.arbitrate(&conflict)? {
            OwnershipDecision::Reassign => {
                self.reassign_state(state, owner)?;
                Ok(Some(state))
            }
            OwnershipDecision::Copy => Ok(Some(self.copy_state(state, owner)?)),
            OwnershipDecision::Default => {
                debug!(state = %state, owner = %owner, "ownership rejected; building default");
                Ok(None)
            }
            OwnershipDecision::Abort => Err(Error::ConfigurationError(conflict.to_string())),
        }
    }

    fn report_substitution(
        &mut self,
        owner: MechanismId,
        name: &str,
        label: &str,
        requested: &str,
        constraint: &Value,
        constraint_name: &str,
    ) {
        let owner_name = self.mechanism(owner).map(|m| m.name.clone()).unwrap_or_default();
        self.diagnose(
            owner,
            DiagnosticKind::DefaultValueSubstituted,
            name,
            format!(
                "{requested} of {name} ({label}) is not compatible with {constraint_name} ({constraint}) of {owner_name}; default {constraint} will be used"
            ),
        );
    }
}
