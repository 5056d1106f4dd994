//! Resolvers turn specifications into wired, owned objects.
//!
//! | Resolver | Entry point | Produces |
//! |----------|-------------|----------|
//! | Projection | `Session::instantiate_projections` | inbound Projections of one State |
//! | Single State | `Session::resolve_state` | one State |
//! | State list | `Session::resolve_state_list` | an ordered name → State map |
//!
//! All three share the same rule: an incompatible value falls back to the
//! constraint value and is reported as a diagnostic, while structural
//! problems are a `ConfigurationError` that propagates immediately.

mod projection;
mod state;
mod state_list;

use crate::diagnostics::DiagnosticKind;
use crate::model::{compatible, MechanismId, StateId, Value};
use crate::ownership::{ConflictSubject, OwnershipConflict, OwnershipDecision};
use crate::session::Session;
use crate::Result;

impl Session {
    /// Validate a parameter value against its declared default.
    ///
    /// Returns `value` when compatible, otherwise the default (with a
    /// diagnostic for verbose owners).
    pub fn check_parameter_value(
        &mut self,
        owner: MechanismId,
        param_name: &str,
        value: Value,
        default: &Value,
    ) -> Value {
        if compatible(&value, default) {
            return value;
        }
        let owner_name = self
            .mechanism(owner)
            .map(|m| m.name.clone())
            .unwrap_or_else(|_| owner.to_string());
        self.diagnose(
            owner,
            DiagnosticKind::DefaultParameterValue,
            param_name,
            format!("format is incorrect for value ({value}) of {param_name} in {owner_name}; default ({default}) will be used"),
        );
        default.clone()
    }

    /// Ask the requesting owner's arbiter how to settle a conflict.
    pub(crate) fn arbitrate(&self, conflict: &OwnershipConflict) -> Result<OwnershipDecision> {
        let decision = self.mechanism(conflict.requested_by)?.arbiter().decide(conflict);
        tracing::debug!(owner = %conflict.requested_by, slot = %conflict.slot, ?decision, "ownership conflict");
        Ok(decision)
    }
}

/// Conflict record for a State requested by an owner other than its own.
pub(crate) fn state_conflict(
    session: &Session,
    state: StateId,
    requested_by: MechanismId,
    slot: &str,
) -> Result<OwnershipConflict> {
    let s = session.state(state)?;
    Ok(OwnershipConflict {
        subject: ConflictSubject::State { state, name: s.name.clone(), current_owner: s.owner },
        requested_by,
        slot: slot.to_string(),
    })
}
