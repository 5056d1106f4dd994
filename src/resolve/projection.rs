//! Projection resolver: inbound Projection specs of one State.

use std::sync::Arc;

use tracing::debug;

use crate::diagnostics::DiagnosticKind;
use crate::log::Context;
use crate::model::{compatible, ParamMap, ProjectionId, ProjectionType, StateId};
use crate::ownership::{ConflictSubject, OwnershipConflict, OwnershipDecision};
use crate::session::Session;
use crate::spec::{ProjectionSpec, ProjectionTypeRef};
use crate::{Error, Result};

impl Session {
    /// Resolve `specs` into Projections received by `state`, in order.
    ///
    /// Each resolved Projection's value must be compatible with the State's
    /// variable; a mismatch is a terminal `ConfigurationError` and no
    /// further default is tried. Already-listed Projections are not listed
    /// twice.
    pub fn instantiate_projections(
        &mut self,
        state: StateId,
        specs: Vec<ProjectionSpec>,
        context: &Context,
    ) -> Result<Vec<ProjectionId>> {
        let state_name = self.state(state)?.name.clone();
        let count = specs.len();
        let mut resolved = Vec::with_capacity(count);
        for (index, spec) in specs.into_iter().enumerate() {
            let label = if count > 1 {
                format!("item {} of projection list for {state_name}", index + 1)
            } else {
                state_name.clone()
            };
            resolved.push(self.resolve_projection(state, spec, &label, context)?);
        }
        Ok(resolved)
    }

    fn resolve_projection(
        &mut self,
        state: StateId,
        spec: ProjectionSpec,
        label: &str,
        context: &Context,
    ) -> Result<ProjectionId> {
        let (id, created) = match spec {
            ProjectionSpec::Existing(existing) => self.accept_projection(state, existing, label, context)?,
            ProjectionSpec::Map(map) => {
                let projection_type = match map.projection_type {
                    Some(ProjectionTypeRef::Type(t)) => t,
                    Some(ProjectionTypeRef::Keyword(keyword)) => self.projection_type_or_default(state, &keyword, label)?,
                    None => {
                        self.report_default_type(state, label, "projection type not specified")?;
                        self.default_projection_type(state)?
                    }
                };
                let params = map.params.unwrap_or_default();
                (self.instantiate_projection(state, &projection_type, params, map.sender, context)?, true)
            }
            ProjectionSpec::Type(t) => (self.instantiate_projection(state, &t, ParamMap::new(), None, context)?, true),
            ProjectionSpec::Keyword(keyword) => {
                let t = self.projection_type_or_default(state, &keyword, label)?;
                (self.instantiate_projection(state, &t, ParamMap::new(), None, context)?, true)
            }
            ProjectionSpec::Unrecognized(value) => {
                self.report_default_type(
                    state,
                    label,
                    &format!("{value} is not a projection or a specification for one"),
                )?;
                let t = self.default_projection_type(state)?;
                (self.instantiate_projection(state, &t, ParamMap::new(), None, context)?, true)
            }
        };

        if let Err(e) = self.ensure_compatible(state, id, label) {
            if created {
                self.discard_projection(id)?;
            }
            return Err(e);
        }

        let receives_from = &mut self.state_mut(state)?.receives_from;
        if !receives_from.contains(&id) {
            receives_from.push(id);
        }
        Ok(id)
    }

    /// Accept an existing Projection, settling a receiver mismatch through
    /// the owner's arbiter. Returns the Projection to use and whether it was
    /// newly built.
    fn accept_projection(
        &mut self,
        state: StateId,
        existing: ProjectionId,
        label: &str,
        context: &Context,
    ) -> Result<(ProjectionId, bool)> {
        let (receiver, name) = {
            let p = self.projection(existing)?;
            (p.receiver, p.name.clone())
        };
        if receiver == state {
            return Ok((existing, false));
        }

        let owner = self.state(state)?.owner;
        let conflict = OwnershipConflict {
            subject: ConflictSubject::Projection {
                projection: existing,
                name: name.clone(),
                current_receiver: receiver,
            },
            requested_by: owner,
            slot: label.to_string(),
        };
        match self.arbitrate(&conflict)? {
            OwnershipDecision::Reassign => {
                self.ensure_compatible(state, existing, label)?;
                self.reassign_projection(existing, state)?;
                self.diagnose(
                    owner,
                    DiagnosticKind::ProjectionReassigned,
                    &name,
                    format!("{name} reassigned to {label}"),
                );
                Ok((existing, false))
            }
            OwnershipDecision::Copy => Ok((self.copy_projection(existing, state)?, true)),
            OwnershipDecision::Default => {
                self.report_default_type(state, label, &format!("{name} belongs to another state"))?;
                let t = self.default_projection_type(state)?;
                Ok((self.instantiate_projection(state, &t, ParamMap::new(), None, context)?, true))
            }
            OwnershipDecision::Abort => Err(Error::ConfigurationError(conflict.to_string())),
        }
    }

    fn ensure_compatible(&self, state: StateId, projection: ProjectionId, label: &str) -> Result<()> {
        let s = self.state(state)?;
        let p = self.projection(projection)?;
        if compatible(&p.value, s.variable()) {
            return Ok(());
        }
        Err(Error::ConfigurationError(format!(
            "{label}: output ({}) of {} is not compatible with the variable ({}) of {}",
            p.value,
            p.name,
            s.variable(),
            s.name
        )))
    }

    /// Registered type for `keyword`, or the State's default with a diagnostic.
    fn projection_type_or_default(
        &mut self,
        state: StateId,
        keyword: &str,
        label: &str,
    ) -> Result<Arc<ProjectionType>> {
        if let Some(t) = self.projection_types().get(keyword) {
            return Ok(t);
        }
        self.report_default_type(state, label, &format!("{keyword} not found in the projection type registry"))?;
        self.default_projection_type(state)
    }

    fn default_projection_type(&self, state: StateId) -> Result<Arc<ProjectionType>> {
        let keyword = &self.state(state)?.default_projection_type;
        self.projection_types().get(keyword).ok_or_else(|| {
            Error::ConfigurationError(format!("default projection type {keyword} is not registered"))
        })
    }

    fn report_default_type(&mut self, state: StateId, label: &str, reason: &str) -> Result<()> {
        let s = self.state(state)?;
        let (owner, keyword) = (s.owner, s.default_projection_type.clone());
        debug!(state = %state, default = %keyword, "{reason}");
        self.diagnose(
            owner,
            DiagnosticKind::DefaultProjectionType,
            label,
            format!("{reason}; default {keyword} will be assigned for {label}"),
        );
        Ok(())
    }
}
