//! The session: explicit context every resolution and update runs in.
//!
//! A `Session` owns the component arena (Mechanisms, States, Projections
//! keyed by id), the Projection-type registry, the diagnostics record and
//! the logical clock. The name registry is shared through an `Arc` so
//! several sessions may use one namespace.
//!
//! The primitives here build and wire single objects; the resolvers in
//! [`crate::resolve`] decide *what* to build.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use hashbrown::HashMap;
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::function::{unwrap_scalar, LinearCombination};
use crate::log::{Context, LogEntry, LogicalClock};
use crate::model::mechanism::StateSlot;
use crate::model::{
    compatible, to_fixed_shape_numeric, ComponentRef, Mechanism, MechanismId, ParamMap, Projection,
    ProjectionId, ProjectionType, State, StateId, StateKind, Value,
};
use crate::ownership::OwnershipPolicy;
use crate::registry::{NameRegistry, ProjectionTypeRegistry};
use crate::spec::{StateListSpec, StateParams};
use crate::{Error, Result};

/// Registry category for Mechanisms.
const MECHANISM_CATEGORY: &str = "Mechanism";
/// Registry category for Projections.
const PROJECTION_CATEGORY: &str = "Projection";
/// Registry scope for names that are not owned by a Mechanism.
const SESSION_SCOPE: MechanismId = MechanismId(0);

// ============================================================================
// Session
// ============================================================================

/// An ownership move, with what is needed to undo it.
#[derive(Debug)]
enum Transfer {
    State { id: StateId, owner: MechanismId, name: String, slot: Option<StateSlot> },
    Projection { id: ProjectionId, receiver: StateId, name: String, index: usize },
}

/// Transfers made inside open resolution scopes. Empty when no scope is open.
#[derive(Debug, Default)]
struct TransferJournal {
    depth: usize,
    entries: Vec<Transfer>,
}

impl TransferJournal {
    fn record(&mut self, transfer: Transfer) {
        if self.depth > 0 {
            self.entries.push(transfer);
        }
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.entries.clear();
        }
    }
}

pub struct Session {
    config: SessionConfig,
    names: Arc<NameRegistry>,
    projection_types: ProjectionTypeRegistry,
    mechanisms: HashMap<MechanismId, Mechanism>,
    states: HashMap<StateId, State>,
    projections: HashMap<ProjectionId, Projection>,
    diagnostics: Vec<Diagnostic>,
    clock: LogicalClock,
    next_mechanism_id: AtomicU64,
    next_state_id: AtomicU64,
    next_projection_id: AtomicU64,
    journal: TransferJournal,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self::with_registry(config, Arc::new(NameRegistry::new()))
    }

    /// Session using an existing name registry.
    pub fn with_registry(config: SessionConfig, names: Arc<NameRegistry>) -> Self {
        Self {
            config,
            names,
            projection_types: ProjectionTypeRegistry::with_builtins(),
            mechanisms: HashMap::new(),
            states: HashMap::new(),
            projections: HashMap::new(),
            diagnostics: Vec::new(),
            clock: LogicalClock::default(),
            next_mechanism_id: AtomicU64::new(1),
            next_state_id: AtomicU64::new(1),
            next_projection_id: AtomicU64::new(1),
            journal: TransferJournal::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn names(&self) -> &Arc<NameRegistry> {
        &self.names
    }

    pub fn projection_types(&self) -> &ProjectionTypeRegistry {
        &self.projection_types
    }

    pub fn projection_types_mut(&mut self) -> &mut ProjectionTypeRegistry {
        &mut self.projection_types
    }

    // ========================================================================
    // Arena access
    // ========================================================================

    /// Add an owner with the session's default preferences and ownership policy.
    pub fn add_mechanism(&mut self, name: &str) -> MechanismId {
        let id = MechanismId(self.next_mechanism_id.fetch_add(1, Ordering::Relaxed));
        let name = self.names.register(MECHANISM_CATEGORY, SESSION_SCOPE, Some(name), id.0);
        let arbiter = Arc::new(OwnershipPolicy::new(self.config.ownership_policy));
        self.mechanisms
            .insert(id, Mechanism::new(id, name, self.config.preferences(), arbiter));
        id
    }

    pub fn mechanism(&self, id: MechanismId) -> Result<&Mechanism> {
        self.mechanisms
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("mechanism {id}")))
    }

    pub fn mechanism_mut(&mut self, id: MechanismId) -> Result<&mut Mechanism> {
        self.mechanisms
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("mechanism {id}")))
    }

    pub fn state(&self, id: StateId) -> Result<&State> {
        self.states
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("state {id}")))
    }

    pub fn state_mut(&mut self, id: StateId) -> Result<&mut State> {
        self.states
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("state {id}")))
    }

    pub fn projection(&self, id: ProjectionId) -> Result<&Projection> {
        self.projections
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("projection {id}")))
    }

    pub fn projection_mut(&mut self, id: ProjectionId) -> Result<&mut Projection> {
        self.projections
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("projection {id}")))
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// The owner's installed States of `kind`, in order.
    pub fn states_of(&self, owner: MechanismId, kind: StateKind) -> Result<Vec<&State>> {
        let Some(collection) = self.mechanism(owner)?.states(kind) else {
            return Ok(Vec::new());
        };
        collection.values().map(|id| self.state(*id)).collect()
    }

    pub(crate) fn next_state_watermark(&self) -> u64 {
        self.next_state_id.load(Ordering::Relaxed)
    }

    pub(crate) fn state_ids_from(&self, watermark: u64) -> Vec<StateId> {
        let mut ids: Vec<StateId> = self.states.keys().copied().filter(|id| id.0 >= watermark).collect();
        ids.sort();
        ids
    }

    // ========================================================================
    // State construction
    // ========================================================================

    /// Construct and register a State.
    ///
    /// The owner must be a Mechanism. The value is coerced to a numeric
    /// array of the kind's rank and frozen as the State's `variable` and
    /// `base_value`. Unless `param_validation` is off, the combination
    /// function is run once over the value and its output must be
    /// compatible with the variable. Inbound Projection specs in `params`
    /// are resolved last. Any failure removes the half-built State.
    pub fn create_state(
        &mut self,
        owner: impl Into<ComponentRef>,
        kind: StateKind,
        value: Value,
        params: StateParams,
        name: Option<&str>,
        context: &Context,
    ) -> Result<StateId> {
        let owner = match owner.into() {
            ComponentRef::Mechanism(id) => id,
            other => {
                return Err(Error::ConfigurationError(format!(
                    "owner of a {kind} must be a mechanism, got {other}"
                )))
            }
        };
        let owner_default = self.mechanism(owner)?.default_projection_type.clone();
        let default_projection_type = params
            .projection_type
            .clone()
            .or(owner_default)
            .unwrap_or_else(|| kind.default_projection_type().to_string());

        let value = to_fixed_shape_numeric(&value, kind.value_rank())?.to_value();

        let id = StateId(self.next_state_id.fetch_add(1, Ordering::Relaxed));
        let name = self.names.register(kind.name(), owner, name, id.0);
        let StateParams { projections, function, function_params, extra, .. } = params;
        let function = function.unwrap_or_else(|| Arc::new(LinearCombination::sum()));
        let state = State::new(
            id,
            name,
            kind,
            owner,
            value,
            function,
            function_params,
            default_projection_type,
            extra,
        );
        debug!(state = %id, owner = %owner, name = %state.name, kind = %kind, "creating state");
        self.states.insert(id, state);

        if self.config.param_validation {
            if let Err(e) = self.check_function_output(id, context) {
                self.discard_state(id)?;
                return Err(e);
            }
        }

        if !projections.is_empty() {
            let mark = self.begin_transfers();
            if let Err(e) = self.instantiate_projections(id, projections, context) {
                self.rollback_transfers(mark)?;
                self.discard_state(id)?;
                return Err(e);
            }
            self.commit_transfers();
        }

        let value = self.state(id)?.value.clone();
        self.publish(id, value, context)?;
        Ok(id)
    }

    /// Run the State's combination function over its own value and check
    /// the output against the variable.
    fn check_function_output(&self, id: StateId, context: &Context) -> Result<()> {
        let state = self.state(id)?;
        let output = state
            .function
            .execute(std::slice::from_ref(&state.value), &state.function_params, context)
            .map_err(|e| {
                Error::ConfigurationError(format!(
                    "function {} of {} failed on its value: {e}",
                    state.function.name(),
                    state.name
                ))
            })?;
        let output = unwrap_scalar(state.is_scalar(), output);
        if !compatible(&output, state.variable()) {
            return Err(Error::ConfigurationError(format!(
                "output ({output}) of function {} is not compatible with the variable ({}) of {}",
                state.function.name(),
                state.variable(),
                state.name
            )));
        }
        Ok(())
    }

    /// Remove a State together with the Projections it receives from.
    pub(crate) fn discard_state(&mut self, id: StateId) -> Result<()> {
        let Some(state) = self.states.remove(&id) else {
            return Ok(());
        };
        for projection in &state.receives_from {
            self.discard_projection(*projection)?;
        }
        for projection in &state.sends_to {
            if let Some(p) = self.projections.get_mut(projection) {
                p.sender = None;
            }
        }
        self.names.unregister(state.kind.name(), state.owner, &state.name);
        if let Some(owner) = self.mechanisms.get_mut(&state.owner) {
            owner.remove_attribute(&state.value_attribute());
            owner.forget_state(id);
        }
        trace!(state = %id, name = %state.name, "discarded state");
        Ok(())
    }

    // ========================================================================
    // Projection construction
    // ========================================================================

    /// Instantiate a Projection of `projection_type` into `receiver`.
    ///
    /// The Projection is named `<receiver>_<keyword>` (suffixed on
    /// collision), its parameters are the type defaults overlaid with
    /// `params`, and its value is computed once from the sender's value,
    /// or from the receiver's variable when there is no sender. The new
    /// Projection registers itself with its receiver and sender.
    pub fn instantiate_projection(
        &mut self,
        receiver: StateId,
        projection_type: &ProjectionType,
        params: ParamMap,
        sender: Option<StateId>,
        context: &Context,
    ) -> Result<ProjectionId> {
        let (receiver_name, owner, variable) = {
            let state = self.state(receiver)?;
            (state.name.clone(), state.owner, state.variable().clone())
        };
        let input = match sender {
            Some(sender) => self.state(sender)?.value.clone(),
            None => variable,
        };

        let mut merged = projection_type.default_params.clone();
        merged.extend(params);
        let value = projection_type.function.execute(&input, &merged, context)?;

        let id = ProjectionId(self.next_projection_id.fetch_add(1, Ordering::Relaxed));
        let requested = format!("{receiver_name}_{}", projection_type.keyword);
        let name = self.names.register(PROJECTION_CATEGORY, owner, Some(&requested), id.0);
        debug!(projection = %id, name = %name, receiver = %receiver, "instantiated projection");

        self.projections.insert(
            id,
            Projection {
                id,
                name,
                type_keyword: projection_type.keyword.clone(),
                family: projection_type.family,
                sender,
                receiver,
                value,
                params: merged,
                function: Arc::clone(&projection_type.function),
            },
        );
        self.state_mut(receiver)?.receives_from.push(id);
        if let Some(sender) = sender {
            self.state_mut(sender)?.sends_to.push(id);
        }
        Ok(id)
    }

    /// Copy a Projection into a new receiver. The copy keeps the sender.
    pub(crate) fn copy_projection(&mut self, source: ProjectionId, receiver: StateId) -> Result<ProjectionId> {
        let mut copy = self.projection(source)?.clone();
        let (receiver_name, owner) = {
            let state = self.state(receiver)?;
            (state.name.clone(), state.owner)
        };
        let id = ProjectionId(self.next_projection_id.fetch_add(1, Ordering::Relaxed));
        let requested = format!("{receiver_name}_{}", copy.type_keyword);
        copy.id = id;
        copy.receiver = receiver;
        copy.name = self.names.register(PROJECTION_CATEGORY, owner, Some(&requested), id.0);
        if let Some(sender) = copy.sender {
            self.state_mut(sender)?.sends_to.push(id);
        }
        debug!(projection = %id, source = %source, receiver = %receiver, "copied projection");
        self.projections.insert(id, copy);
        Ok(id)
    }

    /// Point an existing Projection at a new receiver.
    pub(crate) fn reassign_projection(&mut self, id: ProjectionId, receiver: StateId) -> Result<()> {
        let (previous, name) = {
            let p = self.projection(id)?;
            (p.receiver, p.name.clone())
        };
        let index = self.move_projection(id, receiver, &name)?;
        if let Some(index) = index {
            self.journal.record(Transfer::Projection { id, receiver: previous, name, index });
        }
        debug!(projection = %id, from = %previous, to = %receiver, "reassigned projection");
        Ok(())
    }

    /// Detach a Projection from its receiver and attach it to `receiver`
    /// under `requested`. Returns its index in the old receiver's list.
    /// The new receiver's list is left to the caller.
    fn move_projection(&mut self, id: ProjectionId, receiver: StateId, requested: &str) -> Result<Option<usize>> {
        let new_owner = self.state(receiver)?.owner;
        let (previous, name) = {
            let p = self.projection(id)?;
            (p.receiver, p.name.clone())
        };
        let mut index = None;
        let mut previous_owner = None;
        if let Some(state) = self.states.get_mut(&previous) {
            index = state.receives_from.iter().position(|p| *p == id);
            state.receives_from.retain(|p| *p != id);
            previous_owner = Some(state.owner);
        }
        if previous_owner != Some(new_owner) || name != requested {
            if let Some(previous_owner) = previous_owner {
                self.names.unregister(PROJECTION_CATEGORY, previous_owner, &name);
            }
            let name = self.names.register(PROJECTION_CATEGORY, new_owner, Some(requested), id.0);
            self.projection_mut(id)?.name = name;
        }
        self.projection_mut(id)?.receiver = receiver;
        Ok(index)
    }

    /// Remove a Projection from the arena and from both endpoints.
    pub(crate) fn discard_projection(&mut self, id: ProjectionId) -> Result<()> {
        let Some(projection) = self.projections.remove(&id) else {
            return Ok(());
        };
        let mut owner = None;
        if let Some(receiver) = self.states.get_mut(&projection.receiver) {
            receiver.receives_from.retain(|p| *p != id);
            owner = Some(receiver.owner);
        }
        if let Some(sender) = projection.sender.and_then(|s| self.states.get_mut(&s)) {
            sender.sends_to.retain(|p| *p != id);
        }
        if let Some(owner) = owner {
            self.names.unregister(PROJECTION_CATEGORY, owner, &projection.name);
        }
        trace!(projection = %id, name = %projection.name, "discarded projection");
        Ok(())
    }

    // ========================================================================
    // Ownership transfer
    // ========================================================================

    /// Move a State to `owner`, re-registering its name in the new scope.
    pub(crate) fn reassign_state(&mut self, id: StateId, owner: MechanismId) -> Result<()> {
        let (previous, name) = {
            let s = self.state(id)?;
            (s.owner, s.name.clone())
        };
        let slot = self.move_state(id, owner, &name)?;
        self.journal.record(Transfer::State { id, owner: previous, name, slot });
        debug!(state = %id, from = %previous, to = %owner, "reassigned state");
        Ok(())
    }

    /// Hand a State and the names of its inbound Projections over to `owner`.
    /// Returns where the State sat in the previous owner's collections.
    fn move_state(&mut self, id: StateId, owner: MechanismId, requested: &str) -> Result<Option<StateSlot>> {
        self.mechanism(owner)?;
        let (kind, previous, name, attribute, inbound) = {
            let s = self.state(id)?;
            (s.kind, s.owner, s.name.clone(), s.value_attribute(), s.receives_from.clone())
        };
        let slot = match self.mechanisms.get_mut(&previous) {
            Some(m) => {
                m.remove_attribute(&attribute);
                m.forget_state(id)
            }
            None => None,
        };
        self.names.unregister(kind.name(), previous, &name);
        let name = self.names.register(kind.name(), owner, Some(requested), id.0);

        if previous != owner {
            for projection in inbound {
                if let Some(p) = self.projections.get_mut(&projection) {
                    self.names.unregister(PROJECTION_CATEGORY, previous, &p.name);
                    p.name = self.names.register(PROJECTION_CATEGORY, owner, Some(&p.name), projection.0);
                }
            }
        }

        let state = self.state_mut(id)?;
        state.owner = owner;
        state.name = name;
        let (attribute, value) = (state.value_attribute(), state.value.clone());
        self.mechanism_mut(owner)?.set_attribute(attribute, value);
        Ok(slot)
    }

    /// Open a scope whose ownership transfers are undone by
    /// [`Session::rollback_transfers`]. Returns the scope's mark.
    pub(crate) fn begin_transfers(&mut self) -> usize {
        self.journal.depth += 1;
        self.journal.entries.len()
    }

    /// Close a scope and keep its transfers.
    pub(crate) fn commit_transfers(&mut self) {
        self.journal.close();
    }

    /// Close a scope and undo its transfers, newest first.
    pub(crate) fn rollback_transfers(&mut self, mark: usize) -> Result<()> {
        let undo = self.journal.entries.split_off(mark.min(self.journal.entries.len()));
        self.journal.close();
        for transfer in undo.into_iter().rev() {
            match transfer {
                Transfer::State { id, owner, name, slot } => {
                    if !self.states.contains_key(&id) {
                        continue;
                    }
                    self.move_state(id, owner, &name)?;
                    if let (Some(slot), Some(m)) = (slot, self.mechanisms.get_mut(&owner)) {
                        m.restore_state(slot, id);
                    }
                    trace!(state = %id, owner = %owner, "returned state");
                }
                Transfer::Projection { id, receiver, name, index } => {
                    if !self.projections.contains_key(&id) || !self.states.contains_key(&receiver) {
                        continue;
                    }
                    self.move_projection(id, receiver, &name)?;
                    let state = self.state_mut(receiver)?;
                    let index = index.min(state.receives_from.len());
                    state.receives_from.insert(index, id);
                    trace!(projection = %id, receiver = %receiver, "returned projection");
                }
            }
        }
        Ok(())
    }

    /// Deep-copy a State into `owner`. The copy has no Projections.
    pub(crate) fn copy_state(&mut self, source: StateId, owner: MechanismId) -> Result<StateId> {
        self.mechanism(owner)?;
        let mut copy = self.state(source)?.clone();
        let id = StateId(self.next_state_id.fetch_add(1, Ordering::Relaxed));
        copy.id = id;
        copy.owner = owner;
        copy.name = self.names.register(copy.kind.name(), owner, Some(&copy.name), id.0);
        copy.receives_from.clear();
        copy.sends_to.clear();
        let (attribute, value) = (copy.value_attribute(), copy.value.clone());
        self.states.insert(id, copy);
        self.mechanism_mut(owner)?.set_attribute(attribute, value);
        debug!(state = %id, source = %source, owner = %owner, "copied state");
        Ok(id)
    }

    // ========================================================================
    // Value publication
    // ========================================================================

    /// Set a State's value, refresh the owner's `<name>.value` attribute and
    /// append to the owner's log when its log level asks for it.
    pub fn publish(&mut self, id: StateId, value: Value, context: &Context) -> Result<()> {
        let state = self
            .states
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("state {id}")))?;
        let changed = state.value != value;
        state.value = value.clone();
        let (owner, name, attribute) = (state.owner, state.name.clone(), state.value_attribute());

        let mechanism = self
            .mechanisms
            .get_mut(&owner)
            .ok_or_else(|| Error::NotFound(format!("mechanism {owner}")))?;
        mechanism.set_attribute(attribute, value.clone());

        if mechanism.prefs.log_level.should_record(context, changed) {
            let time = self.clock.tick();
            mechanism.log().lock().append(LogEntry {
                name: name.clone(),
                time,
                recorded_at: Utc::now(),
                context: context.to_string(),
                value,
            });
            trace!(state = %id, name = %name, time = time.0, "logged value");
        }
        Ok(())
    }

    // ========================================================================
    // Owner collections
    // ========================================================================

    /// Resolve a State list for `owner` and install it under `kind`.
    ///
    /// An owner's collection of one kind is built once; a second call is a
    /// configuration error.
    pub fn instantiate_states(
        &mut self,
        owner: MechanismId,
        kind: StateKind,
        spec: StateListSpec,
        constraint: &Value,
        constraint_name: &str,
        context: &Context,
    ) -> Result<IndexMap<String, StateId>> {
        let mechanism = self.mechanism(owner)?;
        if mechanism.states(kind).is_some() {
            return Err(Error::ConfigurationError(format!(
                "{kind}s of {} are already instantiated",
                mechanism.name
            )));
        }
        let states = self.resolve_state_list(owner, spec, kind, constraint, constraint_name, context)?;
        self.mechanism_mut(owner)?.install_states(kind, states.clone());
        Ok(states)
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Record a soft default substitution. Only verbose owners keep a record.
    pub(crate) fn diagnose(
        &mut self,
        owner: MechanismId,
        kind: DiagnosticKind,
        subject: &str,
        message: String,
    ) {
        let verbose = self.mechanisms.get(&owner).is_some_and(|m| m.prefs.verbose);
        if !verbose {
            debug!(owner = %owner, subject, ?kind, "{message}");
            return;
        }
        warn!(owner = %owner, subject, ?kind, "{message}");
        self.diagnostics.push(Diagnostic { owner, kind, subject: subject.to_string(), message });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{CombinationFunction, MappingFunction};
    use crate::log::LogLevel;
    use crate::model::ProjectionFamily;

    fn ctx() -> Context {
        Context::construction("test")
    }

    #[test]
    fn test_create_state_coerces_and_records_attribute() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        let id = s
            .create_state(m, StateKind::Input, Value::Int(3), StateParams::default(), Some("in"), &ctx())
            .unwrap();
        let state = s.state(id).unwrap();
        assert_eq!(state.value, Value::from(vec![3.0]));
        assert_eq!(state.base_value(), &Value::from(vec![3.0]));
        assert_eq!(state.default_projection_type, "Mapping");
        assert_eq!(s.mechanism(m).unwrap().attribute("in.value"), Some(&Value::from(vec![3.0])));
    }

    #[test]
    fn test_non_mechanism_owner_is_configuration_error() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        let id = s
            .create_state(m, StateKind::Output, Value::Int(0), StateParams::default(), None, &ctx())
            .unwrap();
        let err = s
            .create_state(id, StateKind::Input, Value::Int(0), StateParams::default(), None, &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn test_non_numeric_value_is_coercion_error() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        let err = s
            .create_state(m, StateKind::Input, Value::from("x"), StateParams::default(), Some("in"), &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::CoercionError { .. }));
        assert_eq!(s.state_count(), 0);
    }

    #[derive(Debug)]
    struct Widening;

    impl CombinationFunction for Widening {
        fn name(&self) -> &str {
            "Widening"
        }

        fn execute(&self, _variable: &[Value], _params: &ParamMap, _context: &Context) -> Result<Value> {
            Ok(Value::from(vec![0.0, 0.0, 0.0]))
        }
    }

    #[test]
    fn test_function_output_check() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        let params = StateParams::default().with_function(Arc::new(Widening));
        let err = s
            .create_state(m, StateKind::Input, Value::from(vec![0, 0]), params.clone(), Some("in"), &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
        assert_eq!(s.state_count(), 0);
        // The name was released with the discarded State.
        assert!(s.names().lookup("InputState", m, "in").is_none());

        let mut lax = Session::with_config(SessionConfig { param_validation: false, ..SessionConfig::default() });
        let m = lax.add_mechanism("m");
        assert!(lax
            .create_state(m, StateKind::Input, Value::from(vec![0, 0]), params, Some("in"), &ctx())
            .is_ok());
    }

    #[test]
    fn test_owner_default_projection_type() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        s.mechanism_mut(m).unwrap().default_projection_type = Some("ControlSignal".into());
        let a = s
            .create_state(m, StateKind::Input, Value::Int(0), StateParams::default(), None, &ctx())
            .unwrap();
        let b = s
            .create_state(
                m,
                StateKind::Input,
                Value::Int(0),
                StateParams::default().with_projection_type("Mapping"),
                None,
                &ctx(),
            )
            .unwrap();
        assert_eq!(s.state(a).unwrap().default_projection_type, "ControlSignal");
        assert_eq!(s.state(b).unwrap().default_projection_type, "Mapping");
    }

    #[test]
    fn test_projection_naming_and_sender_bookkeeping() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        let out = s
            .create_state(m, StateKind::Output, Value::from(vec![1, 2]), StateParams::default(), Some("out"), &ctx())
            .unwrap();
        let input = s
            .create_state(m, StateKind::Input, Value::from(vec![0, 0]), StateParams::default(), Some("in"), &ctx())
            .unwrap();
        let mapping = ProjectionType::new("Mapping", ProjectionFamily::Mapping, Arc::new(MappingFunction))
            .with_param("weight", 2.0);

        let p1 = s.instantiate_projection(input, &mapping, ParamMap::new(), Some(out), &ctx()).unwrap();
        let p2 = s.instantiate_projection(input, &mapping, ParamMap::new(), None, &ctx()).unwrap();

        assert_eq!(s.projection(p1).unwrap().name, "in_Mapping");
        assert_eq!(s.projection(p2).unwrap().name, "in_Mapping-1");
        assert_eq!(s.projection(p1).unwrap().value, Value::from(vec![2.0, 4.0]));
        assert_eq!(s.state(out).unwrap().sends_to, vec![p1]);
        assert_eq!(s.state(input).unwrap().receives_from, vec![p1, p2]);

        s.discard_projection(p1).unwrap();
        assert!(s.state(out).unwrap().sends_to.is_empty());
        assert_eq!(s.state(input).unwrap().receives_from, vec![p2]);
    }

    #[test]
    fn test_publish_logs_per_level() {
        let mut s = Session::new();
        let m = s.add_mechanism("m");
        s.mechanism_mut(m).unwrap().prefs.log_level = LogLevel::ValueAssignment;
        let id = s
            .create_state(m, StateKind::Parameter, Value::Int(1), StateParams::default(), Some("gain"), &ctx())
            .unwrap();
        let run = Context::execution("trial");
        s.publish(id, Value::Float(1.0), &run).unwrap();
        s.publish(id, Value::Float(2.0), &run).unwrap();

        let owner = s.mechanism(m).unwrap();
        let log = owner.log().lock();
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest("gain").map(|e| &e.value), Some(&Value::Float(2.0)));
        assert_eq!(owner.attribute("gain.value"), Some(&Value::Float(2.0)));
    }

    #[test]
    fn test_diagnostics_only_for_verbose_owner() {
        let mut s = Session::new();
        let quiet = s.add_mechanism("quiet");
        let loud = s.add_mechanism("loud");
        s.mechanism_mut(loud).unwrap().prefs.verbose = true;
        s.diagnose(quiet, DiagnosticKind::DefaultStateList, "x", "ignored".into());
        s.diagnose(loud, DiagnosticKind::DefaultStateList, "x", "kept".into());
        assert_eq!(s.diagnostics().len(), 1);
        assert_eq!(s.take_diagnostics()[0].message, "kept");
        assert!(s.diagnostics().is_empty());
    }
}
