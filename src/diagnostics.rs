//! Diagnostics for soft default substitutions.
//!
//! A substitution is never an error. When the owner is verbose it is
//! recorded here (and emitted through `tracing`) so callers can see what
//! was requested and what was used instead.

use serde::{Deserialize, Serialize};

use crate::model::MechanismId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A requested State value was incompatible; the constraint value was used.
    DefaultValueSubstituted,
    /// A State specification mapping had no value entry.
    MissingStateValue,
    /// No State list was specified; one was built from the constraint values.
    DefaultStateList,
    /// A projection specification did not name a usable type.
    DefaultProjectionType,
    /// A foreign projection was taken over by a State.
    ProjectionReassigned,
    /// A parameter value was incompatible with its declared default.
    DefaultParameterValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub owner: MechanismId,
    pub kind: DiagnosticKind,
    /// Name of the State, projection or parameter concerned.
    pub subject: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}: {}", self.kind, self.subject, self.message)
    }
}
