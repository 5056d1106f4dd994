//! # Component Graph Model
//!
//! Data types that cross every boundary: resolver ↔ session ↔ aggregation ↔ user.
//!
//! Design rule: no resolution logic here. This module is data plus the
//! side-effect-free checks (compatibility, numeric coercion) every other
//! module leans on.

pub mod value;
pub mod numeric;
pub mod compat;
pub mod params;
pub mod state;
pub mod projection;
pub mod mechanism;

pub use value::{Value, TypeClass};
pub use numeric::{NumericArray, to_fixed_shape_numeric};
pub use compat::{compatible, compatible_with, CompatOptions};
pub use params::ParamMap;
pub use state::{State, StateId, StateKind};
pub use projection::{Projection, ProjectionId, ProjectionFamily, ProjectionType};
pub use mechanism::{Mechanism, MechanismId, Preferences};

use serde::{Deserialize, Serialize};

/// Reference to any component in a session.
///
/// State construction takes a `ComponentRef` as its owner and rejects
/// anything that is not a Mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentRef {
    Mechanism(MechanismId),
    State(StateId),
    Projection(ProjectionId),
}

impl From<MechanismId> for ComponentRef {
    fn from(id: MechanismId) -> Self { ComponentRef::Mechanism(id) }
}
impl From<StateId> for ComponentRef {
    fn from(id: StateId) -> Self { ComponentRef::State(id) }
}
impl From<ProjectionId> for ComponentRef {
    fn from(id: ProjectionId) -> Self { ComponentRef::Projection(id) }
}

impl std::fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentRef::Mechanism(id) => write!(f, "mechanism {id}"),
            ComponentRef::State(id) => write!(f, "state {id}"),
            ComponentRef::Projection(id) => write!(f, "projection {id}"),
        }
    }
}
