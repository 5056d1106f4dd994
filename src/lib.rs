//! # stategraph-rs — State/Projection component graphs
//!
//! Resolves loosely-typed specifications into owned, type-checked States
//! wired to their inbound Projections, and aggregates the values flowing
//! into each State at evaluation time.
//!
//! ## Design Principles
//!
//! 1. **Closed specs**: every accepted specification shape is a variant of
//!    `StateSpec` / `ProjectionSpec`; resolvers are one `match` per variant
//! 2. **Explicit session**: the arena, name registry and projection-type
//!    registry live on a `Session`, never in globals
//! 3. **Soft defaults, hard errors**: incompatible values fall back to the
//!    constraint value (recorded as a `Diagnostic`); malformed structure is
//!    a `ConfigurationError`
//! 4. **Policy, not prompts**: ownership conflicts are answered by an
//!    injected `OwnershipArbiter`
//!
//! ## Quick Start
//!
//! ```rust
//! use stategraph::{Context, Session, StateKind, StateListSpec, Value};
//!
//! # fn example() -> stategraph::Result<()> {
//! let mut session = Session::new();
//! let owner = session.add_mechanism("decision");
//!
//! // Two input States, built from the owner's expected input shape.
//! let constraint = Value::from(vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
//! let states = session.resolve_state_list(
//!     owner,
//!     StateListSpec::Empty,
//!     StateKind::Input,
//!     &constraint,
//!     "variable",
//!     &Context::construction("init"),
//! )?;
//! assert_eq!(states.keys().collect::<Vec<_>>(), vec!["DefaultInputState-1", "DefaultInputState-2"]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Modules
//!
//! | Module | Concern |
//! |--------|---------|
//! | `model` | values, States, Projections, Mechanisms, compatibility checks |
//! | `spec` | specification variants and their JSON front-end |
//! | `function` | combination and projection function contracts |
//! | `resolve` | projection, single-state and state-list resolvers |
//! | `update` | the aggregation pipeline |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod spec;
pub mod function;
pub mod registry;
pub mod ownership;
pub mod log;
pub mod config;
pub mod diagnostics;
pub mod session;
pub mod resolve;
pub mod update;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    compatible, compatible_with, to_fixed_shape_numeric, CompatOptions, ComponentRef, Mechanism,
    MechanismId, NumericArray, ParamMap, Preferences, Projection, ProjectionFamily, ProjectionId,
    ProjectionType, State, StateId, StateKind, TypeClass, Value,
};

// ============================================================================
// Re-exports: Specifications
// ============================================================================

pub use spec::{
    ProjectionSpec, ProjectionSpecMap, ProjectionTypeRef, StateEntry, StateListSpec, StateParams,
    StateSpec, StateSpecMap,
};

// ============================================================================
// Re-exports: Session and collaborators
// ============================================================================

pub use config::SessionConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use function::{CombinationFunction, LinearCombination, ProjectionFunction};
pub use log::{Context, Log, LogEntry, LogLevel, LogicalTime};
pub use ownership::{OwnershipArbiter, OwnershipConflict, OwnershipDecision, OwnershipPolicy};
pub use registry::{NameRegistry, ProjectionTypeRegistry};
pub use session::Session;
pub use update::Aggregate;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A specification cannot be resolved into a valid object.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A programmer invariant was broken (e.g. a constraint that must be indexable is not).
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Cannot coerce {value} to a numeric array: {reason}")]
    CoercionError { value: String, reason: String },

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Function error: {0}")]
    FunctionError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
