//! Starling: a massively-parallel agent simulation engine.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Starling sub-crates. For most users, adding `starling` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use starling::prelude::*;
//!
//! // An agent with one energy variable that decays each step and dies
//! // at zero.
//! struct Decay;
//! impl AgentFunction for Decay {
//!     fn name(&self) -> &str { "decay" }
//!     fn run(&self, ctx: &mut AgentContext<'_>) -> AgentStatus {
//!         let e = ctx.scalar(VariableId(0)) - 1.0;
//!         ctx.set_scalar(VariableId(0), e);
//!         if e <= 0.0 { AgentStatus::Dead } else { AgentStatus::Alive }
//!     }
//! }
//!
//! let mut layout = AgentLayout::new();
//! layout.register(VariableDef::scalar("energy")).unwrap();
//!
//! let mut sim = Simulation::new(ModelConfig {
//!     name: "decay".into(),
//!     layout,
//!     messages: Vec::new(),
//!     layers: vec![LayerDef {
//!         functions: vec![AgentFunctionDef {
//!             function: Box::new(Decay),
//!             allows_death: true,
//!             message_in: None,
//!             message_out: None,
//!             births: false,
//!         }],
//!     }],
//!     capacity: 1024,
//!     seed: 42,
//!     checks: true,
//! }).unwrap();
//!
//! sim.spawn(&[3.0]).unwrap();
//! sim.spawn(&[1.0]).unwrap();
//! sim.step().unwrap();
//! assert_eq!(sim.population().len(), 1);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `starling-core` | IDs, schemas, status, namespace hashes, errors |
//! | [`scan`] | `starling-scan` | Parallel stream compaction |
//! | [`pop`] | `starling-pop` | Columnar population storage and birth staging |
//! | [`msg`] | `starling-msg` | Message topologies, stores, and handles |
//! | [`exec`] | `starling-exec` | Launch wrapper, agent context, fault channel |
//! | [`engine`] | `starling-engine` | Model configuration and the step driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, IDs, and errors (`starling-core`).
pub use starling_core as types;

/// Parallel stream compaction (`starling-scan`).
///
/// The exclusive scan and stable compaction used for agent death,
/// optional message output, and agent birth.
pub use starling_scan as scan;

/// Columnar population storage (`starling-pop`).
pub use starling_pop as pop;

/// Message topologies and passing (`starling-msg`).
///
/// [`msg::MessageTopology`] selects per message between no messaging,
/// brute-force visibility, and 3D spatial partitioning.
pub use starling_msg as msg;

/// Launch wrapper and per-agent execution context (`starling-exec`).
///
/// The [`exec::AgentFunction`] trait is the main extension point for
/// user-defined agent logic.
pub use starling_exec as exec;

/// Model configuration and the lockstep step driver (`starling-engine`).
pub use starling_engine as engine;

/// Common imports for typical Starling usage.
///
/// ```rust
/// use starling::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use starling_core::{
        AgentId, AgentLayout, AgentStatus, MessageDef, VariableDef, VariableId,
    };

    // Errors
    pub use starling_core::{FaultCode, FaultRecord, StepError};

    // Messaging
    pub use starling_msg::MessageTopology;

    // Execution
    pub use starling_exec::{AgentContext, AgentFunction};

    // Engine
    pub use starling_engine::{
        AgentFunctionDef, ConfigError, LayerDef, MessageOutputDef, ModelConfig, Simulation,
        StepMetrics, StepResult,
    };
}
