//! Benchmark profiles and utilities for the Starling engine.
//!
//! Provides a pre-built flocking [`ModelConfig`] profile and deterministic
//! agent placement for benches and examples:
//!
//! - [`flock_profile`]: broadcast + sense over a spatial message grid
//! - [`init_positions`]: deterministic placement via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use starling_core::{AgentStatus, MessageDef, VariableDef, VariableId};
use starling_engine::{AgentFunctionDef, LayerDef, MessageOutputDef, ModelConfig};
use starling_exec::{AgentContext, AgentFunction};
use starling_msg::MessageTopology;

/// Position variable (vector of 3) in the flock layout.
pub const POS: VariableId = VariableId(0);
/// Neighbour-count variable (scalar) in the flock layout.
pub const SEEN: VariableId = VariableId(1);

/// Emits the agent's position into the spatial message grid.
pub struct Broadcast;

impl AgentFunction for Broadcast {
    fn name(&self) -> &str {
        "broadcast"
    }
    fn run(&self, ctx: &mut AgentContext<'_>) -> AgentStatus {
        let p = ctx.var(POS).to_vec();
        ctx.emit(&[p[0], p[1], p[2]]);
        AgentStatus::Alive
    }
}

/// Counts neighbours within unit radius of the agent's own position.
pub struct Sense;

impl AgentFunction for Sense {
    fn name(&self) -> &str {
        "sense"
    }
    fn run(&self, ctx: &mut AgentContext<'_>) -> AgentStatus {
        let p = ctx.var(POS).to_vec();
        let count = ctx.messages().in_radius([p[0], p[1], p[2]], 1.0).count();
        ctx.set_scalar(SEEN, count as f32);
        AgentStatus::Alive
    }
}

/// Build a two-layer flocking profile: broadcast positions, then count
/// neighbours within unit radius through the spatial index.
pub fn flock_profile(capacity: usize, seed: u64) -> ModelConfig {
    let mut layout = starling_core::AgentLayout::new();
    layout
        .register(VariableDef::vector("pos", 3))
        .expect("fresh layout");
    layout
        .register(VariableDef::scalar("seen"))
        .expect("fresh layout");

    ModelConfig {
        name: "flock".into(),
        layout,
        messages: vec![(
            MessageDef::new("location", 3),
            MessageTopology::Spatial3D { cell_width: 1.0 },
        )],
        layers: vec![
            LayerDef {
                functions: vec![AgentFunctionDef {
                    function: Box::new(Broadcast),
                    allows_death: false,
                    message_in: None,
                    message_out: Some(MessageOutputDef {
                        message: "location".into(),
                        optional: false,
                    }),
                    births: false,
                }],
            },
            LayerDef {
                functions: vec![AgentFunctionDef {
                    function: Box::new(Sense),
                    allows_death: false,
                    message_in: Some("location".into()),
                    message_out: None,
                    births: false,
                }],
            },
        ],
        capacity,
        seed,
        checks: true,
    }
}

/// Deterministic agent placement inside a `side × side × side` box.
///
/// Uses a fixed-increment LCG so profiles reproduce across runs without
/// pulling generator state from the simulation's own streams.
pub fn init_positions(n: usize, side: f32, seed: u64) -> Vec<[f32; 3]> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    let mut next = || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 40) as f32 / (1u64 << 24) as f32
    };
    (0..n)
        .map(|_| [next() * side, next() * side, next() * side])
        .collect()
}
