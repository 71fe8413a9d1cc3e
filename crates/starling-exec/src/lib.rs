//! Parallel launch wrapper and per-agent execution context for Starling.
//!
//! One launch runs a user transition function over an entire population:
//! thread indices are partitioned into fixed-size coordination groups,
//! each group stages its inbound message header once, and every in-bounds
//! thread builds an [`AgentContext`] bound to exactly one agent, runs the
//! function, and commits its outcome flags. Runtime-checked faults funnel
//! through the single-slot [`FaultChannel`] and are drained by the host
//! after the launch.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod context;
mod fault;
mod function;
mod rng;
mod wrapper;

pub use context::{AgentContext, BirthSlot};
pub use fault::FaultChannel;
pub use function::AgentFunction;
pub use rng::{AgentRng, RngStreams};
pub use wrapper::{launch, BirthBinding, LaunchArgs, LaunchHashes, MessageOutBinding, GROUP_SIZE};
