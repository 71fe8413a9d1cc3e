//! Message topologies and passing for the Starling agent simulation engine.
//!
//! Agents communicate through structurally-typed messages. Each message
//! type is bound to one [`MessageTopology`] at model build time; the
//! topology decides how the host indexes emitted messages between layers
//! and how agent code enumerates the relevant subset — without the agent
//! code changing when the topology is swapped:
//!
//! - [`MessageTopology::None`] — no messaging; handles are inert.
//! - [`MessageTopology::BruteForce`] — every message visible to every
//!   reader; radius queries fall back to a linear distance filter.
//! - [`MessageTopology::Spatial3D`] — messages bucketed into a uniform 3D
//!   grid; radius queries walk only the overlapping cells' sorted ranges.
//!
//! Topology dispatch is resolved once per message per launch, not per
//! agent.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod read;
mod spatial;
mod store;
mod topology;
mod write;

pub use read::{MessageIter, MessageReadHandle, RadiusIter};
pub use spatial::{SpatialIndex, SpatialMetadata};
pub use store::{InboundHeader, MessageListRef, MessageStaging, MessageStore};
pub use topology::MessageTopology;
pub use write::{EmitError, MessageWriteHandle};
