//! Topology selection for a registered message type.

/// How a message type's emitted messages are indexed and enumerated.
///
/// Selected per message at model build time. Each variant implements the
/// same capability set — host-side index build, inbound read handle,
/// outbound write handle — so agent code is unchanged when the variant is
/// swapped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MessageTopology {
    /// No messaging: trivial metadata, inert handles.
    None,
    /// Every emitted message is visible to every reader; no spatial
    /// pruning.
    BruteForce,
    /// Messages bucketed into a uniform grid keyed by their 3D position
    /// (the payload's leading three components). Readers enumerate only
    /// cells overlapping the queried radius.
    Spatial3D {
        /// Edge length of one grid cell, in position units.
        cell_width: f32,
    },
}

impl MessageTopology {
    /// Returns `true` if this topology carries a spatial index.
    pub fn is_spatial(&self) -> bool {
        matches!(self, Self::Spatial3D { .. })
    }
}
