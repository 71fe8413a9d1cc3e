//! Host-side message list storage and per-launch staging.

use starling_core::{MessageDef, NamespaceHash};
use starling_scan::{compact_rows, ScanResult};

use crate::spatial::{SpatialIndex, SpatialMetadata};
use crate::topology::MessageTopology;

/// Per-launch staging buffer for outbound messages.
///
/// One row slot per thread, row-major at the message payload width. A
/// thread's write handle fills its own slot; slots whose emitted flag
/// stays 0 are dropped at compaction and never observed by readers.
#[derive(Debug)]
pub struct MessageStaging {
    width: usize,
    rows: Vec<f32>,
}

impl MessageStaging {
    /// Allocate a staging buffer with one slot per thread.
    pub fn new(def: &MessageDef, slots: usize) -> Self {
        let width = def.width();
        Self {
            width,
            rows: vec![0.0; slots * width],
        }
    }

    /// Payload width in f32 slots.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The whole staging buffer, for lending to a launch.
    pub fn rows_mut(&mut self) -> &mut [f32] {
        &mut self.rows
    }

    /// Compact staged rows with the message-emitted flag scan (optional
    /// message output: non-emitting threads contribute nothing).
    pub fn compact(&self, flags: &[u32], scan: &ScanResult) -> Vec<f32> {
        compact_rows(flags, scan, &self.rows, self.width)
    }

    /// Take every slot as a message (required message output: no flag
    /// array exists and each thread emitted exactly once).
    pub fn into_rows(self) -> Vec<f32> {
        self.rows
    }
}

/// Borrowed view of a dense message list plus its optional spatial index.
///
/// This is the opaque inbound metadata a launch receives; read handles
/// interpret it according to the staged header.
#[derive(Clone, Copy, Debug)]
pub struct MessageListRef<'a> {
    /// Payload width in f32 slots.
    pub width: usize,
    /// Dense row-major payload rows.
    pub rows: &'a [f32],
    /// Spatial bucket index, present only for the spatial topology.
    pub index: Option<&'a SpatialIndex>,
}

impl<'a> MessageListRef<'a> {
    /// Number of messages in the list.
    pub fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.rows.len() / self.width
        }
    }

    /// Returns `true` if the list holds no messages.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One message's payload row.
    pub fn row(&self, i: usize) -> &'a [f32] {
        &self.rows[i * self.width..(i + 1) * self.width]
    }
}

/// The combined lookup key and grid descriptor staged once per
/// coordination group before any member reads messages.
///
/// Amortizes the metadata fetch across the group; members validate their
/// own combined hash against the staged key before iterating.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InboundHeader {
    /// Combined (function, message) namespace hash.
    pub key: NamespaceHash,
    /// Copy of the grid descriptor, for the spatial topology.
    pub spatial: Option<SpatialMetadata>,
}

/// One message type's host-side state: definition, topology, the dense
/// readable list, and (for the spatial topology) its bucket index.
///
/// Owned by the driver; rebuilt every layer in which the message's
/// producing function runs.
#[derive(Debug)]
pub struct MessageStore {
    def: MessageDef,
    topology: MessageTopology,
    rows: Vec<f32>,
    index: Option<SpatialIndex>,
}

impl MessageStore {
    /// Create an empty store for a registered message type.
    pub fn new(def: MessageDef, topology: MessageTopology) -> Self {
        let index = match topology {
            MessageTopology::Spatial3D { cell_width } => Some(SpatialIndex::empty(cell_width)),
            _ => None,
        };
        Self {
            def,
            topology,
            rows: Vec::new(),
            index,
        }
    }

    /// The message definition.
    pub fn def(&self) -> &MessageDef {
        &self.def
    }

    /// The bound topology.
    pub fn topology(&self) -> MessageTopology {
        self.topology
    }

    /// Number of readable messages.
    pub fn len(&self) -> usize {
        if self.def.width() == 0 {
            0
        } else {
            self.rows.len() / self.def.width()
        }
    }

    /// Returns `true` if no messages are readable.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Allocate a per-launch staging buffer for this message type.
    pub fn begin_staging(&self, slots: usize) -> MessageStaging {
        MessageStaging::new(&self.def, slots)
    }

    /// Host-side index build: replace the readable list with this layer's
    /// dense emissions and refresh the topology's index.
    ///
    /// Runs after all emission launches for the layer finish and before
    /// any later layer reads. Idempotent for zero emitted messages: the
    /// result is a valid empty list/index.
    pub fn build_index(&mut self, dense: Vec<f32>) {
        match self.topology {
            MessageTopology::None => {
                self.rows.clear();
            }
            MessageTopology::BruteForce => {
                self.rows = dense;
            }
            MessageTopology::Spatial3D { cell_width } => {
                let (index, sorted) = SpatialIndex::build(&dense, self.def.width(), cell_width);
                self.index = Some(index);
                self.rows = sorted;
            }
        }
    }

    /// Borrow the list for binding inbound read handles.
    pub fn list(&self) -> MessageListRef<'_> {
        MessageListRef {
            width: self.def.width(),
            rows: &self.rows,
            index: self.index.as_ref(),
        }
    }

    /// The header a launch stages per coordination group for this message
    /// as its inbound binding.
    pub fn header(&self, function_hash: NamespaceHash, message_hash: NamespaceHash) -> InboundHeader {
        InboundHeader {
            key: function_hash.combine(message_hash),
            spatial: self.index.as_ref().map(|i| *i.meta()),
        }
    }
}
