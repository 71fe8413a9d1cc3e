//! Strongly-typed identifiers and the shared [`IdSource`] counter.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Unique identifier of one agent across the whole run.
///
/// `AgentId(0)` is the unset sentinel: newly staged agents carry it until
/// the driver assigns real identifiers from the shared [`IdSource`]. No
/// live agent ever holds the sentinel after its birth batch is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u32);

impl AgentId {
    /// The unset sentinel carried by staged agents before assignment.
    pub const UNSET: AgentId = AgentId(0);

    /// Returns `true` if this is the unset sentinel.
    pub fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AgentId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies an agent variable within an [`AgentLayout`](crate::AgentLayout).
///
/// Variables are registered at model creation and assigned sequential IDs.
/// `VariableId(n)` corresponds to the n-th variable in the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub u32);

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for VariableId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a registered message type within a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MessageId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies an agent function within a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FunctionId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies an execution layer within a model.
///
/// Layers are the message visibility boundary: emissions in layer `n` are
/// readable from layer `n + 1` onward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for LayerId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonic source of fresh [`AgentId`]s, shared across all launches of
/// one simulation.
///
/// The driver hands the source down to each launch that has agent birth
/// enabled; births reserve a contiguous block with a single atomic
/// post-increment so that identifier assignment within one compacted birth
/// batch is deterministic given thread index.
#[derive(Debug)]
pub struct IdSource {
    next: AtomicU32,
}

impl IdSource {
    /// Create a source whose first issued identifier is `first`.
    ///
    /// `first` must be non-zero; zero is the [`AgentId::UNSET`] sentinel.
    pub fn new(first: u32) -> Self {
        debug_assert!(first != 0, "AgentId(0) is reserved as the unset sentinel");
        Self {
            next: AtomicU32::new(first),
        }
    }

    /// Reserve a contiguous block of `count` identifiers, returning the
    /// first. Thread-safe; blocks issued by concurrent callers never overlap.
    pub fn reserve(&self, count: u32) -> AgentId {
        AgentId(self.next.fetch_add(count, Ordering::Relaxed))
    }

    /// The next identifier that would be issued (for host bookkeeping).
    pub fn peek(&self) -> AgentId {
        AgentId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for IdSource {
    fn default() -> Self {
        Self::new(1)
    }
}
