//! Agent and message schema definitions.
//!
//! Agents and messages are structurally typed: a schema is an ordered list
//! of named f32 columns (scalar or fixed-width vector). Column storage and
//! per-launch access are built in other crates; this module only describes
//! shape.

use crate::id::{MessageId, VariableId};
use indexmap::IndexMap;
use smallvec::SmallVec;

/// A short run of f32 values.
///
/// Uses `SmallVec<[f32; 8]>` to avoid heap allocation for typical payload
/// and variable widths; wider schemas spill to the heap transparently.
pub type Scalars = SmallVec<[f32; 8]>;

/// Definition of one agent variable: a named column of `components` f32
/// slots per agent (1 for a scalar, `n` for a fixed-width vector).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableDef {
    /// Variable name, unique within an [`AgentLayout`].
    pub name: String,
    /// Number of f32 slots per agent.
    pub components: u32,
}

impl VariableDef {
    /// A scalar variable.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: 1,
        }
    }

    /// A fixed-width vector variable.
    pub fn vector(name: impl Into<String>, components: u32) -> Self {
        Self {
            name: name.into(),
            components,
        }
    }
}

/// Ordered set of variables describing one kind of agent.
///
/// Variables are assigned sequential [`VariableId`]s in registration order;
/// the ID is the index into the column list of every population of this
/// agent kind.
#[derive(Clone, Debug, Default)]
pub struct AgentLayout {
    variables: Vec<VariableDef>,
    by_name: IndexMap<String, VariableId>,
}

impl AgentLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable, returning its ID.
    ///
    /// Returns `None` if a variable with the same name already exists
    /// (callers surface this as a model configuration error).
    pub fn register(&mut self, def: VariableDef) -> Option<VariableId> {
        if self.by_name.contains_key(&def.name) {
            return None;
        }
        let id = VariableId(self.variables.len() as u32);
        self.by_name.insert(def.name.clone(), id);
        self.variables.push(def);
        Some(id)
    }

    /// Look up a variable ID by name.
    pub fn id_of(&self, name: &str) -> Option<VariableId> {
        self.by_name.get(name).copied()
    }

    /// The definition for a variable ID.
    pub fn def(&self, id: VariableId) -> Option<&VariableDef> {
        self.variables.get(id.0 as usize)
    }

    /// Number of registered variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns `true` if no variables are registered.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate `(id, def)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &VariableDef)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, d)| (VariableId(i as u32), d))
    }

    /// Total f32 slots per agent across all variables.
    pub fn row_width(&self) -> usize {
        self.variables.iter().map(|v| v.components as usize).sum()
    }
}

/// Number of leading payload components that carry the position key of a
/// spatially partitioned message (x, y, z).
pub const POSITION_COMPONENTS: u32 = 3;

/// Definition of one message type: a named payload of `components` f32
/// slots per message.
///
/// A message bound to the spatial topology must carry at least
/// [`POSITION_COMPONENTS`] components; the leading three are its position
/// key. The engine validates this at model build time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageDef {
    /// Message name, unique within a model.
    pub name: String,
    /// Payload width in f32 slots per message.
    pub components: u32,
}

impl MessageDef {
    /// Define a message type.
    pub fn new(name: impl Into<String>, components: u32) -> Self {
        Self {
            name: name.into(),
            components,
        }
    }

    /// Payload width as a usize stride.
    pub fn width(&self) -> usize {
        self.components as usize
    }
}

/// Ordered registry of message definitions, IDs assigned in registration
/// order (mirrors [`AgentLayout`]).
#[derive(Clone, Debug, Default)]
pub struct MessageRegistry {
    messages: Vec<MessageDef>,
    by_name: IndexMap<String, MessageId>,
}

impl MessageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message type, returning its ID, or `None` on a duplicate
    /// name.
    pub fn register(&mut self, def: MessageDef) -> Option<MessageId> {
        if self.by_name.contains_key(&def.name) {
            return None;
        }
        let id = MessageId(self.messages.len() as u32);
        self.by_name.insert(def.name.clone(), id);
        self.messages.push(def);
        Some(id)
    }

    /// Look up a message ID by name.
    pub fn id_of(&self, name: &str) -> Option<MessageId> {
        self.by_name.get(name).copied()
    }

    /// The definition for a message ID.
    pub fn def(&self, id: MessageId) -> Option<&MessageDef> {
        self.messages.get(id.0 as usize)
    }

    /// Number of registered message types.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if no message types are registered.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate `(id, def)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (MessageId, &MessageDef)> {
        self.messages
            .iter()
            .enumerate()
            .map(|(i, d)| (MessageId(i as u32), d))
    }
}
