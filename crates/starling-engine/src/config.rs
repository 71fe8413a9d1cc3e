//! Model configuration and build-time validation.
//!
//! All structural checks run once at [`Simulation::new`](crate::Simulation::new),
//! not per step: message references, topology constraints, write conflicts,
//! and capacity sanity.

use starling_core::{AgentLayout, MessageDef, MessageRegistry, POSITION_COMPONENTS};
use starling_exec::AgentFunction;
use starling_msg::MessageTopology;

use std::error::Error;
use std::fmt;

/// Outbound message binding for an agent function.
pub struct MessageOutputDef {
    /// Name of the registered message type this function emits.
    pub message: String,
    /// Whether emission is optional. Optional output gets a per-thread
    /// emitted flag and non-emitting agents contribute nothing; required
    /// output takes every thread's slot as a message.
    pub optional: bool,
}

/// One agent function registration: the transition logic plus its
/// per-function enablement switches.
pub struct AgentFunctionDef {
    /// The user transition function.
    pub function: Box<dyn AgentFunction>,
    /// Whether a `Dead` return removes the agent. Returning `Dead` with
    /// this disabled is a configuration fault at runtime.
    pub allows_death: bool,
    /// Inbound message binding (message name), if any.
    pub message_in: Option<String>,
    /// Outbound message binding, if any.
    pub message_out: Option<MessageOutputDef>,
    /// Whether this function may stage newborn agents.
    pub births: bool,
}

impl AgentFunctionDef {
    /// A function with every optional feature disabled.
    pub fn bare(function: Box<dyn AgentFunction>) -> Self {
        Self {
            function,
            allows_death: false,
            message_in: None,
            message_out: None,
            births: false,
        }
    }
}

/// One execution layer: the functions launched between two message
/// visibility boundaries.
pub struct LayerDef {
    /// Functions launched in this layer, in registration order.
    pub functions: Vec<AgentFunctionDef>,
}

/// Complete model description consumed by the simulation driver.
pub struct ModelConfig {
    /// Model name (hashed into the instance namespace).
    pub name: String,
    /// The agent kind's variable layout.
    pub layout: AgentLayout,
    /// Registered message types with their topologies.
    pub messages: Vec<(MessageDef, MessageTopology)>,
    /// Execution layers, run in order each step.
    pub layers: Vec<LayerDef>,
    /// Fixed population capacity (launches cannot grow buffers).
    pub capacity: usize,
    /// Seed for the per-thread random sub-streams.
    pub seed: u64,
    /// Whether runtime checks are enabled. Disabling trades every fault
    /// check for speed; faults then go undetected and behavior is
    /// unspecified.
    pub checks: bool,
}

impl ModelConfig {
    /// Validate the configuration and build the message registry.
    ///
    /// Checks, in order: non-empty layout, non-zero capacity, non-empty
    /// layer list, duplicate message names, spatial payload width and cell
    /// width, message references, and per-layer message write conflicts.
    pub fn validate(&self) -> Result<MessageRegistry, ConfigError> {
        if self.layout.is_empty() {
            return Err(ConfigError::EmptyLayout);
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.layers.is_empty() {
            return Err(ConfigError::NoLayers);
        }

        let mut registry = MessageRegistry::new();
        for (def, topology) in &self.messages {
            if def.components == 0 {
                return Err(ConfigError::EmptyMessage {
                    message: def.name.clone(),
                });
            }
            if let MessageTopology::Spatial3D { cell_width } = topology {
                if def.components < POSITION_COMPONENTS {
                    return Err(ConfigError::SpatialPayloadTooNarrow {
                        message: def.name.clone(),
                        components: def.components,
                    });
                }
                if !cell_width.is_finite() || *cell_width <= 0.0 {
                    return Err(ConfigError::InvalidCellWidth {
                        message: def.name.clone(),
                        value: *cell_width,
                    });
                }
            }
            if registry.register(def.clone()).is_none() {
                return Err(ConfigError::DuplicateMessage {
                    message: def.name.clone(),
                });
            }
        }

        for (layer_index, layer) in self.layers.iter().enumerate() {
            let mut written: Vec<(&str, &str)> = Vec::new();
            for def in &layer.functions {
                if let Some(name) = &def.message_in {
                    if registry.id_of(name).is_none() {
                        return Err(ConfigError::UnknownMessage {
                            function: def.function.name().to_string(),
                            message: name.clone(),
                        });
                    }
                }
                if let Some(out) = &def.message_out {
                    if registry.id_of(&out.message).is_none() {
                        return Err(ConfigError::UnknownMessage {
                            function: def.function.name().to_string(),
                            message: out.message.clone(),
                        });
                    }
                    if let Some(&(_, first)) =
                        written.iter().find(|&&(m, _)| m == out.message.as_str())
                    {
                        return Err(ConfigError::MessageWriteConflict {
                            layer: layer_index,
                            message: out.message.clone(),
                            first_writer: first.to_string(),
                            second_writer: def.function.name().to_string(),
                        });
                    }
                    written.push((out.message.as_str(), def.function.name()));
                }
            }
        }

        Ok(registry)
    }
}

/// Errors from model validation (build-time, not per-step).
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The agent layout declares no variables.
    EmptyLayout,
    /// The population capacity is zero.
    ZeroCapacity,
    /// The model declares no layers.
    NoLayers,
    /// Two message types share a name.
    DuplicateMessage {
        /// The duplicated name.
        message: String,
    },
    /// A message type declares a zero-width payload.
    EmptyMessage {
        /// The message name.
        message: String,
    },
    /// A function references a message name that is not registered.
    UnknownMessage {
        /// Which function.
        function: String,
        /// The missing message name.
        message: String,
    },
    /// A spatial message's payload cannot carry a position key.
    SpatialPayloadTooNarrow {
        /// The message name.
        message: String,
        /// Its declared payload width.
        components: u32,
    },
    /// A spatial message's cell width is not a positive finite number.
    InvalidCellWidth {
        /// The message name.
        message: String,
        /// The invalid width.
        value: f32,
    },
    /// Two functions in one layer emit the same message.
    MessageWriteConflict {
        /// Index of the offending layer.
        layer: usize,
        /// The contested message.
        message: String,
        /// Name of the first writer.
        first_writer: String,
        /// Name of the second writer.
        second_writer: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyLayout => write!(f, "agent layout declares no variables"),
            Self::ZeroCapacity => write!(f, "population capacity must be non-zero"),
            Self::NoLayers => write!(f, "model declares no layers"),
            Self::DuplicateMessage { message } => {
                write!(f, "message '{message}' is registered twice")
            }
            Self::EmptyMessage { message } => {
                write!(f, "message '{message}' declares no payload components")
            }
            Self::UnknownMessage { function, message } => {
                write!(f, "function '{function}' references unknown message '{message}'")
            }
            Self::SpatialPayloadTooNarrow {
                message,
                components,
            } => write!(
                f,
                "spatial message '{message}' has {components} components; \
                 at least {POSITION_COMPONENTS} are required for the position key"
            ),
            Self::InvalidCellWidth { message, value } => {
                write!(
                    f,
                    "spatial message '{message}' has invalid cell width {value} \
                     (must be finite and positive)"
                )
            }
            Self::MessageWriteConflict {
                layer,
                message,
                first_writer,
                second_writer,
            } => write!(
                f,
                "layer {layer}: message '{message}' emitted by both \
                 '{first_writer}' and '{second_writer}'"
            ),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use starling_core::{AgentStatus, VariableDef};
    use starling_exec::AgentContext;

    struct Noop;
    impl AgentFunction for Noop {
        fn name(&self) -> &str {
            "noop"
        }
        fn run(&self, _ctx: &mut AgentContext<'_>) -> AgentStatus {
            AgentStatus::Alive
        }
    }

    fn layout() -> AgentLayout {
        let mut layout = AgentLayout::new();
        layout.register(VariableDef::scalar("x")).unwrap();
        layout
    }

    fn base_config() -> ModelConfig {
        ModelConfig {
            name: "test".into(),
            layout: layout(),
            messages: Vec::new(),
            layers: vec![LayerDef {
                functions: vec![AgentFunctionDef::bare(Box::new(Noop))],
            }],
            capacity: 16,
            seed: 1,
            checks: true,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn empty_layout_rejected() {
        let mut config = base_config();
        config.layout = AgentLayout::new();
        assert_eq!(config.validate().unwrap_err(), ConfigError::EmptyLayout);
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut config = base_config();
        config.capacity = 0;
        assert_eq!(config.validate().unwrap_err(), ConfigError::ZeroCapacity);
    }

    #[test]
    fn empty_layers_rejected() {
        let mut config = base_config();
        config.layers.clear();
        assert_eq!(config.validate().unwrap_err(), ConfigError::NoLayers);
    }

    #[test]
    fn duplicate_message_rejected() {
        let mut config = base_config();
        config.messages = vec![
            (MessageDef::new("ping", 1), MessageTopology::BruteForce),
            (MessageDef::new("ping", 1), MessageTopology::BruteForce),
        ];
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::DuplicateMessage { .. }
        ));
    }

    #[test]
    fn zero_width_message_rejected() {
        let mut config = base_config();
        config.messages = vec![(MessageDef::new("empty", 0), MessageTopology::BruteForce)];
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::EmptyMessage { .. }
        ));
    }

    #[test]
    fn unknown_message_reference_rejected() {
        let mut config = base_config();
        config.layers[0].functions[0].message_in = Some("missing".into());
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::UnknownMessage { .. }
        ));
    }

    #[test]
    fn narrow_spatial_payload_rejected() {
        let mut config = base_config();
        config.messages = vec![(
            MessageDef::new("location", 2),
            MessageTopology::Spatial3D { cell_width: 1.0 },
        )];
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::SpatialPayloadTooNarrow { components: 2, .. }
        ));
    }

    #[test]
    fn bad_cell_width_rejected() {
        for bad in [0.0f32, -1.0, f32::NAN, f32::INFINITY] {
            let mut config = base_config();
            config.messages = vec![(
                MessageDef::new("location", 4),
                MessageTopology::Spatial3D { cell_width: bad },
            )];
            assert!(
                matches!(
                    config.validate().unwrap_err(),
                    ConfigError::InvalidCellWidth { .. }
                ),
                "cell width {bad} should be rejected"
            );
        }
    }

    #[test]
    fn same_layer_write_conflict_rejected() {
        let mut config = base_config();
        config.messages = vec![(MessageDef::new("ping", 1), MessageTopology::BruteForce)];
        let mut a = AgentFunctionDef::bare(Box::new(Noop));
        a.message_out = Some(MessageOutputDef {
            message: "ping".into(),
            optional: true,
        });
        let mut b = AgentFunctionDef::bare(Box::new(Noop));
        b.message_out = Some(MessageOutputDef {
            message: "ping".into(),
            optional: true,
        });
        config.layers = vec![LayerDef {
            functions: vec![a, b],
        }];
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::MessageWriteConflict { layer: 0, .. }
        ));
    }
}
