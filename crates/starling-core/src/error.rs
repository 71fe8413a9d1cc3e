//! Error types for the Starling agent simulation engine.
//!
//! Organized by subsystem: device-side faults (raised inside a launch and
//! funneled through the single-slot fault channel) and host-side step
//! errors (returned from the driver).

use std::error::Error;
use std::fmt;

/// Classification of a runtime-checked fault raised inside a launch.
///
/// Faults are only detected when runtime checking is enabled; with checks
/// disabled none of these conditions are observed and behavior is
/// unspecified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultCode {
    /// A transition function returned `Dead` but death handling is not
    /// enabled for that function.
    DeathNotEnabled,
    /// A transition function requested a birth but agent output is not
    /// enabled for that function.
    BirthNotEnabled,
    /// A transition function emitted a second message within one launch.
    DuplicateEmission,
    /// Device-side iteration addressed outside a valid range.
    IndexOutOfBounds,
    /// A context accessed a variable ID outside the agent layout.
    UnknownVariable,
    /// A context used a message handle with no bound message type.
    UnknownMessage,
    /// A staged side effect exceeded a fixed buffer capacity.
    CapacityExceeded,
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DeathNotEnabled => "death not enabled",
            Self::BirthNotEnabled => "agent output not enabled",
            Self::DuplicateEmission => "duplicate message emission",
            Self::IndexOutOfBounds => "index out of bounds",
            Self::UnknownVariable => "unknown variable",
            Self::UnknownMessage => "unknown message",
            Self::CapacityExceeded => "capacity exceeded",
        };
        write!(f, "{s}")
    }
}

/// A single recorded fault: which thread raised it, what it was, and where.
///
/// At most one record survives a launch (first reporter wins); the host
/// drains it after the launch completes and treats a populated record as a
/// hard failure of that simulation step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaultRecord {
    /// Thread (agent) index that raised the fault.
    pub thread: u32,
    /// Fault classification.
    pub code: FaultCode,
    /// Formatted description.
    pub message: String,
    /// Source location of the raise site (`file:line` style).
    pub origin: &'static str,
}

impl fmt::Display for FaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "thread {}: {} — {} (at {})",
            self.thread, self.code, self.message, self.origin
        )
    }
}

/// Errors from the host-side step driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepError {
    /// A launch raised a runtime-checked fault; the step was aborted.
    FaultRaised {
        /// Name of the agent function whose launch raised the fault.
        function: String,
        /// The recorded fault.
        fault: FaultRecord,
    },
    /// Applying a side effect would exceed population capacity. Checked by
    /// the driver before constructing a launch; device-side components
    /// cannot grow buffers.
    CapacityExceeded {
        /// Live agents plus staged births.
        requested: usize,
        /// Allocated population capacity.
        capacity: usize,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FaultRaised { function, fault } => {
                write!(f, "agent function '{function}' raised a fault: {fault}")
            }
            Self::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "population capacity exceeded: {requested} agents requested, capacity {capacity}"
                )
            }
        }
    }
}

impl Error for StepError {}
