//! Error types for population storage.

use starling_core::VariableId;
use std::error::Error;
use std::fmt;

/// Errors from population construction and mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PopulationError {
    /// Adding agents would exceed the allocated capacity.
    CapacityExceeded {
        /// Live count after the rejected addition.
        requested: usize,
        /// Allocated capacity.
        capacity: usize,
    },
    /// A variable ID outside the population's layout was referenced.
    UnknownVariable {
        /// The offending variable.
        variable: VariableId,
    },
    /// A seeded row's width does not match the layout's row width.
    RowWidthMismatch {
        /// Width of the supplied row.
        got: usize,
        /// Width the layout requires.
        expected: usize,
    },
}

impl fmt::Display for PopulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                capacity,
            } => write!(
                f,
                "population capacity exceeded: {requested} requested, capacity {capacity}"
            ),
            Self::UnknownVariable { variable } => {
                write!(f, "variable {variable} is not in the agent layout")
            }
            Self::RowWidthMismatch { got, expected } => {
                write!(f, "row width {got} does not match layout width {expected}")
            }
        }
    }
}

impl Error for PopulationError {}
