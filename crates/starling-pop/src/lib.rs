//! Columnar population storage for the Starling agent simulation engine.
//!
//! A [`Population`] holds one kind of agent as parallel columnar buffers:
//! one `f32` column per agent variable plus an identifier column, all with
//! aligned indices. Buffers are owned here on the host side and lent to a
//! launch as mutable column views; agent death and agent birth are applied
//! between launches through the stream compaction results.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod birth;
mod error;
mod population;

pub use birth::BirthStage;
pub use error::PopulationError;
pub use population::Population;
