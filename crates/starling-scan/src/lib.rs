//! Parallel stream compaction for the Starling agent simulation engine.
//!
//! Every optional per-thread outcome of a launch — agent death, optional
//! message output, agent birth — is reconciled the same way: a 0/1 flag
//! array is scanned into an exclusive prefix sum, and kept elements are
//! scattered to their compacted positions. This crate implements that
//! mechanism once; the population store, the message strategies, and the
//! step driver all consume it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod compact;
mod scan;

pub use compact::{compact_in_place, compact_indices, compact_rows, compact_slice};
pub use scan::{exclusive_scan, ScanResult};
