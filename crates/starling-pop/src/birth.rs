//! Per-launch staging buffer for agent births.

use starling_core::AgentLayout;
use starling_scan::{compact_rows, ScanResult};

/// Staging area for newborn agents during one launch.
///
/// One row slot per thread, row-major at the agent layout's row width. A
/// thread that requests a birth writes the newborn's initial variable
/// values into its own slot and raises its birth outcome flag; slots whose
/// flag stays 0 are discarded at compaction, so their contents are never
/// observed.
#[derive(Debug)]
pub struct BirthStage {
    width: usize,
    rows: Vec<f32>,
}

impl BirthStage {
    /// Allocate a stage with one slot per thread.
    pub fn new(layout: &AgentLayout, slots: usize) -> Self {
        let width = layout.row_width();
        Self {
            width,
            rows: vec![0.0; slots * width],
        }
    }

    /// Row width in f32 slots.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of thread slots.
    pub fn slots(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.rows.len() / self.width
        }
    }

    /// The whole staging buffer, for lending to a launch.
    pub fn rows_mut(&mut self) -> &mut [f32] {
        &mut self.rows
    }

    /// Compact the staged rows into a dense batch using the birth flag
    /// scan. The result feeds [`Population::append_births`](crate::Population::append_births).
    pub fn compact(&self, flags: &[u32], scan: &ScanResult) -> Vec<f32> {
        compact_rows(flags, scan, &self.rows, self.width)
    }
}
