//! Uniform-grid spatial index over emitted message positions.
//!
//! Built on the host once per layer, after all emissions for that layer
//! complete: grid bounds are computed from the emitted positions, messages
//! are bucket-sorted by cell, and per-cell offset ranges are derived with
//! the same exclusive scan the outcome-flag compaction uses. Device-side
//! radius queries then walk only the cells overlapping the query sphere.

use starling_scan::exclusive_scan;

/// Read-only descriptor of the spatial grid for one message list.
///
/// Small enough to stage into the per-group scratch header at launch time;
/// the per-cell offset table stays behind in the [`SpatialIndex`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialMetadata {
    /// Lower corner of the grid (componentwise minimum of emitted positions).
    pub min: [f32; 3],
    /// Upper corner of the grid (componentwise maximum of emitted positions).
    pub max: [f32; 3],
    /// Edge length of one cell.
    pub cell_width: f32,
    /// Cells per axis. All-zero for the degenerate empty index.
    pub dims: [u32; 3],
}

impl SpatialMetadata {
    /// Total cell count (zero for the degenerate empty index).
    pub fn cell_count(&self) -> usize {
        self.dims.iter().map(|&d| d as usize).product()
    }

    /// The cell holding `v` on one axis, clamped into the grid.
    fn axis_cell(&self, axis: usize, v: f32) -> u32 {
        let raw = ((v - self.min[axis]) / self.cell_width).floor();
        let max_cell = self.dims[axis].saturating_sub(1);
        if raw < 0.0 {
            0
        } else {
            (raw as u32).min(max_cell)
        }
    }

    /// Linear index of a cell.
    pub fn cell_index(&self, cell: [u32; 3]) -> usize {
        (cell[0] as usize)
            + self.dims[0] as usize * (cell[1] as usize + self.dims[1] as usize * cell[2] as usize)
    }

    /// The cell holding a position, clamped into the grid.
    pub fn cell_of(&self, pos: [f32; 3]) -> usize {
        self.cell_index([
            self.axis_cell(0, pos[0]),
            self.axis_cell(1, pos[1]),
            self.axis_cell(2, pos[2]),
        ])
    }

    /// Inclusive cell range overlapping `[center - radius, center + radius]`
    /// on one axis, or `None` if the interval misses the grid entirely.
    pub fn axis_range(&self, axis: usize, center: f32, radius: f32) -> Option<(u32, u32)> {
        let dim = self.dims[axis];
        if dim == 0 {
            return None;
        }
        let lo = ((center - radius - self.min[axis]) / self.cell_width).floor() as i64;
        let hi = ((center + radius - self.min[axis]) / self.cell_width).floor() as i64;
        let lo = lo.max(0);
        let hi = hi.min(i64::from(dim) - 1);
        if lo > hi {
            None
        } else {
            Some((lo as u32, hi as u32))
        }
    }
}

/// Bucket index over a message list sorted by grid cell.
///
/// `starts` has `cell_count + 1` entries; cell `c`'s messages occupy the
/// contiguous sorted range `starts[c]..starts[c + 1]`. A cell with zero
/// messages yields an empty sub-range, not an error.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialIndex {
    meta: SpatialMetadata,
    starts: Vec<u32>,
}

impl SpatialIndex {
    /// The degenerate index over zero messages. Valid for queries: every
    /// radius yields nothing.
    pub fn empty(cell_width: f32) -> Self {
        Self {
            meta: SpatialMetadata {
                min: [0.0; 3],
                max: [0.0; 3],
                cell_width,
                dims: [0; 3],
            },
            starts: vec![0],
        }
    }

    /// Build the index from dense emitted rows, returning the index and
    /// the rows reordered by cell (stable within a cell).
    ///
    /// The leading three components of each row are its position key.
    /// `cell_width` must be positive and finite; the engine validates this
    /// at model build time. Idempotent for zero rows (degenerate empty
    /// index).
    pub fn build(rows: &[f32], width: usize, cell_width: f32) -> (Self, Vec<f32>) {
        debug_assert!(width >= 3, "spatial messages carry at least x, y, z");
        debug_assert!(cell_width > 0.0 && cell_width.is_finite());
        let count = rows.len() / width;
        if count == 0 {
            return (Self::empty(cell_width), Vec::new());
        }

        // Grid bounds from the emitted positions.
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for i in 0..count {
            let pos = &rows[i * width..i * width + 3];
            for axis in 0..3 {
                min[axis] = min[axis].min(pos[axis]);
                max[axis] = max[axis].max(pos[axis]);
            }
        }
        let mut dims = [0u32; 3];
        for axis in 0..3 {
            let span = (max[axis] - min[axis]) / cell_width;
            dims[axis] = (span.ceil() as u32).max(1);
        }
        let meta = SpatialMetadata {
            min,
            max,
            cell_width,
            dims,
        };

        // Counting sort by cell: per-cell counts, scanned into offsets,
        // then a stable scatter of whole rows.
        let cells: Vec<usize> = (0..count)
            .map(|i| {
                let p = &rows[i * width..i * width + 3];
                meta.cell_of([p[0], p[1], p[2]])
            })
            .collect();
        let mut counts = vec![0u32; meta.cell_count()];
        for &c in &cells {
            counts[c] += 1;
        }
        let scan = exclusive_scan(&counts);
        let mut starts = scan.offsets;
        starts.push(scan.kept);

        let mut cursor: Vec<u32> = starts[..starts.len() - 1].to_vec();
        let mut sorted = vec![0.0f32; rows.len()];
        for (i, &c) in cells.iter().enumerate() {
            let dst = cursor[c] as usize * width;
            cursor[c] += 1;
            sorted[dst..dst + width].copy_from_slice(&rows[i * width..(i + 1) * width]);
        }

        (Self { meta, starts }, sorted)
    }

    /// The staged grid descriptor.
    pub fn meta(&self) -> &SpatialMetadata {
        &self.meta
    }

    /// Row range of one cell (by linear cell index).
    pub fn cell_range(&self, cell: usize) -> (usize, usize) {
        (self.starts[cell] as usize, self.starts[cell + 1] as usize)
    }
}
