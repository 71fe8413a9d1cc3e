//! Device-side inbound message iteration.

use starling_core::NamespaceHash;

use crate::spatial::SpatialIndex;
use crate::store::{InboundHeader, MessageListRef};

/// Read-only handle over one launch's inbound message list.
///
/// Construction is pure and mutates no shared state, so every thread binds
/// its own handle redundantly from the group's staged header. Enumeration
/// order — across grid cells and within a cell — is unspecified; readers
/// must not depend on it.
#[derive(Clone, Copy, Debug)]
pub struct MessageReadHandle<'a> {
    header: InboundHeader,
    list: MessageListRef<'a>,
}

impl<'a> MessageReadHandle<'a> {
    /// Bind a handle from the launch's identifying hashes, the staged
    /// header, and the opaque list metadata.
    pub fn bind(
        function_hash: NamespaceHash,
        message_hash: NamespaceHash,
        header: InboundHeader,
        list: MessageListRef<'a>,
    ) -> Self {
        debug_assert_eq!(
            function_hash.combine(message_hash),
            header.key,
            "staged header does not belong to this launch's message binding"
        );
        Self { header, list }
    }

    /// An inert handle for launches with no inbound message binding.
    pub fn inert() -> Self {
        Self {
            header: InboundHeader {
                key: NamespaceHash::NONE,
                spatial: None,
            },
            list: MessageListRef {
                width: 0,
                rows: &[],
                index: None,
            },
        }
    }

    /// Number of messages in the bound list.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if the bound list holds no messages.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Iterate every message in the list.
    pub fn iter(&self) -> MessageIter<'a> {
        MessageIter {
            list: self.list,
            next: 0,
        }
    }

    /// Iterate exactly the messages whose position (leading three payload
    /// components) lies within `radius` of `center` — no duplicates, no
    /// omissions, independent of emission order.
    ///
    /// With the spatial topology this walks only the grid cells
    /// overlapping the query sphere; the brute-force topology filters the
    /// full list to the same result. A topology without positions yields
    /// nothing.
    pub fn in_radius(&self, center: [f32; 3], radius: f32) -> RadiusIter<'a> {
        let state = match (self.header.spatial, self.list.index) {
            (Some(meta), Some(index)) => {
                let ranges = (
                    meta.axis_range(0, center[0], radius),
                    meta.axis_range(1, center[1], radius),
                    meta.axis_range(2, center[2], radius),
                );
                match ranges {
                    (Some(xr), Some(yr), Some(zr)) => RadiusState::Cells {
                        index,
                        xr,
                        yr,
                        zr,
                        cursor: Some([xr.0, yr.0, zr.0]),
                        row: 0,
                        row_end: 0,
                    },
                    _ => RadiusState::Empty,
                }
            }
            _ if self.list.width >= 3 => RadiusState::Linear { next: 0 },
            _ => RadiusState::Empty,
        };
        RadiusIter {
            list: self.list,
            center,
            r2: radius * radius,
            state,
        }
    }
}

/// Iterator over every message payload row in a list.
pub struct MessageIter<'a> {
    list: MessageListRef<'a>,
    next: usize,
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = &'a [f32];

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.list.len() {
            return None;
        }
        let row = self.list.row(self.next);
        self.next += 1;
        Some(row)
    }
}

enum RadiusState<'a> {
    Empty,
    Linear {
        next: usize,
    },
    Cells {
        index: &'a SpatialIndex,
        xr: (u32, u32),
        yr: (u32, u32),
        zr: (u32, u32),
        /// Next cell to open, or `None` once the last cell is open.
        cursor: Option<[u32; 3]>,
        row: usize,
        row_end: usize,
    },
}

/// Iterator over the messages within a queried radius.
pub struct RadiusIter<'a> {
    list: MessageListRef<'a>,
    center: [f32; 3],
    r2: f32,
    state: RadiusState<'a>,
}

fn within(center: [f32; 3], r2: f32, row: &[f32]) -> bool {
    let dx = row[0] - center[0];
    let dy = row[1] - center[1];
    let dz = row[2] - center[2];
    dx * dx + dy * dy + dz * dz <= r2
}

impl<'a> Iterator for RadiusIter<'a> {
    type Item = &'a [f32];

    fn next(&mut self) -> Option<Self::Item> {
        let (list, center, r2) = (self.list, self.center, self.r2);
        loop {
            match &mut self.state {
                RadiusState::Empty => return None,
                RadiusState::Linear { next } => {
                    while *next < list.len() {
                        let row = list.row(*next);
                        *next += 1;
                        if within(center, r2, row) {
                            return Some(row);
                        }
                    }
                    return None;
                }
                RadiusState::Cells {
                    index,
                    xr,
                    yr,
                    zr,
                    cursor,
                    row,
                    row_end,
                } => {
                    if row < row_end {
                        let candidate = list.row(*row);
                        *row += 1;
                        if within(center, r2, candidate) {
                            return Some(candidate);
                        }
                        continue;
                    }
                    // Open the next overlapping cell; empty cells yield
                    // empty sub-ranges and the loop moves on.
                    let Some(cell) = *cursor else { return None };
                    let (lo, hi) = index.cell_range(index.meta().cell_index(cell));
                    *row = lo;
                    *row_end = hi;
                    *cursor = advance(cell, *xr, *yr, *zr);
                }
            }
        }
    }
}

/// Row-major walk of the overlapping cell box; `None` past the last cell.
fn advance(mut cell: [u32; 3], xr: (u32, u32), yr: (u32, u32), zr: (u32, u32)) -> Option<[u32; 3]> {
    if cell[0] < xr.1 {
        cell[0] += 1;
        return Some(cell);
    }
    cell[0] = xr.0;
    if cell[1] < yr.1 {
        cell[1] += 1;
        return Some(cell);
    }
    cell[1] = yr.0;
    if cell[2] < zr.1 {
        cell[2] += 1;
        return Some(cell);
    }
    None
}
