//! The columnar agent population store.

use starling_core::{AgentId, AgentLayout, VariableId};
use starling_scan::{compact_in_place, compact_slice, ScanResult};

use crate::error::PopulationError;

/// An ordered population of one agent kind, stored column-wise.
///
/// One `Vec<f32>` per variable plus an [`AgentId`] column; all columns have
/// aligned indices, so `column[i]` for every variable describes the same
/// agent. Live count is `len() <= capacity()`; the capacity is fixed at
/// construction because launches cannot grow buffers mid-flight.
#[derive(Clone, Debug)]
pub struct Population {
    layout: AgentLayout,
    capacity: usize,
    ids: Vec<AgentId>,
    columns: Vec<Vec<f32>>,
}

impl Population {
    /// Create an empty population with the given layout and capacity.
    pub fn new(layout: AgentLayout, capacity: usize) -> Self {
        let columns = layout
            .iter()
            .map(|(_, def)| Vec::with_capacity(capacity * def.components as usize))
            .collect();
        Self {
            layout,
            capacity,
            ids: Vec::with_capacity(capacity),
            columns,
        }
    }

    /// The agent layout this population stores.
    pub fn layout(&self) -> &AgentLayout {
        &self.layout
    }

    /// Live agent count.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if no agents are live.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Allocated capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remaining headroom before the capacity is reached.
    pub fn headroom(&self) -> usize {
        self.capacity - self.ids.len()
    }

    /// Seed one agent from a full row of variable values (layout order,
    /// concatenated).
    pub fn push(&mut self, id: AgentId, row: &[f32]) -> Result<(), PopulationError> {
        let expected = self.layout.row_width();
        if row.len() != expected {
            return Err(PopulationError::RowWidthMismatch {
                got: row.len(),
                expected,
            });
        }
        if self.ids.len() + 1 > self.capacity {
            return Err(PopulationError::CapacityExceeded {
                requested: self.ids.len() + 1,
                capacity: self.capacity,
            });
        }
        self.ids.push(id);
        let mut offset = 0;
        for ((_, def), column) in self.layout.iter().zip(&mut self.columns) {
            let w = def.components as usize;
            column.extend_from_slice(&row[offset..offset + w]);
            offset += w;
        }
        Ok(())
    }

    /// The identifier column.
    pub fn ids(&self) -> &[AgentId] {
        &self.ids
    }

    /// Read one variable's column.
    pub fn column(&self, variable: VariableId) -> Result<&[f32], PopulationError> {
        self.columns
            .get(variable.0 as usize)
            .map(|c| c.as_slice())
            .ok_or(PopulationError::UnknownVariable { variable })
    }

    /// Mutable access to one variable's column.
    pub fn column_mut(&mut self, variable: VariableId) -> Result<&mut [f32], PopulationError> {
        self.columns
            .get_mut(variable.0 as usize)
            .map(|c| c.as_mut_slice())
            .ok_or(PopulationError::UnknownVariable { variable })
    }

    /// Mutable views of every column at once, in layout order, for lending
    /// to a launch.
    pub fn columns_mut(&mut self) -> Vec<&mut [f32]> {
        self.columns.iter_mut().map(|c| c.as_mut_slice()).collect()
    }

    /// Split-borrow the identifier column alongside the mutable variable
    /// columns, as one launch consumes them.
    pub fn lend(&mut self) -> (&[AgentId], Vec<&mut [f32]>) {
        (
            self.ids.as_slice(),
            self.columns.iter_mut().map(|c| c.as_mut_slice()).collect(),
        )
    }

    /// One agent's value for one variable (host-side inspection).
    pub fn value(&self, index: usize, variable: VariableId) -> Result<&[f32], PopulationError> {
        let def = self
            .layout
            .def(variable)
            .ok_or(PopulationError::UnknownVariable { variable })?;
        let w = def.components as usize;
        let column = self.column(variable)?;
        Ok(&column[index * w..(index + 1) * w])
    }

    /// Apply a death compaction: keep the agents whose flag is 1, preserving
    /// relative order, across the identifier column and every variable
    /// column.
    ///
    /// `flags` and `scan` come from the launch's death flag array; lengths
    /// must match the live count.
    pub fn apply_deaths(&mut self, flags: &[u32], scan: &ScanResult) {
        debug_assert_eq!(flags.len(), self.ids.len());
        self.ids = compact_slice(flags, scan, &self.ids);
        for ((_, def), column) in self.layout.iter().zip(&mut self.columns) {
            compact_in_place(flags, scan, column, def.components as usize);
        }
    }

    /// Append a dense batch of newborn agents.
    ///
    /// `rows` is row-major (layout row width per agent), already compacted;
    /// identifiers are `base + rank` in row order, so assignment is
    /// deterministic given the compacted order. The caller must have
    /// verified capacity beforehand.
    pub fn append_births(&mut self, base: AgentId, rows: &[f32]) -> Result<(), PopulationError> {
        let width = self.layout.row_width();
        debug_assert!(width > 0 || rows.is_empty());
        let count = if width == 0 { 0 } else { rows.len() / width };
        debug_assert_eq!(rows.len(), count * width);
        if self.ids.len() + count > self.capacity {
            return Err(PopulationError::CapacityExceeded {
                requested: self.ids.len() + count,
                capacity: self.capacity,
            });
        }
        for rank in 0..count {
            let id = AgentId(base.0 + rank as u32);
            let row = &rows[rank * width..(rank + 1) * width];
            self.push(id, row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starling_core::VariableDef;
    use starling_scan::exclusive_scan;

    fn two_var_layout() -> AgentLayout {
        let mut layout = AgentLayout::new();
        layout.register(VariableDef::scalar("energy")).unwrap();
        layout.register(VariableDef::vector("pos", 3)).unwrap();
        layout
    }

    fn seeded(n: u32) -> Population {
        let mut pop = Population::new(two_var_layout(), 64);
        for i in 0..n {
            let f = i as f32;
            pop.push(AgentId(i + 1), &[f, f, f + 0.1, f + 0.2]).unwrap();
        }
        pop
    }

    #[test]
    fn columns_stay_aligned() {
        let pop = seeded(4);
        assert_eq!(pop.len(), 4);
        assert_eq!(pop.value(2, VariableId(0)).unwrap(), &[2.0]);
        assert_eq!(pop.value(2, VariableId(1)).unwrap(), &[2.0, 2.1, 2.2]);
    }

    #[test]
    fn push_rejects_wrong_row_width() {
        let mut pop = Population::new(two_var_layout(), 4);
        let err = pop.push(AgentId(1), &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, PopulationError::RowWidthMismatch { got: 2, expected: 4 }));
    }

    #[test]
    fn push_rejects_over_capacity() {
        let mut pop = Population::new(two_var_layout(), 1);
        pop.push(AgentId(1), &[0.0; 4]).unwrap();
        let err = pop.push(AgentId(2), &[0.0; 4]).unwrap_err();
        assert!(matches!(err, PopulationError::CapacityExceeded { .. }));
    }

    #[test]
    fn death_compaction_is_stable_across_columns() {
        let mut pop = seeded(10);
        let flags = [1, 0, 1, 1, 0, 1, 1, 1, 0, 1];
        let scan = exclusive_scan(&flags);
        pop.apply_deaths(&flags, &scan);

        assert_eq!(pop.len(), 7);
        let expected_ids: Vec<AgentId> =
            [0u32, 2, 3, 5, 6, 7, 9].iter().map(|&i| AgentId(i + 1)).collect();
        assert_eq!(pop.ids(), expected_ids.as_slice());
        // Variable columns moved with the ids.
        assert_eq!(pop.value(1, VariableId(0)).unwrap(), &[2.0]);
        assert_eq!(pop.value(1, VariableId(1)).unwrap(), &[2.0, 2.1, 2.2]);
        assert_eq!(pop.value(6, VariableId(0)).unwrap(), &[9.0]);
    }

    #[test]
    fn all_dead_empties_the_population() {
        let mut pop = seeded(3);
        let flags = [0, 0, 0];
        let scan = exclusive_scan(&flags);
        pop.apply_deaths(&flags, &scan);
        assert!(pop.is_empty());
    }

    #[test]
    fn births_get_sequential_ids_in_row_order() {
        let mut pop = seeded(2);
        let rows = [8.0, 1.0, 1.0, 1.0, 9.0, 2.0, 2.0, 2.0];
        pop.append_births(AgentId(100), &rows).unwrap();
        assert_eq!(pop.len(), 4);
        assert_eq!(pop.ids()[2], AgentId(100));
        assert_eq!(pop.ids()[3], AgentId(101));
        assert_eq!(pop.value(3, VariableId(0)).unwrap(), &[9.0]);
    }

    #[test]
    fn births_beyond_capacity_rejected() {
        let mut pop = Population::new(two_var_layout(), 1);
        let rows = [0.0; 8];
        let err = pop.append_births(AgentId(1), &rows).unwrap_err();
        assert!(matches!(err, PopulationError::CapacityExceeded { .. }));
        assert!(pop.is_empty());
    }
}
