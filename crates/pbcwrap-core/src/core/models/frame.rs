use crate::core::geometry::UnitCell;

/// One trajectory snapshot: the unit cell and a flat `[x0, y0, z0, x1, ...]`
/// coordinate buffer covering every atom of the system.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub cell: UnitCell,
    pub coords: Vec<f32>,
}

impl Frame {
    pub fn new(cell: UnitCell, coords: Vec<f32>) -> Self {
        Self { cell, coords }
    }

    pub fn from_positions(cell: UnitCell, positions: &[[f32; 3]]) -> Self {
        Self {
            cell,
            coords: positions.iter().flatten().copied().collect(),
        }
    }

    pub fn num_atoms(&self) -> usize {
        self.coords.len() / 3
    }
}
