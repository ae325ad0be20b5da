//! Seams between the wrapping engine and whatever holds the trajectory.
//!
//! The engine never touches files or topologies directly. It asks a
//! [`SelectionProvider`] for atom indices and per-atom attributes, and a
//! [`TrajectoryProvider`] for unit cells and coordinate buffers. [`Trajectory`]
//! implements both, so an in-memory trajectory can be processed as is.

use crate::core::geometry::UnitCell;
use crate::core::models::trajectory::Trajectory;
use crate::core::selection::{self, SelectionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Frame {frame} is out of range (trajectory has {num_frames} frames)")]
    FrameOutOfRange { frame: usize, num_frames: usize },

    #[error("Atom index {index} is out of range (system has {num_atoms} atoms)")]
    AtomOutOfRange { index: usize, num_atoms: usize },

    #[error("Attribute {attribute:?} returned {found} values for {expected} atoms")]
    AttributeLength {
        attribute: AtomAttribute,
        expected: usize,
        found: usize,
    },

    #[error("Coordinate buffer for frame {frame} holds {found} values, expected {expected}")]
    CoordinateLength {
        frame: usize,
        expected: usize,
        found: usize,
    },
}

/// Per-atom attributes the engine may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomAttribute {
    Residue,
    Fragment,
    Beta,
    Occupancy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValues {
    Integer(Vec<i64>),
    Real(Vec<f64>),
}

impl AttributeValues {
    pub fn len(&self) -> usize {
        match self {
            AttributeValues::Integer(v) => v.len(),
            AttributeValues::Real(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Integer tags; real values are truncated toward zero.
    pub fn to_tags(&self) -> Vec<i64> {
        match self {
            AttributeValues::Integer(v) => v.clone(),
            AttributeValues::Real(v) => v.iter().map(|&x| x.trunc() as i64).collect(),
        }
    }

    /// `true` where the truncated value is non-zero.
    pub fn to_flags(&self) -> Vec<bool> {
        self.to_tags().into_iter().map(|tag| tag != 0).collect()
    }
}

pub trait SelectionProvider {
    fn num_atoms(&self) -> usize;

    /// Resolves selection text to ascending atom indices.
    fn select(&self, text: &str) -> Result<Vec<usize>, ProviderError>;

    /// Returns one value per entry of `indices`, in the same order.
    fn attribute(
        &self,
        indices: &[usize],
        attribute: AtomAttribute,
    ) -> Result<AttributeValues, ProviderError>;
}

pub trait TrajectoryProvider {
    fn num_frames(&self) -> usize;

    fn unit_cell(&self, frame: usize) -> Result<UnitCell, ProviderError>;

    /// Fills `buffer` with the flat `3 * natoms` coordinates of `frame`.
    fn read_coordinates(&self, frame: usize, buffer: &mut Vec<f32>) -> Result<(), ProviderError>;

    fn write_coordinates(&mut self, frame: usize, coords: &[f32]) -> Result<(), ProviderError>;
}

impl Trajectory {
    fn check_frame(&self, frame: usize) -> Result<(), ProviderError> {
        if frame >= self.num_frames() {
            return Err(ProviderError::FrameOutOfRange {
                frame,
                num_frames: self.num_frames(),
            });
        }
        Ok(())
    }
}

impl SelectionProvider for Trajectory {
    fn num_atoms(&self) -> usize {
        self.topology().num_atoms()
    }

    fn select(&self, text: &str) -> Result<Vec<usize>, ProviderError> {
        Ok(selection::select(self.topology(), text)?)
    }

    fn attribute(
        &self,
        indices: &[usize],
        attribute: AtomAttribute,
    ) -> Result<AttributeValues, ProviderError> {
        let topology = self.topology();
        let num_atoms = topology.num_atoms();
        let out_of_range = |index| ProviderError::AtomOutOfRange { index, num_atoms };

        let values = match attribute {
            AtomAttribute::Residue => AttributeValues::Integer(
                indices
                    .iter()
                    .map(|&i| topology.residue(i).map(|r| r as i64).ok_or_else(|| out_of_range(i)))
                    .collect::<Result<_, _>>()?,
            ),
            AtomAttribute::Fragment => AttributeValues::Integer(
                indices
                    .iter()
                    .map(|&i| topology.fragment(i).map(|f| f as i64).ok_or_else(|| out_of_range(i)))
                    .collect::<Result<_, _>>()?,
            ),
            AtomAttribute::Beta => AttributeValues::Real(
                indices
                    .iter()
                    .map(|&i| topology.atom(i).map(|a| a.beta).ok_or_else(|| out_of_range(i)))
                    .collect::<Result<_, _>>()?,
            ),
            AtomAttribute::Occupancy => AttributeValues::Real(
                indices
                    .iter()
                    .map(|&i| topology.atom(i).map(|a| a.occupancy).ok_or_else(|| out_of_range(i)))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(values)
    }
}

impl TrajectoryProvider for Trajectory {
    fn num_frames(&self) -> usize {
        self.frames().len()
    }

    fn unit_cell(&self, frame: usize) -> Result<UnitCell, ProviderError> {
        self.check_frame(frame)?;
        Ok(self.frames()[frame].cell)
    }

    fn read_coordinates(&self, frame: usize, buffer: &mut Vec<f32>) -> Result<(), ProviderError> {
        self.check_frame(frame)?;
        buffer.clear();
        buffer.extend_from_slice(&self.frames()[frame].coords);
        Ok(())
    }

    fn write_coordinates(&mut self, frame: usize, coords: &[f32]) -> Result<(), ProviderError> {
        self.check_frame(frame)?;
        let target = &mut self.frames_mut()[frame].coords;
        if target.len() != coords.len() {
            return Err(ProviderError::CoordinateLength {
                frame,
                expected: target.len(),
                found: coords.len(),
            });
        }
        target.copy_from_slice(coords);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::frame::Frame;
    use crate::core::models::topology::{AtomRecord, Topology};

    fn trajectory() -> Trajectory {
        let atoms = vec![
            AtomRecord {
                residue_name: "ALA".into(),
                residue_number: 1,
                beta: 3.7,
                occupancy: 0.9,
                ..Default::default()
            },
            AtomRecord {
                residue_name: "ALA".into(),
                residue_number: 1,
                beta: -2.2,
                occupancy: 1.0,
                ..Default::default()
            },
            AtomRecord {
                residue_name: "HOH".into(),
                residue_number: 2,
                beta: 0.0,
                occupancy: 2.5,
                ..Default::default()
            },
        ];
        let topology = Topology::new(atoms, vec![(0, 1)]).unwrap();
        let frame = Frame::new(UnitCell::orthorhombic(10.0, 10.0, 10.0), vec![0.0; 9]);
        Trajectory::new(topology, vec![frame]).unwrap()
    }

    #[test]
    fn real_values_truncate_toward_zero() {
        let values = AttributeValues::Real(vec![3.7, -2.2, 0.9, -0.9]);
        assert_eq!(values.to_tags(), vec![3, -2, 0, 0]);
        assert_eq!(values.to_flags(), vec![true, true, false, false]);
    }

    #[test]
    fn attributes_follow_requested_order() {
        let t = trajectory();
        assert_eq!(
            t.attribute(&[2, 0], AtomAttribute::Residue).unwrap(),
            AttributeValues::Integer(vec![1, 0])
        );
        assert_eq!(
            t.attribute(&[0, 1, 2], AtomAttribute::Fragment).unwrap(),
            AttributeValues::Integer(vec![0, 0, 1])
        );
        assert_eq!(
            t.attribute(&[0, 1], AtomAttribute::Beta).unwrap().to_tags(),
            vec![3, -2]
        );
        assert_eq!(
            t.attribute(&[0, 1, 2], AtomAttribute::Occupancy).unwrap().to_flags(),
            vec![false, true, true]
        );
    }

    #[test]
    fn out_of_range_atom_is_reported() {
        let t = trajectory();
        assert!(matches!(
            t.attribute(&[5], AtomAttribute::Beta),
            Err(ProviderError::AtomOutOfRange { index: 5, num_atoms: 3 })
        ));
    }

    #[test]
    fn coordinates_round_trip_through_buffer() {
        let mut t = trajectory();
        let mut buffer = Vec::new();
        t.read_coordinates(0, &mut buffer).unwrap();
        buffer[0] = 4.5;
        t.write_coordinates(0, &buffer).unwrap();
        assert_eq!(t.frames()[0].coords[0], 4.5);

        assert!(matches!(
            t.write_coordinates(0, &[1.0]),
            Err(ProviderError::CoordinateLength { .. })
        ));
        assert!(matches!(
            t.unit_cell(1),
            Err(ProviderError::FrameOutOfRange { frame: 1, num_frames: 1 })
        ));
    }

    #[test]
    fn selection_errors_are_forwarded() {
        let t = trajectory();
        assert_eq!(t.select("resname HOH").unwrap(), vec![2]);
        assert!(matches!(t.select("name ("), Err(ProviderError::Selection(_))));
    }
}
