//! Data structures describing a molecular system and its trajectory.
//!
//! - [`topology`] holds the static per-atom records, bonds, and the residue and
//!   fragment groupings derived from them.
//! - [`frame`] holds one snapshot: unit cell plus flat coordinate buffer.
//! - [`trajectory`] ties one topology to an ordered list of frames.

use thiserror::Error;

pub mod frame;
pub mod topology;
pub mod trajectory;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Bond references atom {index}, but the system only has {num_atoms} atoms")]
    BondOutOfRange { index: usize, num_atoms: usize },

    #[error("Frame {frame} holds {found} coordinate values, expected {expected}")]
    FrameSize {
        frame: usize,
        expected: usize,
        found: usize,
    },
}
