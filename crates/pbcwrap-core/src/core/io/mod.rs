//! Reading and writing trajectory files.
//!
//! The [`traits::TrajectoryFile`] trait defines a format-independent interface over
//! in-memory [`Trajectory`](crate::core::models::trajectory::Trajectory) values;
//! [`pdb`] implements it for multi-model PDB files.

pub mod pdb;
pub mod traits;
