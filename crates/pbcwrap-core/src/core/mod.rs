//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! - **Periodic geometry** ([`geometry`]) - Unit cells, validated orthorhombic boxes and
//!   the minimum-image shift functions used for wrapping and unwrapping.
//! - **Molecular representation** ([`models`]) - Topology, frames and in-memory trajectories.
//! - **File I/O** ([`io`]) - Trajectory file formats behind a common trait.
//! - **Atom selection** ([`selection`]) - A VMD-style selection language evaluated
//!   against a topology.

pub mod geometry;
pub mod io;
pub mod models;
pub mod selection;
