//! # pbcwrap Core Library
//!
//! Wrapping and unwrapping of molecular dynamics trajectories in orthorhombic
//! periodic boxes.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Topology`, `Frame`, `Trajectory`),
//!   periodic box geometry, the atom selection language and PDB trajectory I/O.
//!
//! - **[`engine`]: The Logic Core.** Block partitioning and the per-frame processor that
//!   folds molecules into the primary cell or removes image jumps between frames. It talks
//!   to trajectories only through the provider traits.
//!
//! - **[`workflows`]: The Public API.** Drives the engine over a frame range of a trajectory,
//!   with validation, logging and progress reporting.

pub mod core;
pub mod engine;
pub mod workflows;
