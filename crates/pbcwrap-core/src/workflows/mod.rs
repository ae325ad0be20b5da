//! # Workflows Module
//!
//! Top-level entry points that run the engine over a whole trajectory.
//!
//! - **Wrap Workflow** ([`wrap`]) - wraps or unwraps a frame range, sequentially through the
//!   provider traits or in parallel over an in-memory [`Trajectory`](crate::core::models::trajectory::Trajectory).

pub mod wrap;
