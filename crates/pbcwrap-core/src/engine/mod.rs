//! # Engine Module
//!
//! The wrapping engine: everything between a resolved selection and a rewritten
//! coordinate buffer.
//!
//! - **Configuration** ([`config`]) - run mode, block grouping, reference atoms and frame range
//! - **Partitioning** ([`partition`]) - splits the selection into rigid blocks
//! - **Processing** ([`processor`]) - wraps or unwraps one frame in place
//! - **Providers** ([`provider`]) - traits through which trajectories are read and written
//! - **Progress Monitoring** ([`progress`]) - fire-and-forget progress callbacks
//! - **Error Handling** ([`error`]) - engine-level error type

pub mod config;
pub mod error;
pub mod partition;
pub mod processor;
pub mod progress;
pub mod provider;
