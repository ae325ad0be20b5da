use thiserror::Error;

use super::config::ConfigError;
use super::provider::ProviderError;
use crate::core::geometry::BoxError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Selection '{selection}' matches no atoms")]
    EmptySelection { selection: String },

    #[error("Center selection '{selection}' matches no atoms")]
    EmptyCenterGroup { selection: String },

    #[error("illegal value of first_frame: {first} (trajectory has {num_frames} frames)")]
    InvalidFrameRange { first: usize, num_frames: usize },

    #[error("Invalid periodic box at frame {frame}: {source}")]
    Box {
        frame: usize,
        #[source]
        source: BoxError,
    },

    #[error("Block {block} contains no reference atoms")]
    NoReferenceAtoms { block: usize },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Coordinate buffer holds {found} values, expected {expected}")]
    BufferSize { expected: usize, found: usize },
}
