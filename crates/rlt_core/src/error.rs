//! Errors raised while loading or assembling geometry.

use thiserror::Error;

/// Error type for geometry loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OBJ error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("No geometry found in {0}")]
    NoGeometry(String),

    #[error("Invalid index buffer: {0}")]
    InvalidIndices(String),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;
