use std::path::PathBuf;

use thiserror::Error;

/// Error type for guider configuration and persistence.
#[derive(Debug, Error)]
pub enum GuideError {
    #[error("Invalid guider configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt guide table {}: {reason}", .path.display())]
    CorruptTable { path: PathBuf, reason: String },

    #[error("Guider lifecycle violation: {0}")]
    Lifecycle(String),
}

/// Result type for guider operations.
pub type GuideResult<T> = Result<T, GuideError>;
