use thiserror::Error;

use rlt_accel::AccelError;
use rlt_core::LoadError;
use rlt_guide::GuideError;

/// Errors that stop a render from starting or finishing.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Scene error: {0}")]
    Load(#[from] LoadError),

    #[error("Index error: {0}")]
    Accel(#[from] AccelError),

    #[error("Guider error: {0}")]
    Guide(#[from] GuideError),

    #[error("Integrator {0} requires a guider")]
    MissingGuider(&'static str),

    #[error("Invalid render settings: {0}")]
    InvalidConfig(String),

    #[error("Failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

pub type RenderResult<T> = Result<T, RenderError>;
