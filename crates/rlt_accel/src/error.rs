use thiserror::Error;

/// Misuse of the index build protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccelError {
    #[error("Geometry was already registered with this index")]
    GeometryAlreadyRegistered,

    #[error("No geometry registered before build")]
    NoGeometry,

    #[error("Index was already built")]
    AlreadyBuilt,
}
