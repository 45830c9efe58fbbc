use thiserror::Error;

/// Errors raised while building scene objects.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("invalid medium: {0}")]
    InvalidMedium(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid emission: {0}")]
    InvalidEmission(String),

    #[error("invalid camera: {0}")]
    InvalidCamera(String),

    #[error("scene has no camera")]
    MissingCamera,

    #[error("scene already has an environment light")]
    DuplicateEnvironment,
}
