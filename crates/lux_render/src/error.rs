use lux_tracer::SceneError;
use thiserror::Error;

/// Failures while setting up a render. Rendering itself never fails.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid renderer configuration: {0}")]
    InvalidConfig(String),

    #[error("camera resolution {camera_width}x{camera_height} does not match framebuffer {width}x{height}")]
    ResolutionMismatch {
        camera_width: u32,
        camera_height: u32,
        width: u32,
        height: u32,
    },

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("failed to parse renderer configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
