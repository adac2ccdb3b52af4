use thiserror::Error;

/// Failures surfaced to the caller of the engine lifecycle
#[derive(Debug, Error)]
pub enum EngineError {
    /// The audio sink could not be opened; the engine stays stopped
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The render thread could not be spawned
    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl EngineError {
    pub fn device_unavailable(reason: impl std::fmt::Display) -> Self {
        EngineError::DeviceUnavailable(reason.to_string())
    }
}
