use thiserror::Error;

/// Errors surfaced by the recorder and its audio inputs.
///
/// Only configuration-class errors ever reach the host from `start()`.
/// `SourceReadFailed` is produced by inputs and absorbed by the producer loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("source read failed: {0}")]
    SourceReadFailed(String),

    #[error("no active recording session")]
    NotRecording,

    #[error("timed out after draining {drained} of {requested} frames")]
    Timeout { drained: usize, requested: usize },

    #[error("failed to spawn thread: {0}")]
    ThreadSpawn(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl RecorderError {
    /// Whether this error means the stream could not be brought up.
    pub fn is_configuration_failure(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::DeviceNotAvailable
                | Self::InvalidConfiguration(_)
                | Self::ConfigurationFailed(_)
        )
    }
}
