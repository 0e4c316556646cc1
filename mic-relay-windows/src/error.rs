use mic_relay_core::models::error::RecorderError;
use thiserror::Error;

/// Failures from the WASAPI and COM calls behind `WasapiInput`.
#[derive(Debug, Error)]
pub enum WasapiError {
    #[error("{call} failed: {source}")]
    Call {
        call: &'static str,
        #[source]
        source: windows::core::Error,
    },

    #[error("audio endpoint not found")]
    DeviceNotFound,

    #[error("microphone access is disabled in privacy settings")]
    AccessDenied,

    #[error("capture thread exited before reporting its stream")]
    ThreadExited,
}

impl From<WasapiError> for RecorderError {
    fn from(err: WasapiError) -> Self {
        match err {
            WasapiError::DeviceNotFound => RecorderError::DeviceNotAvailable,
            WasapiError::AccessDenied => RecorderError::PermissionDenied,
            WasapiError::ThreadExited => RecorderError::Unknown(err.to_string()),
            WasapiError::Call { .. } => RecorderError::ConfigurationFailed(err.to_string()),
        }
    }
}

/// Names the failing Win32 call on a `windows::core::Result`.
pub(crate) trait CallContext<T> {
    fn call(self, call: &'static str) -> Result<T, WasapiError>;
}

impl<T> CallContext<T> for windows::core::Result<T> {
    fn call(self, call: &'static str) -> Result<T, WasapiError> {
        self.map_err(|source| WasapiError::Call { call, source })
    }
}
