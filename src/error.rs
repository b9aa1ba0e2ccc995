use crate::session::SessionState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KioskError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Capture session error: {0}")]
    Session(#[from] SessionError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Please take a photo first")]
    PhotoMissing,

    #[error("System error: {message}")]
    System { message: String },
}

impl KioskError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Failures of the capture session and its collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Camera access denied: {details}")]
    PermissionDenied { details: String },

    #[error("No usable camera: {details}")]
    DeviceUnavailable { details: String },

    #[error("Capture session already holds a camera")]
    AlreadyActive,

    #[error("Surface did not become ready within {timeout_ms}ms")]
    BindTimeout { timeout_ms: u64 },

    #[error("Playback rejected: {details}")]
    PlaybackRejected { details: String },

    #[error("Camera not ready: {details}")]
    SurfaceNotReady { details: String },

    #[error("Failed to encode photo: {details}")]
    EncodeFailed { details: String },

    #[error("Operation not valid while session is {state:?}")]
    NotStreaming { state: SessionState },

    #[error("Capture session was torn down")]
    Cancelled,
}

impl SessionError {
    /// Acquisition failures move the session into the error state
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(
            self,
            SessionError::PermissionDenied { .. } | SessionError::DeviceUnavailable { .. }
        )
    }

    /// Failures that leave a streaming session intact and may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::SurfaceNotReady { .. }
                | SessionError::EncodeFailed { .. }
                | SessionError::BindTimeout { .. }
                | SessionError::PlaybackRejected { .. }
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, KioskError>;
