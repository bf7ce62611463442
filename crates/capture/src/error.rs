//! Capture error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No graphics adapters found")]
    NoAdapters,

    #[error("No display outputs found on the selected adapter")]
    NoOutputs,

    #[error("Capture initialization failed: {0}")]
    InitFailed(String),

    #[error("Zone registration failed: {0}")]
    ZoneRegistration(String),

    #[error("Frame capture failed: {0}")]
    CaptureFailed(String),

    #[error("Timeout waiting for frame")]
    Timeout,

    #[error("Unknown capture zone")]
    UnknownZone,

    #[error("Platform not supported")]
    UnsupportedPlatform,
}

pub type CaptureResult<T> = Result<T, CaptureError>;
