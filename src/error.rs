//! Error types for chewsense

use thiserror::Error;

/// Errors that can occur while configuring or running a detection session
#[derive(Debug, Error)]
pub enum ChewError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Detector initialization failed: {0}")]
    DetectorInit(String),

    #[error("Detector used before its weights were loaded")]
    DetectorNotReady,

    #[error("Face detection failed: {0}")]
    Detection(String),

    #[error("Camera unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Session task failed: {0}")]
    SessionTask(String),
}
