//! Audio backend error types

use thiserror::Error;

/// Errors that can occur during backend voice operations
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio output devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Failed to get default device
    #[error("Failed to get default audio device: {0}")]
    NoDefaultDevice(String),

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build an output stream for a voice
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/resume an output stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Device sample format the backend cannot drive
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Backend is present but cannot create voices right now
    #[error("Audio backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Result type for audio backend operations
pub type AudioResult<T> = Result<T, AudioError>;
