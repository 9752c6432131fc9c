//! Unified error types for deckview

use thiserror::Error;

use crate::video::PixelFormat;

/// Main error type for deckview operations
#[derive(Error, Debug)]
pub enum ViewerError {
    /// No capture devices are present at all
    #[error("No capture devices found")]
    NoDevices,

    /// Named device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Device attributes could not be read
    #[error("Unable to get attributes of device '{0}'")]
    AttributesUnavailable(String),

    /// Device is present but not active
    #[error("The selected capture device is inactive")]
    DeviceInactive,

    /// Device has no capture side
    #[error("The selected device does not have an input interface")]
    NoInputInterface,

    /// Device cannot report signal format changes
    #[error("Format detection is not supported on this device")]
    FormatDetectionUnsupported,

    /// Startup display mode missing from the device
    #[error("Unable to get display mode {0}")]
    DisplayModeUnavailable(String),

    /// Display mode rejected for the given pixel format
    #[error("The display mode {mode} is not supported with pixel format {format}")]
    ModeNotSupported { mode: String, format: PixelFormat },

    /// Capture collaborator rejected a command
    #[error("Capture command failed: {0}")]
    Capture(String),

    /// Stream restart after a format change failed
    #[error("Failed to switch video mode: {0}")]
    Reconfigure(String),

    /// Incoming frame larger than the allocated frame store
    #[error("Frame size mismatch - allocated: {allocated}, incoming: {incoming}")]
    FrameSizeMismatch { allocated: usize, incoming: usize },

    /// Audio output could not be opened or written
    #[error("Audio sink error: {0}")]
    AudioSink(String),

    /// Shader compile or link failure
    #[error("Failed to {stage} shader:\n{log}")]
    Shader { stage: &'static str, log: String },

    /// GPU upload or draw failure
    #[error("GPU error: {0}")]
    Gpu(String),

    /// Configuration file could not be loaded
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Thread communication error
    #[error("Thread communication error: {0}")]
    ChannelError(String),

    /// Underlying IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for deckview operations
pub type Result<T> = std::result::Result<T, ViewerError>;

impl ViewerError {
    /// Create a capture command error with context
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    /// Check if this error is recoverable without restarting the viewer
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ViewerError::FrameSizeMismatch { .. } | ViewerError::Reconfigure(_)
        )
    }
}
