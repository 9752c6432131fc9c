//! Capture collaborator interfaces

use crate::audio::AudioSpec;
use crate::capture::{
    AudioPacket, DetectedFormatFlags, DisplayMode, FormatChangedEvents, ModeId, VideoFrame,
    VideoInputFlags,
};
use crate::error::Result;
use crate::video::PixelFormat;
use std::fmt;
use std::sync::Arc;

/// Information about a capture device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Enumeration index
    pub index: usize,
    /// Display name, used to select the device on the command line
    pub name: String,
    /// Hardware model name
    pub model: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.model)
    }
}

/// Duplex configuration reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplexMode {
    Full,
    Half,
    Simplex,
    Inactive,
}

/// Static device attributes checked before streaming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAttributes {
    pub duplex: DuplexMode,
    pub has_input: bool,
    pub supports_format_detection: bool,
}

/// Receiver of capture events
///
/// Called on the device's own thread. Implementations must return quickly
/// and must not block on consumers.
pub trait CaptureListener: Send + Sync {
    /// The incoming signal changed mode, colour space or depth
    fn on_format_changed(
        &self,
        events: FormatChangedEvents,
        mode: &DisplayMode,
        flags: DetectedFormatFlags,
    );

    /// A video frame and/or audio packet arrived
    fn on_frame_arrived(&self, video: Option<&VideoFrame<'_>>, audio: Option<&AudioPacket<'_>>);
}

/// An opened capture device
///
/// Commands take `&self` because they are issued both from the control
/// thread and from inside listener callbacks.
pub trait CaptureDevice: Send + Sync {
    fn info(&self) -> &DeviceInfo;

    fn attributes(&self) -> Result<DeviceAttributes>;

    /// Look up a display mode the device can capture
    fn display_mode(&self, id: ModeId) -> Option<DisplayMode>;

    fn supports_video_mode(&self, mode: ModeId, format: PixelFormat) -> Result<bool>;

    /// Register (or with `None`, release) the event listener
    fn set_listener(&self, listener: Option<Arc<dyn CaptureListener>>) -> Result<()>;

    fn enable_video_input(&self, mode: ModeId, format: PixelFormat, flags: VideoInputFlags) -> Result<()>;

    fn enable_audio_input(&self, spec: &AudioSpec) -> Result<()>;

    fn start_streams(&self) -> Result<()>;

    fn stop_streams(&self) -> Result<()>;

    fn disable_video_input(&self) -> Result<()>;

    fn disable_audio_input(&self) -> Result<()>;
}

/// Enumerates and opens capture devices
pub trait CaptureDriver {
    fn devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Open a device by display name
    fn open(&self, name: &str) -> Result<Arc<dyn CaptureDevice>>;
}
