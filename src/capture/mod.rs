//! Capture device interfaces, format-change handling and a virtual device

mod device;
mod flags;
mod handler;
mod mode;
mod negotiate;
pub mod virtual_device;

pub use device::{
    CaptureDevice, CaptureDriver, CaptureListener, DeviceAttributes, DeviceInfo, DuplexMode,
};
pub use flags::{DetectedFormatFlags, FormatChangedEvents, VideoInputFlags};
pub use handler::{CaptureEventHandler, CaptureSession, FormatTransition, HandlerStats};
pub use mode::{DisplayMode, ModeId};
pub use negotiate::negotiate;
pub use virtual_device::{VirtualDevice, VirtualDeviceConfig, VirtualDriver};

/// A captured video frame as delivered by the device
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame<'a> {
    pub bytes: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes per row as reported by the hardware
    pub row_bytes: usize,
    /// Set when the device has no signal on its input
    pub no_input_source: bool,
}

impl VideoFrame<'_> {
    /// Size of the frame as reported by the hardware
    pub fn reported_size(&self) -> usize {
        self.row_bytes * self.height as usize
    }
}

/// A captured audio packet
#[derive(Debug, Clone, Copy)]
pub struct AudioPacket<'a> {
    pub bytes: &'a [u8],
    pub sample_frames: usize,
}
