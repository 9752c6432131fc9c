//! Pre-streaming checks against a freshly opened capture device

use crate::capture::{CaptureDevice, DisplayMode, DuplexMode, ModeId};
use crate::error::{Result, ViewerError};
use crate::video::PixelFormat;
use tracing::debug;

/// Verify the device can capture with format detection in the given start mode
///
/// Returns the start display mode. Nothing is enabled on the device.
pub fn negotiate(device: &dyn CaptureDevice, mode: ModeId, format: PixelFormat) -> Result<DisplayMode> {
    let name = &device.info().name;

    let attributes = device
        .attributes()
        .map_err(|_| ViewerError::AttributesUnavailable(name.clone()))?;
    debug!("Device {} attributes: {:?}", name, attributes);

    if attributes.duplex == DuplexMode::Inactive {
        return Err(ViewerError::DeviceInactive);
    }

    if !attributes.has_input {
        return Err(ViewerError::NoInputInterface);
    }

    if !attributes.supports_format_detection {
        return Err(ViewerError::FormatDetectionUnsupported);
    }

    let display_mode = device
        .display_mode(mode)
        .ok_or_else(|| ViewerError::DisplayModeUnavailable(mode.to_string()))?;

    let unsupported = || ViewerError::ModeNotSupported {
        mode: display_mode.name.clone(),
        format,
    };
    if !device.supports_video_mode(mode, format).map_err(|_| unsupported())? {
        return Err(unsupported());
    }

    debug!("Start mode {} with {} accepted", display_mode, format);
    Ok(display_mode)
}
