//! Capture event handler: format-change state machine and frame intake

use crate::audio::{AudioRingBuffer, AudioSpec};
use crate::capture::{
    AudioPacket, CaptureDevice, CaptureListener, DetectedFormatFlags, DisplayMode,
    FormatChangedEvents, VideoFrame, VideoInputFlags,
};
use crate::error::{Result, ViewerError};
use crate::video::{FrameStore, PixelFormat};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, trace, warn};

/// Negotiated capture state
///
/// Idle until the first confirmed format change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub pixel_format: PixelFormat,
    /// 8, 10 or 12
    pub depth: u8,
    pub mode: Option<DisplayMode>,
}

impl CaptureSession {
    fn idle() -> Self {
        Self {
            pixel_format: PixelFormat::Yuv8,
            depth: 8,
            mode: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.mode.is_some()
    }

    /// Frame dimensions, if a mode has been negotiated
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.mode.as_ref().map(|m| (m.width, m.height))
    }
}

/// Result of handling a format-changed event
#[derive(Debug)]
pub enum FormatTransition {
    /// No colour space could be resolved from the detected flags
    Ignored,
    /// Mode and resolved format unchanged, streams left running
    Unchanged,
    /// Buffers resized and streams restarted in the new format
    Reconfigured {
        pixel_format: PixelFormat,
        width: u32,
        height: u32,
        depth: u8,
    },
    /// Reconfiguration failed, streaming is stopped
    Failed(ViewerError),
}

impl FormatTransition {
    pub fn restarted(&self) -> bool {
        matches!(self, FormatTransition::Reconfigured { .. })
    }
}

/// Counters for frame intake
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerStats {
    pub frames_accepted: u64,
    pub frames_no_signal: u64,
    pub frames_size_mismatch: u64,
    pub frames_unallocated: u64,
    pub audio_packets: u64,
    pub reconfigurations: u64,
}

#[derive(Default)]
struct Counters {
    frames_accepted: AtomicU64,
    frames_no_signal: AtomicU64,
    frames_size_mismatch: AtomicU64,
    frames_unallocated: AtomicU64,
    audio_packets: AtomicU64,
    reconfigurations: AtomicU64,
}

/// Pixel format for a detected colour space at the given depth
///
/// 12-bit YCbCr is carried on the 10-bit path.
fn resolve_format(flags: DetectedFormatFlags, depth: u8) -> Option<PixelFormat> {
    if flags.contains(DetectedFormatFlags::RGB444) {
        Some(PixelFormat::Rgb10)
    } else if flags.contains(DetectedFormatFlags::YCBCR422) {
        Some(if depth == 8 {
            PixelFormat::Yuv8
        } else {
            PixelFormat::Yuv10
        })
    } else {
        None
    }
}

/// Reacts to capture events: owns the frame store writer side and drives
/// reconfiguration of the capture device.
pub struct CaptureEventHandler {
    device: Arc<dyn CaptureDevice>,
    frames: Arc<FrameStore>,
    audio: Arc<AudioRingBuffer>,
    audio_spec: AudioSpec,
    input_flags: VideoInputFlags,
    session: Mutex<CaptureSession>,
    counters: Counters,
}

impl CaptureEventHandler {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        frames: Arc<FrameStore>,
        audio: Arc<AudioRingBuffer>,
        audio_spec: AudioSpec,
        input_flags: VideoInputFlags,
    ) -> Self {
        Self {
            device,
            frames,
            audio,
            audio_spec,
            input_flags,
            session: Mutex::new(CaptureSession::idle()),
            counters: Counters::default(),
        }
    }

    /// Snapshot of the negotiated session
    pub fn session(&self) -> CaptureSession {
        self.session.lock().clone()
    }

    pub fn stats(&self) -> HandlerStats {
        let c = &self.counters;
        HandlerStats {
            frames_accepted: c.frames_accepted.load(Ordering::Relaxed),
            frames_no_signal: c.frames_no_signal.load(Ordering::Relaxed),
            frames_size_mismatch: c.frames_size_mismatch.load(Ordering::Relaxed),
            frames_unallocated: c.frames_unallocated.load(Ordering::Relaxed),
            audio_packets: c.audio_packets.load(Ordering::Relaxed),
            reconfigurations: c.reconfigurations.load(Ordering::Relaxed),
        }
    }

    /// Handle a format-changed notification
    pub fn handle_format_changed(
        &self,
        events: FormatChangedEvents,
        mode: &DisplayMode,
        flags: DetectedFormatFlags,
    ) -> FormatTransition {
        let mut session = self.session.lock();

        let mut format = session.pixel_format;
        let mut depth = session.depth;

        if events.contains(FormatChangedEvents::COLORSPACE_CHANGED) {
            if let Some(detected) = flags.depth() {
                depth = detected;
            }
            format = match resolve_format(flags, depth) {
                Some(format) => format,
                None => {
                    trace!("Format change without a known colour space ignored");
                    return FormatTransition::Ignored;
                }
            };
        }

        let mode_changed =
            events.contains(FormatChangedEvents::DISPLAY_MODE_CHANGED) || !session.is_active();
        if !mode_changed && format == session.pixel_format {
            trace!("Format change event with same mode and format");
            return FormatTransition::Unchanged;
        }

        info!(
            "Video format changed to {} {} {} bit",
            mode.name,
            if flags.contains(DetectedFormatFlags::RGB444) {
                "RGB"
            } else {
                "YUV"
            },
            depth
        );

        // Resize, zero and publish under the frame store lock before the
        // device is told to deliver the new format.
        if let Err(e) = self.frames.reconfigure(format, mode.width, mode.height) {
            error!("Failed to resize frame store: {}", e);
            return FormatTransition::Failed(e);
        }

        session.pixel_format = format;
        session.depth = depth;
        session.mode = Some(mode.clone());
        drop(session);

        self.counters.reconfigurations.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = self.restart_streams(mode, format) {
            error!("{}", e);
            return FormatTransition::Failed(e);
        }

        FormatTransition::Reconfigured {
            pixel_format: format,
            width: mode.width,
            height: mode.height,
            depth,
        }
    }

    /// Stop, re-enable in the new format, start
    ///
    /// The session keeps the attempted format when the device rejects it.
    fn restart_streams(&self, mode: &DisplayMode, format: PixelFormat) -> Result<()> {
        if let Err(e) = self.device.stop_streams() {
            warn!("Failed to stop streams: {}", e);
        }

        self.device
            .enable_video_input(mode.id, format, self.input_flags)
            .map_err(|e| ViewerError::Reconfigure(e.to_string()))?;

        self.device
            .start_streams()
            .map_err(|e| ViewerError::Reconfigure(format!("failed to restart streams: {}", e)))
    }

    /// Copy an arriving video frame into the frame store
    ///
    /// Returns whether the frame was stored.
    pub fn handle_video(&self, frame: &VideoFrame<'_>) -> bool {
        if frame.no_input_source {
            self.counters.frames_no_signal.fetch_add(1, Ordering::Relaxed);
            trace!("No input signal detected");
            return false;
        }

        let size = frame.reported_size();
        let Some(bytes) = frame.bytes.get(..size) else {
            warn!(
                "Video frame shorter than reported ({} < {} bytes), dropped",
                frame.bytes.len(),
                size
            );
            self.counters.frames_size_mismatch.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        match self.frames.write(bytes) {
            Ok(true) => {
                self.counters.frames_accepted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Ok(false) => {
                self.counters.frames_unallocated.fetch_add(1, Ordering::Relaxed);
                trace!("Frame arrived before format negotiation, dropped");
                false
            }
            Err(e) if e.is_recoverable() => {
                self.counters.frames_size_mismatch.fetch_add(1, Ordering::Relaxed);
                warn!("Dropped video frame: {}", e);
                false
            }
            Err(e) => {
                error!("Frame store write failed: {}", e);
                false
            }
        }
    }

    /// Push an arriving audio packet into the ring
    pub fn handle_audio(&self, packet: &AudioPacket<'_>) -> bool {
        let size = self.audio_spec.packet_bytes(packet.sample_frames);
        match packet.bytes.get(..size) {
            Some(bytes) => {
                self.audio.push(bytes);
                self.counters.audio_packets.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => {
                warn!(
                    "Audio packet shorter than reported ({} < {} bytes), dropped",
                    packet.bytes.len(),
                    size
                );
                false
            }
        }
    }
}

impl CaptureListener for CaptureEventHandler {
    fn on_format_changed(
        &self,
        events: FormatChangedEvents,
        mode: &DisplayMode,
        flags: DetectedFormatFlags,
    ) {
        let _ = self.handle_format_changed(events, mode, flags);
    }

    fn on_frame_arrived(&self, video: Option<&VideoFrame<'_>>, audio: Option<&AudioPacket<'_>>) {
        if let Some(frame) = video {
            self.handle_video(frame);
        }
        if let Some(packet) = audio {
            self.handle_audio(packet);
        }
    }
}
