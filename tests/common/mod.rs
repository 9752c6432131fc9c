//! Shared helpers for integration tests

#![allow(dead_code)]

use deckview::audio::{AudioSink, AudioSpec};
use deckview::capture::{
    AudioPacket, CaptureDevice, CaptureListener, DeviceAttributes, DeviceInfo, DisplayMode, DuplexMode, ModeId,
    VideoInputFlags,
};
use deckview::video::PixelFormat;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Route tracing output through the test harness
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("deckview=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Capture device that records every command it receives
#[derive(Default)]
pub struct RecordingDevice {
    pub info: DeviceInfo,
    pub commands: Mutex<Vec<String>>,
    pub listener: Mutex<Option<Arc<dyn CaptureListener>>>,
    /// Audio delivered to the listener as soon as streams start
    pub audio_on_start: Option<Vec<u8>>,
}

impl RecordingDevice {
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    fn record(&self, command: impl Into<String>) {
        self.commands.lock().push(command.into());
    }
}

impl CaptureDevice for RecordingDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn attributes(&self) -> deckview::Result<DeviceAttributes> {
        Ok(DeviceAttributes {
            duplex: DuplexMode::Full,
            has_input: true,
            supports_format_detection: true,
        })
    }

    fn display_mode(&self, id: ModeId) -> Option<DisplayMode> {
        DisplayMode::standard(id)
    }

    fn supports_video_mode(&self, _: ModeId, _: PixelFormat) -> deckview::Result<bool> {
        Ok(true)
    }

    fn set_listener(&self, listener: Option<Arc<dyn CaptureListener>>) -> deckview::Result<()> {
        self.record(if listener.is_some() { "listen" } else { "unlisten" });
        *self.listener.lock() = listener;
        Ok(())
    }

    fn enable_video_input(&self, mode: ModeId, format: PixelFormat, _: VideoInputFlags) -> deckview::Result<()> {
        self.record(format!("enable video {} {}", mode, format));
        Ok(())
    }

    fn enable_audio_input(&self, spec: &AudioSpec) -> deckview::Result<()> {
        self.record(format!("enable audio {}", spec.bit_depth));
        Ok(())
    }

    fn start_streams(&self) -> deckview::Result<()> {
        self.record("start");
        let listener = self.listener.lock().clone();
        if let (Some(listener), Some(bytes)) = (listener, &self.audio_on_start) {
            let packet = AudioPacket {
                bytes,
                sample_frames: bytes.len() / AudioSpec::default().block_align(),
            };
            listener.on_frame_arrived(None, Some(&packet));
        }
        Ok(())
    }

    fn stop_streams(&self) -> deckview::Result<()> {
        self.record("stop");
        Ok(())
    }

    fn disable_video_input(&self) -> deckview::Result<()> {
        self.record("disable video");
        Ok(())
    }

    fn disable_audio_input(&self) -> deckview::Result<()> {
        self.record("disable audio");
        Ok(())
    }
}

/// Sink that keeps everything written to it
#[derive(Clone, Default)]
pub struct CollectingSink {
    pub data: Arc<Mutex<Vec<u8>>>,
    pub writes: Arc<AtomicU64>,
}

impl CollectingSink {
    pub fn bytes(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl AudioSink for CollectingSink {
    fn write(&mut self, data: &[u8]) -> deckview::Result<()> {
        self.data.lock().extend_from_slice(data);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
