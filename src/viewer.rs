//! Viewer - wires a capture device, frame store, audio ring and render loop together

use crate::audio::{AudioRingBuffer, AudioSink, AudioSpec, PlaybackLoop};
use crate::capture::{
    negotiate, CaptureDevice, CaptureEventHandler, CaptureListener, DisplayMode, HandlerStats,
    VideoInputFlags,
};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::render::{Display, GpuBackend, RenderLoop, RenderStats};
use crate::video::{FrameStore, PixelFormat};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Pixel format requested before the first detected format
const INITIAL_PIXEL_FORMAT: PixelFormat = PixelFormat::Yuv8;

/// Viewer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    /// Negotiated, streams not started
    Ready,
    /// Streams running, render loop active
    Running,
    /// Capture torn down
    Stopped,
}

/// Capture viewer for a single device
pub struct Viewer {
    device: Arc<dyn CaptureDevice>,
    handler: Arc<CaptureEventHandler>,
    frames: Arc<FrameStore>,
    ring: Arc<AudioRingBuffer>,
    playback: Option<PlaybackLoop>,
    audio_spec: AudioSpec,
    start_mode: DisplayMode,
    input_flags: VideoInputFlags,
    stop_flag: Arc<AtomicBool>,
    state: ViewerState,
}

impl Viewer {
    /// Open audio output, negotiate with the device and register the handler
    ///
    /// Nothing is streaming when this returns.
    pub fn init<S, F>(device: Arc<dyn CaptureDevice>, config: &ViewerConfig, open_sink: F) -> Result<Self>
    where
        S: AudioSink + 'static,
        F: FnOnce(&AudioSpec) -> Result<S> + Send + 'static,
    {
        let audio_spec = config.audio_spec();
        audio_spec.validate()?;
        let initial_mode = config.initial_display_mode()?;

        info!("Initializing viewer for {}", device.info());

        let ring = Arc::new(AudioRingBuffer::new());
        let playback = PlaybackLoop::start(ring.clone(), audio_spec.clone(), open_sink)?;

        let start_mode = negotiate(device.as_ref(), initial_mode.id, INITIAL_PIXEL_FORMAT)?;

        let frames = Arc::new(FrameStore::new());
        let input_flags = VideoInputFlags::ENABLE_FORMAT_DETECTION;
        let handler = Arc::new(CaptureEventHandler::new(
            device.clone(),
            frames.clone(),
            ring.clone(),
            audio_spec.clone(),
            input_flags,
        ));
        device.set_listener(Some(handler.clone() as Arc<dyn CaptureListener>))?;

        debug!("Viewer ready: {} {}, audio {}", start_mode, INITIAL_PIXEL_FORMAT, audio_spec);

        Ok(Self {
            device,
            handler,
            frames,
            ring,
            playback: Some(playback),
            audio_spec,
            start_mode,
            input_flags,
            stop_flag: Arc::new(AtomicBool::new(false)),
            state: ViewerState::Ready,
        })
    }

    /// Start capture and run the render loop until it exits, then tear down
    pub fn run<D: Display, G: GpuBackend>(&mut self, render: &mut RenderLoop<D, G>) -> Result<RenderStats> {
        if self.state != ViewerState::Ready {
            return Err(ViewerError::capture("viewer already ran"));
        }

        // Reset before streams start so no captured packet is discarded
        self.ring.reset();

        if let Err(e) = self.start_capture() {
            error!("Failed to start capture: {}", e);
            self.shutdown();
            render.release();
            return Err(e);
        }

        self.state = ViewerState::Running;
        info!("Capture running on {}", self.device.info());

        let result = render.run();

        self.shutdown();
        render.release();
        result
    }

    fn start_capture(&self) -> Result<()> {
        self.device
            .enable_video_input(self.start_mode.id, INITIAL_PIXEL_FORMAT, self.input_flags)
            .map_err(|e| {
                ViewerError::capture(format!(
                    "failed to enable video input, is another application using the card? ({})",
                    e
                ))
            })?;

        self.device.enable_audio_input(&self.audio_spec).map_err(|e| {
            ViewerError::capture(format!(
                "failed to enable audio input, is another application using the card? ({})",
                e
            ))
        })?;

        self.device
            .start_streams()
            .map_err(|e| ViewerError::capture(format!("failed to start streams: {}", e)))
    }

    /// Stop playback, then streams and inputs, then unregister the handler
    pub fn shutdown(&mut self) {
        if self.state == ViewerState::Stopped {
            return;
        }

        info!("Stopping viewer...");
        self.stop_flag.store(true, Ordering::SeqCst);

        // Join playback before the capture side goes away
        if let Some(mut playback) = self.playback.take() {
            playback.stop();
        }

        if let Err(e) = self.device.stop_streams() {
            warn!("Failed to stop streams: {}", e);
        }
        if let Err(e) = self.device.disable_audio_input() {
            warn!("Failed to disable audio input: {}", e);
        }
        if let Err(e) = self.device.disable_video_input() {
            warn!("Failed to disable video input: {}", e);
        }
        if let Err(e) = self.device.set_listener(None) {
            warn!("Failed to unregister capture listener: {}", e);
        }

        let stats = self.handler.stats();
        info!(
            "Viewer stopped: {} frames, {} without signal, {} size mismatches, {} audio packets ({} overruns), {} reconfigurations",
            stats.frames_accepted,
            stats.frames_no_signal,
            stats.frames_size_mismatch,
            stats.audio_packets,
            self.ring.overruns(),
            stats.reconfigurations
        );

        self.state = ViewerState::Stopped;
    }

    /// Frame store shared with the render loop
    pub fn frames(&self) -> Arc<FrameStore> {
        self.frames.clone()
    }

    /// Flag that ends the render loop when set
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn handler_stats(&self) -> HandlerStats {
        self.handler.stats()
    }

    pub fn audio_spec(&self) -> &AudioSpec {
        &self.audio_spec
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
