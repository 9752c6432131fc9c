//! Render loop: per-refresh upload of the latest frame and draw

use crate::error::Result;
use crate::render::{DecodePath, Display, DrawParams, GpuBackend, Key, Rect, TextureUpload, ViewState};
use crate::video::FrameStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Iterations of the loop
    pub refreshes: u64,
    /// Iterations that uploaded and drew a frame
    pub frames_drawn: u64,
    /// Window resizes following a new frame geometry
    pub resizes: u64,
}

/// Drives the display and GPU backend from the frame store
pub struct RenderLoop<D: Display, G: GpuBackend> {
    display: D,
    backend: G,
    frames: Arc<FrameStore>,
    view: ViewState,
    stop_flag: Arc<AtomicBool>,
    seen_generation: u64,
    stats: RenderStats,
}

impl<D: Display, G: GpuBackend> RenderLoop<D, G> {
    /// Prepare the GPU backend; a failure here is fatal
    pub fn new(
        display: D,
        mut backend: G,
        frames: Arc<FrameStore>,
        brightness_step: f32,
        stop_flag: Arc<AtomicBool>,
    ) -> Result<Self> {
        backend.prepare()?;

        Ok(Self {
            display,
            backend,
            frames,
            view: ViewState::new(brightness_step),
            stop_flag,
            seen_generation: 0,
            stats: RenderStats::default(),
        })
    }

    /// Run until the window closes or a stop is requested
    pub fn run(&mut self) -> Result<RenderStats> {
        info!("Render loop started");

        while !self.display.should_close() {
            if self.stop_flag.load(Ordering::SeqCst) {
                info!("Stop requested");
                break;
            }

            self.render_frame()?;
            self.display.present()?;

            for key in self.display.poll_events() {
                self.handle_key(key);
            }
        }

        info!(
            "Render loop stopped after {} refreshes ({} frames drawn)",
            self.stats.refreshes, self.stats.frames_drawn
        );
        Ok(self.stats)
    }

    /// Upload and draw the most recent frame
    ///
    /// Returns `false` when there was nothing to draw.
    pub fn render_frame(&mut self) -> Result<bool> {
        self.stats.refreshes += 1;
        self.follow_geometry();

        let viewport = self.display.surface_size();
        let backend = &mut self.backend;

        // Upload under the store lock; draw after releasing it
        let uploaded = self.frames.with_frame(|frame| -> Result<Option<(DecodePath, (u32, u32))>> {
            let Some(upload) = TextureUpload::for_frame(frame) else {
                return Ok(None);
            };
            backend.upload(&upload)?;
            Ok(Some((upload.decode, (frame.width(), frame.height()))))
        })?;

        let Some((decode, source_size)) = uploaded else {
            return Ok(false);
        };

        let params = DrawParams {
            decode,
            viewport,
            source_size,
            brightness: self.view.brightness,
            interpolate: viewport != source_size,
            clear: self.view.clear,
        };
        self.backend.draw(&params)?;
        self.stats.frames_drawn += 1;
        trace!("Drew {}x{} into {}x{}", source_size.0, source_size.1, viewport.0, viewport.1);

        Ok(true)
    }

    /// Resize the window when the capture side publishes a new geometry
    fn follow_geometry(&mut self) {
        let geometry = self.frames.geometry();
        if geometry.generation == self.seen_generation || geometry.width == 0 {
            return;
        }
        self.seen_generation = geometry.generation;

        if self.view.is_fullscreen() {
            return;
        }

        let window = self.display.window_rect();
        self.display
            .set_window_rect(Rect::new(window.x, window.y, geometry.width, geometry.height));
        self.stats.resizes += 1;
        info!(
            "Window resized to {}x{} for {}",
            geometry.width, geometry.height, geometry.pixel_format
        );
    }

    fn handle_key(&mut self, key: Key) {
        let geometry = self.frames.geometry();
        let frame_size = (geometry.width > 0).then_some((geometry.width, geometry.height));

        self.view.handle_key(key, &mut self.display, frame_size);
        debug!(
            "Key {:?}: brightness {:.2}, clear {}, fullscreen {}",
            key,
            self.view.brightness,
            self.view.clear,
            self.view.is_fullscreen()
        );
    }

    /// Release GPU resources
    pub fn release(&mut self) {
        self.backend.release();
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn backend(&self) -> &G {
        &self.backend
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }
}
