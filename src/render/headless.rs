//! Window-less display and GPU backend
//!
//! Used when no windowing system is available and by the tests. The display
//! paces `present` at a fixed refresh rate; the backend checks every upload
//! against the texture contract instead of touching a GPU.

use crate::error::{Result, ViewerError};
use crate::render::{DecodePath, Display, DrawParams, GpuBackend, Key, Monitor, Rect, TextureUpload};
use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Display with a simulated window on a single simulated monitor
pub struct HeadlessDisplay {
    window: Rect,
    monitors: Vec<Monitor>,
    refresh: Duration,
    last_present: Option<Instant>,
    presented: u64,
    frame_limit: Option<u64>,
    scripted_keys: VecDeque<(u64, Key)>,
    should_close: bool,
    decorated: bool,
}

impl HeadlessDisplay {
    pub fn new(width: u32, height: u32, refresh_hz: u32) -> Self {
        let window = Rect::new(0, 0, width, height);
        Self {
            window,
            monitors: vec![Monitor {
                name: "Headless".to_string(),
                area: Rect::new(0, 0, width.max(1920), height.max(1080)),
            }],
            refresh: Duration::from_secs(1) / refresh_hz.max(1),
            last_present: None,
            presented: 0,
            frame_limit: None,
            scripted_keys: VecDeque::new(),
            should_close: false,
            decorated: true,
        }
    }

    /// Replace the simulated monitor layout
    pub fn with_monitors(mut self, monitors: Vec<Monitor>) -> Self {
        self.monitors = monitors;
        self
    }

    /// Close after presenting `frames` frames
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Deliver `key` on the first poll after `frame` frames were presented
    pub fn press_key_at(mut self, frame: u64, key: Key) -> Self {
        self.scripted_keys.push_back((frame, key));
        self
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn is_decorated(&self) -> bool {
        self.decorated
    }
}

impl Display for HeadlessDisplay {
    fn surface_size(&self) -> (u32, u32) {
        (self.window.width, self.window.height)
    }

    fn poll_events(&mut self) -> Vec<Key> {
        let mut keys = Vec::new();
        while let Some(&(frame, key)) = self.scripted_keys.front() {
            if frame > self.presented {
                break;
            }
            keys.push(key);
            self.scripted_keys.pop_front();
        }
        keys
    }

    fn should_close(&self) -> bool {
        self.should_close
    }

    fn set_should_close(&mut self, close: bool) {
        self.should_close = close;
    }

    fn window_rect(&self) -> Rect {
        self.window
    }

    fn set_window_rect(&mut self, rect: Rect) {
        debug!("Headless window set to {}", rect);
        self.window = rect;
    }

    fn set_decorated_floating(&mut self, decorated: bool) {
        self.decorated = decorated;
    }

    fn monitors(&self) -> Vec<Monitor> {
        self.monitors.clone()
    }

    fn present(&mut self) -> Result<()> {
        if let Some(last) = self.last_present {
            let due = last + self.refresh;
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
        }
        self.last_present = Some(Instant::now());
        self.presented += 1;

        if self.frame_limit.is_some_and(|limit| self.presented >= limit) {
            self.should_close = true;
        }
        Ok(())
    }
}

/// Summary of one texture upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub decode: DecodePath,
    pub texture_width: u32,
    pub height: u32,
    pub len: usize,
}

/// GPU backend that validates uploads and records draw parameters
#[derive(Default)]
pub struct HeadlessBackend {
    prepared: bool,
    fail_stage: Option<&'static str>,
    uploads: u64,
    draws: u64,
    last_upload: Option<UploadRecord>,
    last_draw: Option<DrawParams>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose `prepare` fails at the given shader stage
    pub fn failing(stage: &'static str) -> Self {
        Self {
            fail_stage: Some(stage),
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn last_upload(&self) -> Option<&UploadRecord> {
        self.last_upload.as_ref()
    }

    pub fn last_draw(&self) -> Option<&DrawParams> {
        self.last_draw.as_ref()
    }
}

impl GpuBackend for HeadlessBackend {
    fn prepare(&mut self) -> Result<()> {
        if let Some(stage) = self.fail_stage {
            return Err(ViewerError::Shader {
                stage,
                log: "headless backend configured to fail".to_string(),
            });
        }
        info!("Headless GPU backend ready");
        self.prepared = true;
        Ok(())
    }

    fn upload(&mut self, upload: &TextureUpload<'_>) -> Result<()> {
        if !self.prepared {
            return Err(ViewerError::Gpu("upload before prepare".into()));
        }
        if upload.bytes.len() != upload.expected_len() {
            return Err(ViewerError::Gpu(format!(
                "upload of {} bytes does not fill a {}x{} texture",
                upload.bytes.len(),
                upload.texture_width,
                upload.height
            )));
        }

        self.uploads += 1;
        self.last_upload = Some(UploadRecord {
            decode: upload.decode,
            texture_width: upload.texture_width,
            height: upload.height,
            len: upload.bytes.len(),
        });
        Ok(())
    }

    fn draw(&mut self, params: &DrawParams) -> Result<()> {
        if !self.prepared {
            return Err(ViewerError::Gpu("draw before prepare".into()));
        }
        self.draws += 1;
        self.last_draw = Some(*params);
        Ok(())
    }

    fn release(&mut self) {
        if self.prepared {
            debug!("Headless GPU backend released after {} draws", self.draws);
        }
        self.prepared = false;
    }
}
