//! Render side: GPU upload contract, display abstraction and the render loop

mod display;
mod headless;
mod render_loop;

pub use display::{
    pick_monitor, Display, Key, Monitor, Rect, ViewState, DEFAULT_WINDOW_HEIGHT,
    DEFAULT_WINDOW_WIDTH,
};
pub use headless::{HeadlessBackend, HeadlessDisplay, UploadRecord};
pub use render_loop::{RenderLoop, RenderStats};

use crate::error::Result;
use crate::video::{FrameBuffer, PixelFormat};

/// Shader used to unpack a frame texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePath {
    /// 2vuy: one RGBA8 texel per two pixels
    Yuv8,
    /// v210: one RGB10_A2 texel per packed 32-bit word
    Yuv10,
}

impl DecodePath {
    /// Decode path for a pixel format; 10-bit RGB has none
    pub fn for_format(format: PixelFormat) -> Option<Self> {
        match format {
            PixelFormat::Yuv8 => Some(DecodePath::Yuv8),
            PixelFormat::Yuv10 => Some(DecodePath::Yuv10),
            PixelFormat::Rgb10 => None,
        }
    }
}

/// Raw frame bytes handed to the GPU, borrowed from the locked frame store
#[derive(Debug)]
pub struct TextureUpload<'a> {
    pub bytes: &'a [u8],
    pub decode: DecodePath,
    /// Logical texture width in 4-byte texels
    pub texture_width: u32,
    pub height: u32,
    /// Source frame width in pixels
    pub source_width: u32,
}

impl<'a> TextureUpload<'a> {
    /// Describe the upload for the current frame
    ///
    /// `None` when nothing has been captured yet or the format has no
    /// decode path.
    pub fn for_frame(frame: &'a FrameBuffer) -> Option<Self> {
        if frame.is_empty() {
            return None;
        }
        let format = frame.pixel_format();
        let decode = DecodePath::for_format(format)?;
        let width = frame.width() as usize;

        Some(Self {
            bytes: frame.bytes(),
            decode,
            texture_width: format.texture_width(width) as u32,
            height: frame.height(),
            source_width: frame.width(),
        })
    }

    /// Bytes the texture dimensions cover
    pub fn expected_len(&self) -> usize {
        self.texture_width as usize * 4 * self.height as usize
    }
}

/// Per-draw shader parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    pub decode: DecodePath,
    pub viewport: (u32, u32),
    pub source_size: (u32, u32),
    pub brightness: f32,
    /// Sample with interpolation because the image is scaled
    pub interpolate: bool,
    /// Clear the background first; blending is enabled otherwise
    pub clear: bool,
}

/// GPU collaborator owned by the render thread
pub trait GpuBackend {
    /// Build shaders and textures; failure is fatal
    fn prepare(&mut self) -> Result<()>;

    fn upload(&mut self, upload: &TextureUpload<'_>) -> Result<()>;

    fn draw(&mut self, params: &DrawParams) -> Result<()>;

    fn release(&mut self) {}
}
