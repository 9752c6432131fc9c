//! Packed pixel formats and frame sizing

use std::fmt;

/// Horizontal pixels packed into one 10-bit YUV group
const YUV10_GROUP_PIXELS: usize = 48;
/// Bytes per 10-bit YUV group (per row)
const YUV10_GROUP_BYTES: usize = 128;
/// Horizontal pixels packed into one 10-bit RGB group
const RGB10_GROUP_PIXELS: usize = 64;
/// Bytes per 10-bit RGB group (per row)
const RGB10_GROUP_BYTES: usize = 256;
/// Bytes per texel of the upload textures (RGBA8 or RGB10_A2)
const TEXEL_BYTES: usize = 4;

/// Packed pixel layouts delivered by the capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit 4:2:2 YCbCr, `2vuy`
    Yuv8,
    /// 10-bit 4:2:2 YCbCr, `v210`
    Yuv10,
    /// 10-bit 4:4:4 RGB, `r210` (sized but not drawn)
    Rgb10,
}

impl PixelFormat {
    /// FourCC code used by the capture SDK for 8-bit YUV
    pub const CODE_YUV8: u32 = u32::from_be_bytes(*b"2vuy");
    /// FourCC code used by the capture SDK for 10-bit YUV
    pub const CODE_YUV10: u32 = u32::from_be_bytes(*b"v210");
    /// FourCC code used by the capture SDK for 10-bit RGB
    pub const CODE_RGB10: u32 = u32::from_be_bytes(*b"r210");

    /// Map a raw SDK format code to a known format
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            Self::CODE_YUV8 => Some(Self::Yuv8),
            Self::CODE_YUV10 => Some(Self::Yuv10),
            Self::CODE_RGB10 => Some(Self::Rgb10),
            _ => None,
        }
    }

    /// Raw SDK format code
    pub fn code(self) -> u32 {
        match self {
            Self::Yuv8 => Self::CODE_YUV8,
            Self::Yuv10 => Self::CODE_YUV10,
            Self::Rgb10 => Self::CODE_RGB10,
        }
    }

    /// Bytes in one packed row of `width` pixels
    pub fn row_bytes(self, width: usize) -> usize {
        match self {
            Self::Yuv8 => width * 2,
            Self::Yuv10 => width.div_ceil(YUV10_GROUP_PIXELS) * YUV10_GROUP_BYTES,
            Self::Rgb10 => width.div_ceil(RGB10_GROUP_PIXELS) * RGB10_GROUP_BYTES,
        }
    }

    /// Exact byte size of one packed frame
    pub fn frame_size(self, width: usize, height: usize) -> usize {
        self.row_bytes(width) * height
    }

    /// Width in texels of the texture a frame of `width` pixels is uploaded to
    ///
    /// 8-bit YUV packs two pixels into one BGRA texel; the 10-bit layouts are
    /// uploaded as raw 32-bit words and unpacked in the shader.
    pub fn texture_width(self, width: usize) -> usize {
        match self {
            Self::Yuv8 => width / 2,
            Self::Yuv10 | Self::Rgb10 => self.row_bytes(width) / TEXEL_BYTES,
        }
    }

    /// Whether the render loop has a decode path for this format
    pub fn is_renderable(self) -> bool {
        !matches!(self, Self::Rgb10)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Yuv8 => "8-bit YUV",
            Self::Yuv10 => "10-bit YUV",
            Self::Rgb10 => "10-bit RGB",
        };
        f.write_str(name)
    }
}

/// Frame size for a raw SDK format code
///
/// Returns 0 for codes this viewer cannot size, which callers treat as a
/// failed reconfiguration rather than allocating.
pub fn frame_size_for_code(code: u32, width: usize, height: usize) -> usize {
    PixelFormat::from_code(code)
        .map(|format| format.frame_size(width, height))
        .unwrap_or(0)
}
