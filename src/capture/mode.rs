//! Display modes known to the capture device

use std::fmt;
use std::time::Duration;

/// Four-character display mode code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModeId(pub u32);

impl ModeId {
    pub const fn from_fourcc(code: &[u8; 4]) -> Self {
        Self(u32::from_be_bytes(*code))
    }

    pub const NTSC: Self = Self::from_fourcc(b"ntsc");
    pub const PAL: Self = Self::from_fourcc(b"pal ");
    pub const HD720P50: Self = Self::from_fourcc(b"hp50");
    pub const HD720P5994: Self = Self::from_fourcc(b"hp59");
    pub const HD720P60: Self = Self::from_fourcc(b"hp60");
    pub const HD1080I50: Self = Self::from_fourcc(b"Hi50");
    pub const HD1080I5994: Self = Self::from_fourcc(b"Hi59");
    pub const HD1080P24: Self = Self::from_fourcc(b"24ps");
    pub const HD1080P25: Self = Self::from_fourcc(b"Hp25");
    pub const HD1080P2997: Self = Self::from_fourcc(b"Hp29");
    pub const HD1080P30: Self = Self::from_fourcc(b"Hp30");
    pub const HD1080P50: Self = Self::from_fourcc(b"Hp50");
    pub const HD1080P60: Self = Self::from_fourcc(b"Hp60");
    pub const UHD2160P25: Self = Self::from_fourcc(b"4k25");
    pub const UHD2160P30: Self = Self::from_fourcc(b"4k30");
    pub const UHD2160P50: Self = Self::from_fourcc(b"4k50");
    pub const UHD2160P60: Self = Self::from_fourcc(b"4k60");
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        write!(f, "{}", String::from_utf8_lossy(&bytes).trim_end())
    }
}

/// A video mode: geometry and frame rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMode {
    pub id: ModeId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Frame duration in `time_scale` units
    pub frame_duration: u32,
    pub time_scale: u32,
}

/// (id, name, width, height, frame duration, time scale)
const STANDARD_MODES: &[(ModeId, &str, u32, u32, u32, u32)] = &[
    (ModeId::NTSC, "NTSC", 720, 486, 1001, 30000),
    (ModeId::PAL, "PAL", 720, 576, 1000, 25000),
    (ModeId::HD720P50, "720p50", 1280, 720, 1000, 50000),
    (ModeId::HD720P5994, "720p59.94", 1280, 720, 1001, 60000),
    (ModeId::HD720P60, "720p60", 1280, 720, 1000, 60000),
    (ModeId::HD1080I50, "1080i50", 1920, 1080, 1000, 25000),
    (ModeId::HD1080I5994, "1080i59.94", 1920, 1080, 1001, 30000),
    (ModeId::HD1080P24, "1080p24", 1920, 1080, 1000, 24000),
    (ModeId::HD1080P25, "1080p25", 1920, 1080, 1000, 25000),
    (ModeId::HD1080P2997, "1080p29.97", 1920, 1080, 1001, 30000),
    (ModeId::HD1080P30, "1080p30", 1920, 1080, 1000, 30000),
    (ModeId::HD1080P50, "1080p50", 1920, 1080, 1000, 50000),
    (ModeId::HD1080P60, "1080p60", 1920, 1080, 1000, 60000),
    (ModeId::UHD2160P25, "2160p25", 3840, 2160, 1000, 25000),
    (ModeId::UHD2160P30, "2160p30", 3840, 2160, 1000, 30000),
    (ModeId::UHD2160P50, "2160p50", 3840, 2160, 1000, 50000),
    (ModeId::UHD2160P60, "2160p60", 3840, 2160, 1000, 60000),
];

impl DisplayMode {
    fn from_entry(entry: &(ModeId, &str, u32, u32, u32, u32)) -> Self {
        let (id, name, width, height, frame_duration, time_scale) = *entry;
        Self {
            id,
            name: name.to_string(),
            width,
            height,
            frame_duration,
            time_scale,
        }
    }

    /// Look up a standard mode by its code
    pub fn standard(id: ModeId) -> Option<Self> {
        STANDARD_MODES
            .iter()
            .find(|entry| entry.0 == id)
            .map(Self::from_entry)
    }

    /// Look up a standard mode by name, e.g. `1080p30` (case-insensitive)
    pub fn by_name(name: &str) -> Option<Self> {
        STANDARD_MODES
            .iter()
            .find(|entry| entry.1.eq_ignore_ascii_case(name))
            .map(Self::from_entry)
    }

    /// All standard modes
    pub fn all_standard() -> Vec<Self> {
        STANDARD_MODES.iter().map(Self::from_entry).collect()
    }

    /// Frames per second
    pub fn frame_rate(&self) -> f64 {
        self.time_scale as f64 / self.frame_duration as f64
    }

    /// Time between two frames
    pub fn frame_interval(&self) -> Duration {
        Duration::from_nanos(self.frame_duration as u64 * 1_000_000_000 / self.time_scale as u64)
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{})", self.name, self.width, self.height)
    }
}
