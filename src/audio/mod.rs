//! Audio ring buffer, playback loop and output sinks

mod buffer;
mod playback;
mod sink;

pub use buffer::{AudioRingBuffer, AUDIO_SLOTS};
pub use playback::PlaybackLoop;
pub use sink::{AudioSink, PacedSink};

use crate::error::{Result, ViewerError};
use std::time::Duration;

/// Sample rate the capture device delivers audio at
pub const SAMPLE_RATE: u32 = 48_000;

/// PCM layout shared by the capture input and the audio sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl AudioSpec {
    pub fn new(channels: u16, bit_depth: u16) -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels,
            bit_depth,
        }
    }

    /// Check the layout is one the capture input and sinks can carry
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.bit_depth, 16 | 24) {
            return Err(ViewerError::AudioSink(format!(
                "unsupported sample depth {} (expected 16 or 24)",
                self.bit_depth
            )));
        }
        if self.channels == 0 {
            return Err(ViewerError::AudioSink("channel count must be non-zero".into()));
        }
        Ok(())
    }

    /// Bytes per interleaved sample frame
    pub fn block_align(&self) -> usize {
        self.channels as usize * (self.bit_depth as usize / 8)
    }

    /// Calculate bytes per second
    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.block_align()
    }

    /// Byte length of a packet holding `sample_frames` frames
    pub fn packet_bytes(&self, sample_frames: usize) -> usize {
        sample_frames * self.block_align()
    }

    /// Playback duration of `bytes` of PCM
    pub fn duration_of(&self, bytes: usize) -> Duration {
        let bps = self.bytes_per_second();
        if bps == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((bytes as u64 * 1_000_000_000) / bps as u64)
    }
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self::new(2, 16)
    }
}

impl std::fmt::Display for AudioSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}Hz {}ch {}bit",
            self.sample_rate, self.channels, self.bit_depth
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_bytes() {
        let spec = AudioSpec::new(2, 16);
        assert_eq!(spec.packet_bytes(1601), 1601 * 4);
        assert_eq!(AudioSpec::new(8, 24).packet_bytes(10), 10 * 8 * 3);
    }

    #[test]
    fn test_duration() {
        let spec = AudioSpec::default();
        assert_eq!(spec.duration_of(spec.bytes_per_second()), Duration::from_secs(1));
        assert_eq!(spec.duration_of(192), Duration::from_millis(1));
    }

    #[test]
    fn test_validate() {
        assert!(AudioSpec::new(2, 16).validate().is_ok());
        assert!(AudioSpec::new(2, 24).validate().is_ok());
        assert!(AudioSpec::new(2, 32).validate().is_err());
        assert!(AudioSpec::new(0, 16).validate().is_err());
    }
}
