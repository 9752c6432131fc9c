//! Audio output sinks

use crate::audio::AudioSpec;
use crate::error::Result;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Destination for raw interleaved PCM
///
/// `write` may block until the device has accepted the data; the playback
/// loop relies on that for pacing.
pub trait AudioSink {
    fn write(&mut self, data: &[u8]) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Sink that discards audio at the rate a real device would consume it
pub struct PacedSink {
    spec: AudioSpec,
    started: Option<Instant>,
    played: Duration,
    bytes_written: u64,
}

impl PacedSink {
    pub fn open(spec: &AudioSpec) -> Result<Self> {
        spec.validate()?;
        info!("Audio output opened: {}", spec);
        Ok(Self {
            spec: spec.clone(),
            started: None,
            played: Duration::ZERO,
            bytes_written: 0,
        })
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl AudioSink for PacedSink {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.played += self.spec.duration_of(data.len());
        self.bytes_written += data.len() as u64;

        // Block until the "device" has played everything written so far
        let deadline = started + self.played;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        debug!("Audio output closed after {} bytes", self.bytes_written);
        Ok(())
    }
}
