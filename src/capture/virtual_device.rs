//! Simulated capture device producing colour bars and a test tone
//!
//! Behaves like format-detecting capture hardware: once streams start it
//! reports the detected signal through a format-changed event, then delivers
//! frames and audio packets from its own thread at the signal's frame rate.

use crate::audio::AudioSpec;
use crate::capture::{
    AudioPacket, CaptureDevice, CaptureDriver, CaptureListener, DetectedFormatFlags,
    DeviceAttributes, DeviceInfo, DisplayMode, DuplexMode, FormatChangedEvents, ModeId,
    VideoFrame, VideoInputFlags,
};
use crate::error::{Result, ViewerError};
use crate::video::PixelFormat;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

/// Test tone frequency
const TONE_HZ: f64 = 1000.0;
/// Test tone amplitude (-20 dBFS)
const TONE_LEVEL: f64 = 0.1;

/// Configuration of one simulated device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualDeviceConfig {
    /// Display name
    pub name: String,
    /// Model name
    pub model: String,
    /// Display mode of the simulated input signal, e.g. "1080p30"
    pub signal_mode: String,
    /// RGB 4:4:4 signal instead of YCbCr 4:2:2
    pub rgb: bool,
    /// Signal bit depth (8, 10 or 12)
    pub depth: u8,
    /// Whether a signal is connected
    pub has_signal: bool,
    /// Report the device as inactive
    pub inactive: bool,
    /// Whether the device supports input format detection
    pub format_detection: bool,
}

impl Default for VirtualDeviceConfig {
    fn default() -> Self {
        Self {
            name: "Virtual Capture 1".to_string(),
            model: "Virtual DeckLink".to_string(),
            signal_mode: "1080p30".to_string(),
            rgb: false,
            depth: 8,
            has_signal: true,
            inactive: false,
            format_detection: true,
        }
    }
}

/// Input signal seen by the simulated device
#[derive(Debug, Clone)]
struct Signal {
    mode: DisplayMode,
    rgb: bool,
    depth: u8,
    present: bool,
}

impl Signal {
    fn pixel_format(&self) -> PixelFormat {
        match (self.rgb, self.depth) {
            (true, _) => PixelFormat::Rgb10,
            (false, 8) => PixelFormat::Yuv8,
            (false, _) => PixelFormat::Yuv10,
        }
    }

    fn flags(&self) -> DetectedFormatFlags {
        DetectedFormatFlags::for_signal(self.rgb, self.depth)
    }
}

struct DeviceState {
    listener: Option<Arc<dyn CaptureListener>>,
    video: Option<(DisplayMode, PixelFormat, VideoInputFlags)>,
    audio: Option<AudioSpec>,
    streaming: bool,
    signal: Signal,
    signal_reported: bool,
}

struct Shared {
    state: Mutex<DeviceState>,
    shutdown: AtomicBool,
    frames_delivered: AtomicU64,
}

/// What the worker does on its next iteration
enum Tick {
    Idle,
    FormatChange {
        listener: Arc<dyn CaptureListener>,
        events: FormatChangedEvents,
        mode: DisplayMode,
        flags: DetectedFormatFlags,
    },
    Frame {
        listener: Option<Arc<dyn CaptureListener>>,
        mode: DisplayMode,
        format: PixelFormat,
        audio: Option<AudioSpec>,
        signal_ok: bool,
    },
}

/// Simulated capture device
pub struct VirtualDevice {
    info: DeviceInfo,
    config: VirtualDeviceConfig,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl VirtualDevice {
    pub fn new(index: usize, config: VirtualDeviceConfig) -> Result<Self> {
        let mode = DisplayMode::by_name(&config.signal_mode).ok_or_else(|| {
            ViewerError::InvalidConfig(format!("unknown display mode '{}'", config.signal_mode))
        })?;
        if !matches!(config.depth, 8 | 10 | 12) {
            return Err(ViewerError::InvalidConfig(format!(
                "unsupported signal depth {}",
                config.depth
            )));
        }

        let signal = Signal {
            mode,
            rgb: config.rgb,
            depth: config.depth,
            present: config.has_signal,
        };

        Ok(Self {
            info: DeviceInfo {
                index,
                name: config.name.clone(),
                model: config.model.clone(),
            },
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(DeviceState {
                    listener: None,
                    video: None,
                    audio: None,
                    streaming: false,
                    signal,
                    signal_reported: false,
                }),
                shutdown: AtomicBool::new(false),
                frames_delivered: AtomicU64::new(0),
            }),
            worker: Mutex::new(None),
        })
    }

    /// Change the simulated input signal; reported on the next tick
    pub fn set_signal(&self, mode: ModeId, rgb: bool, depth: u8) -> Result<()> {
        let mode = DisplayMode::standard(mode)
            .ok_or_else(|| ViewerError::capture(format!("unknown display mode {}", mode)))?;
        let mut state = self.shared.state.lock();
        info!("Virtual signal on {} changed to {}", self.info.name, mode);
        state.signal = Signal {
            mode,
            rgb,
            depth,
            present: state.signal.present,
        };
        state.signal_reported = false;
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.state.lock().streaming
    }

    /// Frames handed to the listener so far
    pub fn frames_delivered(&self) -> u64 {
        self.shared.frames_delivered.load(Ordering::Relaxed)
    }

    fn ensure_worker(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let shared = self.shared.clone();
        let name = self.info.name.clone();
        *worker = Some(
            thread::Builder::new()
                .name("virtual-capture".into())
                .spawn(move || capture_thread(shared, name))?,
        );
        Ok(())
    }
}

impl CaptureDevice for VirtualDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn attributes(&self) -> Result<DeviceAttributes> {
        Ok(DeviceAttributes {
            duplex: if self.config.inactive {
                DuplexMode::Inactive
            } else {
                DuplexMode::Full
            },
            has_input: true,
            supports_format_detection: self.config.format_detection,
        })
    }

    fn display_mode(&self, id: ModeId) -> Option<DisplayMode> {
        DisplayMode::standard(id)
    }

    fn supports_video_mode(&self, mode: ModeId, _format: PixelFormat) -> Result<bool> {
        Ok(DisplayMode::standard(mode).is_some())
    }

    fn set_listener(&self, listener: Option<Arc<dyn CaptureListener>>) -> Result<()> {
        self.shared.state.lock().listener = listener;
        Ok(())
    }

    fn enable_video_input(&self, mode: ModeId, format: PixelFormat, flags: VideoInputFlags) -> Result<()> {
        let display_mode = DisplayMode::standard(mode)
            .ok_or_else(|| ViewerError::capture(format!("display mode {} not supported", mode)))?;

        let mut state = self.shared.state.lock();
        if state.streaming {
            return Err(ViewerError::capture("cannot enable video input while streaming"));
        }
        debug!("Video input enabled: {} {}", display_mode, format);
        state.video = Some((display_mode, format, flags));
        Ok(())
    }

    fn enable_audio_input(&self, spec: &AudioSpec) -> Result<()> {
        spec.validate()
            .map_err(|e| ViewerError::capture(format!("audio input rejected: {}", e)))?;
        debug!("Audio input enabled: {}", spec);
        self.shared.state.lock().audio = Some(spec.clone());
        Ok(())
    }

    fn start_streams(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            if state.video.is_none() {
                return Err(ViewerError::capture("video input not enabled"));
            }
            state.streaming = true;
        }
        self.ensure_worker()
    }

    fn stop_streams(&self) -> Result<()> {
        self.shared.state.lock().streaming = false;
        Ok(())
    }

    fn disable_video_input(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        state.streaming = false;
        state.video = None;
        Ok(())
    }

    fn disable_audio_input(&self) -> Result<()> {
        self.shared.state.lock().audio = None;
        Ok(())
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            // The last reference may be released from inside a callback
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// Decide the next action while holding the state lock
fn next_tick(state: &mut DeviceState) -> Tick {
    if !state.streaming {
        return Tick::Idle;
    }
    let Some((mode, format, flags)) = state.video.clone() else {
        return Tick::Idle;
    };

    let signal = &state.signal;
    let matches = signal.mode.id == mode.id && signal.pixel_format() == format;

    if flags.contains(VideoInputFlags::ENABLE_FORMAT_DETECTION)
        && signal.present
        && !state.signal_reported
    {
        if let Some(listener) = state.listener.clone() {
            state.signal_reported = true;
            let mut events = FormatChangedEvents::COLORSPACE_CHANGED;
            if signal.mode.id != mode.id {
                events |= FormatChangedEvents::DISPLAY_MODE_CHANGED;
            }
            return Tick::FormatChange {
                listener,
                events,
                mode: signal.mode.clone(),
                flags: signal.flags(),
            };
        }
    }

    Tick::Frame {
        listener: state.listener.clone(),
        mode,
        format,
        audio: state.audio.clone(),
        signal_ok: signal.present && matches,
    }
}

/// Capture thread function
fn capture_thread(shared: Arc<Shared>, name: String) {
    info!("Virtual capture thread started for: {}", name);

    let mut video_buffer: Vec<u8> = Vec::new();
    let mut pattern_key: Option<(ModeId, PixelFormat)> = None;
    let mut audio_buffer: Vec<u8> = Vec::new();
    let mut tone = ToneGenerator::new(TONE_HZ);
    let mut next_frame = Instant::now();

    while !shared.shutdown.load(Ordering::Relaxed) {
        let tick = next_tick(&mut shared.state.lock());

        match tick {
            Tick::Idle => {
                thread::sleep(Duration::from_millis(5));
                next_frame = Instant::now();
            }
            Tick::FormatChange {
                listener,
                events,
                mode,
                flags,
            } => {
                debug!("Reporting detected signal {} on {}", mode, name);
                listener.on_format_changed(events, &mode, flags);
            }
            Tick::Frame {
                listener,
                mode,
                format,
                audio,
                signal_ok,
            } => {
                if pattern_key != Some((mode.id, format)) {
                    video_buffer = color_bars(format, mode.width as usize, mode.height as usize);
                    pattern_key = Some((mode.id, format));
                }

                let frame = VideoFrame {
                    bytes: &video_buffer,
                    width: mode.width,
                    height: mode.height,
                    row_bytes: format.row_bytes(mode.width as usize),
                    no_input_source: !signal_ok,
                };

                let sample_frames = audio.as_ref().map(|spec| {
                    let sample_frames = (spec.sample_rate as u64 * mode.frame_duration as u64
                        / mode.time_scale as u64) as usize;
                    tone.fill(spec, sample_frames, &mut audio_buffer);
                    sample_frames
                });
                let packet = sample_frames.map(|sample_frames| AudioPacket {
                    bytes: &audio_buffer,
                    sample_frames,
                });

                if let Some(listener) = listener {
                    listener.on_frame_arrived(Some(&frame), packet.as_ref());
                    shared.frames_delivered.fetch_add(1, Ordering::Relaxed);
                    trace!("Delivered frame {}x{} {}", mode.width, mode.height, format);
                }

                next_frame += mode.frame_interval();
                let now = Instant::now();
                if next_frame > now {
                    thread::sleep(next_frame - now);
                } else if now - next_frame > mode.frame_interval() {
                    // Fell behind by more than a frame; don't try to catch up
                    next_frame = now;
                }
            }
        }
    }

    info!("Virtual capture thread stopped for: {}", name);
}

/// 75% colour bars as (Y, Cb, Cr)
const BARS_YCBCR: [(u8, u8, u8); 8] = [
    (180, 128, 128),
    (168, 44, 136),
    (145, 147, 44),
    (133, 63, 52),
    (63, 193, 204),
    (51, 109, 212),
    (28, 212, 120),
    (16, 128, 128),
];

/// 75% colour bars as (R, G, B)
const BARS_RGB: [(u8, u8, u8); 8] = [
    (191, 191, 191),
    (191, 191, 0),
    (0, 191, 191),
    (0, 191, 0),
    (191, 0, 191),
    (191, 0, 0),
    (0, 0, 191),
    (0, 0, 0),
];

fn bar_index(x: usize, width: usize) -> usize {
    (x * BARS_YCBCR.len() / width.max(1)).min(BARS_YCBCR.len() - 1)
}

/// Render a colour bar frame in the given packed format
pub fn color_bars(format: PixelFormat, width: usize, height: usize) -> Vec<u8> {
    let row_bytes = format.row_bytes(width);
    let mut row = vec![0u8; row_bytes];

    match format {
        PixelFormat::Yuv8 => {
            // 2vuy: Cb Y0 Cr Y1
            for (pair, chunk) in row.chunks_exact_mut(4).enumerate() {
                let (y, cb, cr) = BARS_YCBCR[bar_index(pair * 2, width)];
                chunk.copy_from_slice(&[cb, y, cr, y]);
            }
        }
        PixelFormat::Yuv10 => {
            // v210: six pixels per four little-endian words
            for (block, chunk) in row.chunks_exact_mut(16).enumerate() {
                let x = block * 6;
                if x >= width {
                    break;
                }
                let (y, cb, cr) = BARS_YCBCR[bar_index(x, width)];
                let (y, cb, cr) = ((y as u32) << 2, (cb as u32) << 2, (cr as u32) << 2);
                let words = [
                    cb | y << 10 | cr << 20,
                    y | cb << 10 | y << 20,
                    cr | y << 10 | cb << 20,
                    y | cr << 10 | y << 20,
                ];
                for (word, out) in words.iter().zip(chunk.chunks_exact_mut(4)) {
                    out.copy_from_slice(&word.to_le_bytes());
                }
            }
        }
        PixelFormat::Rgb10 => {
            // r210: big-endian 2:10:10:10
            for (x, chunk) in row.chunks_exact_mut(4).enumerate().take(width) {
                let (r, g, b) = BARS_RGB[bar_index(x, width)];
                let word = (r as u32) << 22 | (g as u32) << 12 | (b as u32) << 2;
                chunk.copy_from_slice(&word.to_be_bytes());
            }
        }
    }

    row.repeat(height)
}

/// Continuous-phase sine generator
struct ToneGenerator {
    frequency: f64,
    phase: f64,
}

impl ToneGenerator {
    fn new(frequency: f64) -> Self {
        Self {
            frequency,
            phase: 0.0,
        }
    }

    /// Fill `out` with `sample_frames` interleaved frames laid out as `spec` describes
    fn fill(&mut self, spec: &AudioSpec, sample_frames: usize, out: &mut Vec<u8>) {
        out.clear();
        let step = TAU * self.frequency / spec.sample_rate as f64;

        for _ in 0..sample_frames {
            let value = (self.phase.sin() * TONE_LEVEL * i32::MAX as f64) as i32;
            self.phase = (self.phase + step) % TAU;

            for _ in 0..spec.channels {
                match spec.bit_depth {
                    16 => out.extend_from_slice(&((value >> 16) as i16).to_le_bytes()),
                    _ => out.extend_from_slice(&(value >> 8).to_le_bytes()[..3]),
                }
            }
        }
    }
}

/// Driver enumerating simulated devices from configuration
pub struct VirtualDriver {
    configs: Vec<VirtualDeviceConfig>,
}

impl VirtualDriver {
    pub fn new(configs: &[VirtualDeviceConfig]) -> Self {
        Self {
            configs: configs.to_vec(),
        }
    }
}

impl CaptureDriver for VirtualDriver {
    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self
            .configs
            .iter()
            .enumerate()
            .map(|(index, config)| DeviceInfo {
                index,
                name: config.name.clone(),
                model: config.model.clone(),
            })
            .collect())
    }

    fn open(&self, name: &str) -> Result<Arc<dyn CaptureDevice>> {
        if self.configs.is_empty() {
            return Err(ViewerError::NoDevices);
        }

        let (index, config) = self
            .configs
            .iter()
            .enumerate()
            .find(|(_, config)| config.name == name)
            .ok_or_else(|| ViewerError::DeviceNotFound(name.to_string()))?;

        match VirtualDevice::new(index, config.clone()) {
            Ok(device) => {
                info!("Opened virtual device: {}", device.info());
                Ok(Arc::new(device))
            }
            Err(e) => {
                error!("Failed to open virtual device {}: {}", name, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_bars_sizes() {
        for format in [PixelFormat::Yuv8, PixelFormat::Yuv10, PixelFormat::Rgb10] {
            let frame = color_bars(format, 1920, 4);
            assert_eq!(frame.len(), format.frame_size(1920, 4));
        }
        assert_eq!(color_bars(PixelFormat::Yuv10, 1921, 2).len(), 41 * 128 * 2);
    }

    #[test]
    fn test_color_bars_yuv8_layout() {
        let frame = color_bars(PixelFormat::Yuv8, 16, 1);
        // First pair is white, last pair black
        assert_eq!(&frame[..4], &[128, 180, 128, 180]);
        assert_eq!(&frame[28..32], &[128, 16, 128, 16]);
    }

    #[test]
    fn test_tone_packet_size() {
        let mut tone = ToneGenerator::new(TONE_HZ);
        let mut out = Vec::new();
        tone.fill(&AudioSpec::new(2, 16), 1600, &mut out);
        assert_eq!(out.len(), 1600 * 4);
        tone.fill(&AudioSpec::new(2, 24), 1600, &mut out);
        assert_eq!(out.len(), 1600 * 6);
        assert!(out.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_driver_lookup() {
        let driver = VirtualDriver::new(&[VirtualDeviceConfig::default()]);
        assert_eq!(driver.devices().unwrap().len(), 1);
        assert!(driver.open("Virtual Capture 1").is_ok());
        assert!(matches!(
            driver.open("Missing"),
            Err(ViewerError::DeviceNotFound(_))
        ));
        assert!(matches!(
            VirtualDriver::new(&[]).open("x"),
            Err(ViewerError::NoDevices)
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = VirtualDeviceConfig {
            signal_mode: "999p".into(),
            ..Default::default()
        };
        assert!(matches!(
            VirtualDevice::new(0, config),
            Err(ViewerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_enable_requires_stopped_streams() {
        let device = VirtualDevice::new(0, VirtualDeviceConfig::default()).unwrap();
        assert!(device.start_streams().is_err());

        device
            .enable_video_input(ModeId::HD1080P30, PixelFormat::Yuv8, VideoInputFlags::empty())
            .unwrap();
        device.start_streams().unwrap();
        assert!(device.is_streaming());
        assert!(device
            .enable_video_input(ModeId::HD1080P30, PixelFormat::Yuv8, VideoInputFlags::empty())
            .is_err());

        device.stop_streams().unwrap();
        assert!(!device.is_streaming());
    }
}
