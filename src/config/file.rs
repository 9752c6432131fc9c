//! Viewer configuration file support

use crate::audio::{AudioSpec, SAMPLE_RATE};
use crate::capture::{DisplayMode, VirtualDeviceConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File name looked up next to the executable
const LOCAL_CONFIG_NAME: &str = "deckview.toml";

/// Viewer configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Initial window width
    pub window_width: u32,

    /// Initial window height
    pub window_height: u32,

    /// Brightness change per keypad +/- press
    pub brightness_step: f32,

    /// Display refresh rate used to pace the render loop
    pub refresh_hz: u32,

    /// Audio channel count
    pub audio_channels: u16,

    /// Audio sample depth in bits (16 or 24)
    pub audio_bit_depth: u16,

    /// Audio sample rate (only 48000 is supported)
    pub sample_rate: u32,

    /// Display mode used until the first detected format, e.g. "1080p30"
    pub initial_mode: String,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log file path (empty = no file logging)
    #[serde(default)]
    pub log_file: String,

    /// Simulated capture devices
    pub virtual_devices: Vec<VirtualDeviceConfig>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_width: 1920,
            window_height: 1080,
            brightness_step: 0.25,
            refresh_hz: 60,
            audio_channels: 2,
            audio_bit_depth: 16,
            sample_rate: SAMPLE_RATE,
            initial_mode: "1080p30".to_string(),
            log_level: "info".to_string(),
            log_file: String::new(),
            virtual_devices: vec![VirtualDeviceConfig::default()],
        }
    }
}

impl ViewerConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        config.validate()?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration from an explicit path or the default locations
    ///
    /// Searches in order:
    /// 1. The explicit path, which must exist
    /// 2. Same directory as executable: deckview.toml
    /// 3. User config directory: deckview/config.toml
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        for candidate in Self::default_locations() {
            if candidate.exists() {
                return Self::load(&candidate);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Candidate configuration paths, most specific first
    pub fn default_locations() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                paths.push(exe_dir.join(LOCAL_CONFIG_NAME));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("deckview").join("config.toml"));
        }

        paths
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        // Create parent directories if needed
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_string_lossy().to_string(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::Invalid("window size must be non-zero".into()));
        }
        if self.brightness_step.is_nan() || self.brightness_step <= 0.0 {
            return Err(ConfigError::Invalid("brightness_step must be positive".into()));
        }
        if self.refresh_hz == 0 {
            return Err(ConfigError::Invalid("refresh_hz must be non-zero".into()));
        }
        if self.sample_rate != SAMPLE_RATE {
            return Err(ConfigError::Invalid(format!(
                "sample_rate {} unsupported, capture audio is {} Hz",
                self.sample_rate, SAMPLE_RATE
            )));
        }
        self.audio_spec()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.initial_display_mode()?;
        Ok(())
    }

    /// Audio format requested from the capture device and sink
    pub fn audio_spec(&self) -> AudioSpec {
        AudioSpec::new(self.audio_channels, self.audio_bit_depth)
    }

    /// Display mode used for device negotiation
    pub fn initial_display_mode(&self) -> Result<DisplayMode, ConfigError> {
        DisplayMode::by_name(&self.initial_mode)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown initial_mode '{}'", self.initial_mode)))
    }

    /// Log file path, if file logging is enabled
    pub fn log_file(&self) -> Option<&str> {
        if self.log_file.is_empty() {
            None
        } else {
            Some(&self.log_file)
        }
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# deckview configuration

# Initial window size
window_width = 1920
window_height = 1080

# Brightness change per keypad +/- press (default: 0.25)
brightness_step = 0.25

# Display refresh rate in Hz (default: 60)
refresh_hz = 60

# Audio capture format (only 48000 Hz; 16 or 24 bit)
audio_channels = 2
audio_bit_depth = 16
sample_rate = 48000

# Display mode used until the input format is detected
initial_mode = "1080p30"

# Log level: trace, debug, info, warn, error (default: info)
log_level = "info"

# Log file path (empty = no file logging)
log_file = ""

# Simulated capture devices
[[virtual_devices]]
name = "Virtual Capture 1"
model = "Virtual DeckLink"
signal_mode = "1080p30"
rgb = false
depth = 8
has_signal = true
inactive = false
format_detection = true
"#
        .to_string()
    }
}

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading/writing config file
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Error parsing TOML
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    /// Error serializing config
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    /// Value out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
