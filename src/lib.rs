//! deckview - capture card viewer
//!
//! Displays live video from a capture device and plays its audio, following
//! format changes of the input signal.

pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod render;
pub mod video;
pub mod viewer;

pub use error::{Result, ViewerError};
pub use viewer::{Viewer, ViewerState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
