//! Video frame formats and the shared frame store

mod format;
mod store;

pub use format::{frame_size_for_code, PixelFormat};
pub use store::{FrameBuffer, FrameGeometry, FrameStore};
