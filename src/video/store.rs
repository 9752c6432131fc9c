//! Single-slot shared frame buffer between the capture callback and the render loop

use crate::error::{Result, ViewerError};
use crate::video::PixelFormat;
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Geometry of the frame currently held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// Bumped on every resize
    pub generation: u64,
}

/// Most recent video frame, sized for the negotiated format
///
/// `byte_size` always equals `pixel_format.frame_size(width, height)` and the
/// storage is never shorter than `byte_size`.
#[derive(Debug)]
pub struct FrameBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    byte_size: usize,
    generation: u64,
    frames_written: u64,
}

impl FrameBuffer {
    fn empty() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            pixel_format: PixelFormat::Yuv8,
            byte_size: 0,
            generation: 0,
            frames_written: 0,
        }
    }

    /// Frame bytes, exactly `byte_size` long
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.byte_size]
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Allocated storage in bytes
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Frames copied in since startup
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Whether no format has been negotiated yet
    pub fn is_empty(&self) -> bool {
        self.byte_size == 0
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry {
            width: self.width,
            height: self.height,
            pixel_format: self.pixel_format,
            generation: self.generation,
        }
    }
}

/// Lock-guarded frame buffer
///
/// Every access goes through a scoped lock so a reader never observes a
/// buffer whose declared geometry disagrees with its contents.
pub struct FrameStore {
    inner: Mutex<FrameBuffer>,
}

impl FrameStore {
    /// Create an empty store; nothing is allocated until the first format change
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FrameBuffer::empty()),
        }
    }

    /// Resize for a new format, zero-fill and publish the new geometry
    ///
    /// Returns the new byte size. A format/geometry that sizes to zero is
    /// rejected and the store is left untouched.
    pub fn reconfigure(&self, pixel_format: PixelFormat, width: u32, height: u32) -> Result<usize> {
        let size = pixel_format.frame_size(width as usize, height as usize);
        if size == 0 {
            return Err(ViewerError::Reconfigure(format!(
                "{} {}x{} has no usable frame size",
                pixel_format, width, height
            )));
        }

        let mut frame = self.inner.lock();
        frame.data.clear();
        frame.data.resize(size, 0);
        frame.width = width;
        frame.height = height;
        frame.pixel_format = pixel_format;
        frame.byte_size = size;
        frame.generation += 1;

        debug!(
            "Frame store resized to {}x{} {} ({} bytes)",
            width, height, pixel_format, size
        );

        Ok(size)
    }

    /// Copy an incoming frame over the stored one
    ///
    /// Returns `Ok(false)` if no format has been negotiated yet. Frames larger
    /// than the allocation are rejected without touching the stored frame.
    pub fn write(&self, bytes: &[u8]) -> Result<bool> {
        let mut frame = self.inner.lock();
        if frame.is_empty() {
            return Ok(false);
        }
        if bytes.len() > frame.byte_size {
            return Err(ViewerError::FrameSizeMismatch {
                allocated: frame.byte_size,
                incoming: bytes.len(),
            });
        }

        frame.data[..bytes.len()].copy_from_slice(bytes);
        frame.frames_written += 1;
        trace!("Stored frame of {} bytes", bytes.len());
        Ok(true)
    }

    /// Run `f` with the stored frame while holding the lock
    pub fn with_frame<R>(&self, f: impl FnOnce(&FrameBuffer) -> R) -> R {
        let frame = self.inner.lock();
        f(&frame)
    }

    /// Current geometry
    pub fn geometry(&self) -> FrameGeometry {
        self.inner.lock().geometry()
    }

    /// Copy of the stored bytes
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().bytes().to_vec()
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_empty() {
        let store = FrameStore::new();
        assert!(store.with_frame(|f| f.is_empty()));
        assert!(!store.write(&[1, 2, 3]).unwrap());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_reconfigure_sizes_and_zeroes() {
        let store = FrameStore::new();
        let size = store.reconfigure(PixelFormat::Yuv10, 1920, 1080).unwrap();

        assert_eq!(size, PixelFormat::Yuv10.frame_size(1920, 1080));
        store.with_frame(|f| {
            assert_eq!(f.byte_size(), size);
            assert!(f.capacity() >= f.byte_size());
            assert!(f.bytes().iter().all(|&b| b == 0));
            assert_eq!(f.generation(), 1);
        });
    }

    #[test]
    fn test_reconfigure_clears_previous_content() {
        let store = FrameStore::new();
        store.reconfigure(PixelFormat::Yuv8, 4, 2).unwrap();
        store.write(&[0xAA; 16]).unwrap();

        store.reconfigure(PixelFormat::Yuv8, 8, 2).unwrap();
        let bytes = store.snapshot();
        assert_eq!(bytes.len(), 32);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zero_size_rejected() {
        let store = FrameStore::new();
        store.reconfigure(PixelFormat::Yuv8, 4, 2).unwrap();

        let err = store.reconfigure(PixelFormat::Yuv8, 0, 1080).unwrap_err();
        assert!(matches!(err, ViewerError::Reconfigure(_)));
        assert_eq!(store.geometry().width, 4);
        assert_eq!(store.geometry().generation, 1);
    }

    #[test]
    fn test_oversized_frame_leaves_store_untouched() {
        let store = FrameStore::new();
        store.reconfigure(PixelFormat::Yuv8, 4, 2).unwrap();
        store.write(&[7u8; 16]).unwrap();

        let err = store.write(&[9u8; 17]).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::FrameSizeMismatch {
                allocated: 16,
                incoming: 17
            }
        ));
        assert_eq!(store.snapshot(), vec![7u8; 16]);
        assert_eq!(store.with_frame(|f| f.frames_written()), 1);
    }

    #[test]
    fn test_smaller_frame_overwrites_prefix() {
        let store = FrameStore::new();
        store.reconfigure(PixelFormat::Yuv8, 4, 1).unwrap();
        store.write(&[1u8; 8]).unwrap();
        store.write(&[2u8; 4]).unwrap();
        assert_eq!(store.snapshot(), vec![2, 2, 2, 2, 1, 1, 1, 1]);
    }

    #[test]
    fn test_reader_never_sees_torn_frame() {
        let store = Arc::new(FrameStore::new());
        store.reconfigure(PixelFormat::Yuv8, 64, 4).unwrap();

        let writer_store = store.clone();
        let writer = thread::spawn(move || {
            for i in 0..500u32 {
                let fill = (i % 251) as u8;
                writer_store.write(&[fill; 512]).unwrap();
            }
        });

        for _ in 0..500 {
            store.with_frame(|f| {
                let first = f.bytes()[0];
                assert!(f.bytes().iter().all(|&b| b == first));
            });
        }

        writer.join().unwrap();
    }
}
