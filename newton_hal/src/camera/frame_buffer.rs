//! Shared frame buffer guarded by a single lock.
//!
//! The lock covers the output dimensions, the pixel storage, the frame
//! sequence number and the pending capture request together, so a reader
//! never sees dimensions that disagree with the storage length.

use newton_common::camera::{CameraError, CameraResult, FrameSize};
use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::debug;

/// A pending "save the next frame" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Destination file; the extension selects the encoding
    pub path: PathBuf,
}

/// An owned copy of the shared buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    /// Output dimensions
    pub size: FrameSize,
    /// Number of frames published before this copy was taken (0 = none yet)
    pub sequence: u64,
    /// RGB8 packed pixels, `size.byte_len()` bytes
    pub pixels: Vec<u8>,
}

/// Result of `SharedFrameBuffer::publish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Stored; carries the new sequence number
    Published(u64),
    /// Output size changed since the frame was rescaled; carries the new size
    SizeChanged(FrameSize),
}

struct FrameState {
    size: FrameSize,
    pixels: Vec<u8>,
    sequence: u64,
    pending: Option<CaptureRequest>,
}

/// Output-resolution frame storage shared between the capture thread and
/// any number of readers.
pub struct SharedFrameBuffer {
    state: Mutex<FrameState>,
}

impl SharedFrameBuffer {
    /// Allocate a zeroed buffer of the given size.
    pub fn new(size: FrameSize) -> Self {
        Self {
            state: Mutex::new(FrameState {
                size,
                pixels: vec![0; size.byte_len()],
                sequence: 0,
                pending: None,
            }),
        }
    }

    /// Current output size.
    pub fn size(&self) -> FrameSize {
        self.state.lock().size
    }

    /// Number of frames published so far.
    pub fn sequence(&self) -> u64 {
        self.state.lock().sequence
    }

    /// Change the output size, reallocating storage.
    ///
    /// Storage is replaced even when the size is unchanged; the contents are
    /// zeroed until the next publish.
    pub fn resize(&self, size: FrameSize) {
        let mut state = self.state.lock();
        debug!("Frame buffer resize {} -> {}", state.size, size);
        state.size = size;
        state.pixels = vec![0; size.byte_len()];
    }

    /// Copy the current contents into `dest`.
    ///
    /// Returns the size and sequence number of the copied frame.
    ///
    /// # Errors
    /// `CameraError::BufferSizeMismatch` if `dest` is not exactly
    /// `size().byte_len()` bytes.
    pub fn copy_into(&self, dest: &mut [u8]) -> CameraResult<(FrameSize, u64)> {
        let state = self.state.lock();
        if dest.len() != state.pixels.len() {
            return Err(CameraError::BufferSizeMismatch {
                expected: state.pixels.len(),
                actual: dest.len(),
            });
        }
        dest.copy_from_slice(&state.pixels);
        Ok((state.size, state.sequence))
    }

    /// Take an owned copy of the current contents.
    pub fn snapshot(&self) -> FrameSnapshot {
        let state = self.state.lock();
        FrameSnapshot {
            size: state.size,
            sequence: state.sequence,
            pixels: state.pixels.clone(),
        }
    }

    /// Record a capture request, replacing any pending one.
    ///
    /// Returns the request that was replaced, if any.
    pub fn set_request(&self, request: CaptureRequest) -> Option<CaptureRequest> {
        self.state.lock().pending.replace(request)
    }

    /// Whether a capture request is pending.
    pub fn has_pending_request(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// Remove and return the pending capture request.
    pub fn take_request(&self) -> Option<CaptureRequest> {
        self.state.lock().pending.take()
    }

    /// Publish a frame rescaled for `size`.
    ///
    /// If the buffer was resized after `size` was read, nothing is stored and
    /// the current size is returned so the caller can rescale again outside
    /// the lock.
    ///
    /// # Errors
    /// `CameraError::BufferSizeMismatch` if `pixels` is not `size.byte_len()`
    /// bytes.
    pub fn publish(&self, size: FrameSize, pixels: &[u8]) -> CameraResult<PublishOutcome> {
        let mut state = self.state.lock();
        if state.size != size {
            return Ok(PublishOutcome::SizeChanged(state.size));
        }
        if pixels.len() != state.pixels.len() {
            return Err(CameraError::BufferSizeMismatch {
                expected: state.pixels.len(),
                actual: pixels.len(),
            });
        }
        state.pixels.copy_from_slice(pixels);
        state.sequence += 1;
        Ok(PublishOutcome::Published(state.sequence))
    }
}
