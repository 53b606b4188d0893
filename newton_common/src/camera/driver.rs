//! Camera driver traits and error types.
//!
//! This module defines:
//! - `CameraDriver` trait - Device discovery and opening (one per SDK/backend)
//! - `CameraHandle` trait - An opened device, shared between threads
//! - `CameraError` enum - Error types for camera operations

use crate::camera::types::{DeviceInfo, Frame, ParameterRange, StreamSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error types for camera operations.
#[derive(Debug, Clone, Error)]
pub enum CameraError {
    /// No device with the requested serial was found
    #[error("Camera not found: serial {0}")]
    DeviceNotFound(String),

    /// No frame arrived within the retrieval timeout
    #[error("Frame retrieval timed out")]
    Timeout,

    /// A capture task is already running for this controller
    #[error("Capture already running")]
    AlreadyRunning,

    /// Requested frame dimensions are not usable
    #[error("Invalid frame size {width}x{height}")]
    InvalidSize {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// A pixel buffer does not match the frame dimensions
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Expected byte length
        expected: usize,
        /// Actual byte length
        actual: usize,
    },

    /// Device communication error
    #[error("Camera communication error: {0}")]
    Communication(String),

    /// Snapshot image could not be written
    #[error("Failed to write image {path:?}: {reason}")]
    ImageWrite {
        /// Destination path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Device parameter access failed or value out of range
    #[error("Camera parameter error: {0}")]
    Parameter(String),

    /// No camera driver registered under the given name
    #[error("Camera driver not found: {0}")]
    DriverNotFound(String),
}

/// Result type for camera operations
pub type CameraResult<T> = Result<T, CameraError>;

/// Camera backend: discovers devices and opens them.
///
/// One implementation exists per vendor SDK (or the simulation backend).
pub trait CameraDriver: Send + Sync {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// List the devices currently visible to this backend.
    fn enumerate(&self) -> CameraResult<Vec<DeviceInfo>>;

    /// Open the device with the given serial number.
    ///
    /// # Errors
    /// Returns `CameraError::DeviceNotFound` if no such device is visible.
    fn open(&self, serial: &str) -> CameraResult<Arc<dyn CameraHandle>>;
}

/// An opened camera device.
///
/// The handle is shared between the application threads and the capture
/// thread, so every method takes `&self`; implementations serialize device
/// access internally.
///
/// # Timing Contracts
///
/// | Operation | Max Duration | Notes |
/// |-----------|--------------|-------|
/// | `retrieve_frame()` | `timeout` | Returns `CameraError::Timeout` when no frame arrived |
/// | `write_image()` | unbounded | Disk I/O, called off the buffer lock |
/// | everything else | short | Parameter access |
pub trait CameraHandle: Send + Sync {
    /// Serial number of the opened device.
    fn serial(&self) -> &str;

    /// Apply stream settings (region, offsets, pixel format).
    fn configure(&self, settings: &StreamSettings) -> CameraResult<()>;

    /// Begin continuous acquisition.
    fn start_streaming(&self) -> CameraResult<()>;

    /// End continuous acquisition.
    fn stop_streaming(&self) -> CameraResult<()>;

    /// Wait up to `timeout` for the next frame.
    ///
    /// # Errors
    /// `CameraError::Timeout` if no frame arrived in time; any other error
    /// means the frame was lost.
    fn retrieve_frame(&self, timeout: Duration) -> CameraResult<Frame>;

    /// Encode `frame` at its native resolution and write it to `path`.
    fn write_image(&self, path: &Path, frame: &Frame) -> CameraResult<()>;

    /// Accepted exposure time range in microseconds.
    fn exposure_range(&self) -> CameraResult<ParameterRange>;

    /// Set the exposure time in microseconds.
    fn set_exposure(&self, exposure_us: f64) -> CameraResult<()>;

    /// Accepted gain range.
    fn gain_range(&self) -> CameraResult<ParameterRange>;

    /// Enable or disable continuous automatic gain.
    fn set_auto_gain(&self, enabled: bool) -> CameraResult<()>;

    /// Set the target brightness used by the automatic functions.
    fn set_brightness(&self, target: f64) -> CameraResult<()>;
}
