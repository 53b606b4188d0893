//! Camera frame and device types.
//!
//! - `FrameSize` - Width/height pair with byte-length helpers
//! - `Frame` - One native-resolution frame as delivered by a driver
//! - `StreamSettings` - Settings applied when a device is opened
//! - `DeviceInfo` - Enumeration record for a discovered device

use crate::camera::driver::CameraError;
use crate::consts::FRAME_CHANNELS;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FrameSize {
    /// Create a frame size, rejecting zero dimensions.
    ///
    /// # Errors
    /// Returns `CameraError::InvalidSize` if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::InvalidSize { width, height });
        }
        Ok(Self { width, height })
    }

    /// Number of pixels.
    #[inline]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of bytes of an RGB8 packed buffer of this size.
    #[inline]
    pub const fn byte_len(&self) -> usize {
        self.pixel_count() * FRAME_CHANNELS
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single frame at the camera's native resolution (RGB8 packed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Native dimensions
    pub size: FrameSize,
    /// Interleaved pixel data, `size.byte_len()` bytes
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Wrap pixel data, checking that its length matches the dimensions.
    ///
    /// # Errors
    /// Returns `CameraError::BufferSizeMismatch` on a length mismatch.
    pub fn new(size: FrameSize, pixels: Vec<u8>) -> Result<Self, CameraError> {
        let frame = Self { size, pixels };
        frame.validate()?;
        Ok(frame)
    }

    /// Check that the pixel data length matches the declared dimensions.
    pub fn validate(&self) -> Result<(), CameraError> {
        let expected = self.size.byte_len();
        if self.pixels.len() != expected {
            return Err(CameraError::BufferSizeMismatch {
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }
}

/// Pixel formats a device can be asked to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8 bits per channel, interleaved R, G, B.
    #[default]
    Rgb8Packed,
}

/// Settings applied to a device right after it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Grow the sensor region to the maximum width/height
    pub maximize_resolution: bool,
    /// Move the sensor region offsets to their minimum
    pub minimize_offset: bool,
    /// Requested pixel format
    pub pixel_format: PixelFormat,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            maximize_resolution: true,
            minimize_offset: true,
            pixel_format: PixelFormat::Rgb8Packed,
        }
    }
}

/// A device reported by `CameraDriver::enumerate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device serial number
    pub serial: String,
    /// Vendor model name
    pub model: String,
}

/// Inclusive bounds of a device parameter (exposure, gain).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    /// Smallest accepted value
    pub min: f64,
    /// Largest accepted value
    pub max: f64,
}

impl ParameterRange {
    /// Whether `value` lies within the bounds.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}
