//! Native → output resolution rescaling.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};
use newton_common::camera::{CameraError, CameraResult, Frame, FrameSize, ResizeFilter};

/// Rescales RGB8 frames to the output size with a fixed filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameRescaler {
    filter: ResizeFilter,
}

impl FrameRescaler {
    /// Create a rescaler using `filter`.
    pub const fn new(filter: ResizeFilter) -> Self {
        Self { filter }
    }

    /// Configured filter.
    pub const fn filter(&self) -> ResizeFilter {
        self.filter
    }

    /// Produce `frame` at `target` size as RGB8 packed bytes.
    ///
    /// A frame already at `target` is copied unchanged.
    ///
    /// # Errors
    /// `CameraError::BufferSizeMismatch` if the frame's pixel data does not
    /// match its declared size.
    pub fn rescale(&self, frame: &Frame, target: FrameSize) -> CameraResult<Vec<u8>> {
        frame.validate()?;
        if frame.size == target {
            return Ok(frame.pixels.clone());
        }

        let source: ImageBuffer<Rgb<u8>, &[u8]> =
            ImageBuffer::from_raw(frame.size.width, frame.size.height, frame.pixels.as_slice())
                .ok_or(CameraError::BufferSizeMismatch {
                    expected: frame.size.byte_len(),
                    actual: frame.pixels.len(),
                })?;

        let scaled = imageops::resize(&source, target.width, target.height, self.filter_type());
        Ok(scaled.into_raw())
    }

    fn filter_type(&self) -> FilterType {
        match self.filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}
