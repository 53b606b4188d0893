//! Camera configuration (`[camera]` section of `station.toml`).

use crate::camera::driver::CameraError;
use crate::camera::types::FrameSize;
use crate::config::ConfigError;
use crate::consts::{DEFAULT_OUTPUT_HEIGHT, DEFAULT_OUTPUT_WIDTH, DEFAULT_RETRIEVE_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_driver() -> String {
    "simulation".to_string()
}

fn default_output_width() -> u32 {
    DEFAULT_OUTPUT_WIDTH
}

fn default_output_height() -> u32 {
    DEFAULT_OUTPUT_HEIGHT
}

fn default_retrieve_timeout_ms() -> u64 {
    DEFAULT_RETRIEVE_TIMEOUT_MS
}

/// Interpolation used when rescaling native frames to the output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Nearest neighbour
    Nearest,
    /// Bilinear
    #[default]
    Triangle,
    /// Cubic (Catmull-Rom)
    CatmullRom,
    /// Lanczos, window 3
    Lanczos3,
}

/// Camera configuration.
///
/// # TOML Example
///
/// ```toml
/// [camera]
/// driver = "simulation"
/// serial = "40012345"
/// output_width = 640
/// output_height = 480
/// retrieve_timeout_ms = 8000
/// resize_filter = "triangle"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraConfig {
    /// Camera driver name (registry key)
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Serial number of the device to open
    pub serial: String,

    /// Width of the shared output buffer
    #[serde(default = "default_output_width")]
    pub output_width: u32,

    /// Height of the shared output buffer
    #[serde(default = "default_output_height")]
    pub output_height: u32,

    /// Per-iteration frame retrieval timeout
    #[serde(default = "default_retrieve_timeout_ms")]
    pub retrieve_timeout_ms: u64,

    /// Rescale interpolation
    #[serde(default)]
    pub resize_filter: ResizeFilter,

    /// Initial exposure time in microseconds (device default if omitted)
    #[serde(default)]
    pub exposure_us: Option<f64>,

    /// Initial automatic gain setting (device default if omitted)
    #[serde(default)]
    pub auto_gain: Option<bool>,
}

impl CameraConfig {
    /// Config for the given serial with every other field at its default.
    pub fn with_serial(serial: impl Into<String>) -> Self {
        Self {
            driver: default_driver(),
            serial: serial.into(),
            output_width: DEFAULT_OUTPUT_WIDTH,
            output_height: DEFAULT_OUTPUT_HEIGHT,
            retrieve_timeout_ms: DEFAULT_RETRIEVE_TIMEOUT_MS,
            resize_filter: ResizeFilter::default(),
            exposure_us: None,
            auto_gain: None,
        }
    }

    /// Validate the camera configuration.
    ///
    /// # Validation Rules
    /// 1. `serial` not empty
    /// 2. `output_width` and `output_height` > 0
    /// 3. `retrieve_timeout_ms` > 0
    /// 4. `exposure_us`, if set, > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.is_empty() {
            return Err(ConfigError::ValidationError(
                "camera.serial cannot be empty".to_string(),
            ));
        }
        if self.output_width == 0 || self.output_height == 0 {
            return Err(ConfigError::ValidationError(format!(
                "camera output size must be positive, got {}x{}",
                self.output_width, self.output_height
            )));
        }
        if self.retrieve_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "camera.retrieve_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if let Some(exposure) = self.exposure_us {
            if exposure <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "camera.exposure_us must be positive, got {exposure}"
                )));
            }
        }
        Ok(())
    }

    /// Configured output size.
    ///
    /// # Errors
    /// Returns `CameraError::InvalidSize` if either dimension is zero.
    pub fn output_size(&self) -> Result<FrameSize, CameraError> {
        FrameSize::new(self.output_width, self.output_height)
    }

    /// Configured retrieval timeout.
    pub fn retrieve_timeout(&self) -> Duration {
        Duration::from_millis(self.retrieve_timeout_ms)
    }
}
