//! Camera driver abstraction.
//!
//! This module contains:
//! - `CameraDriver` / `CameraHandle` traits - Interface for camera backends
//! - `CameraError` enum - Error types for camera operations
//! - `Frame` / `FrameSize` - Native frame data and dimensions
//! - `CameraConfig` - `[camera]` section of the station configuration

pub mod config;
pub mod driver;
pub mod types;

pub use config::{CameraConfig, ResizeFilter};
pub use driver::{CameraDriver, CameraError, CameraHandle, CameraResult};
pub use types::{DeviceInfo, Frame, FrameSize, ParameterRange, PixelFormat, StreamSettings};
