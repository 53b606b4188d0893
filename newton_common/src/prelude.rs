//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use newton_common::prelude::*;` and get
//! the most important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use newton_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig, StationConfig};

// ─── Camera ─────────────────────────────────────────────────────────
pub use crate::camera::{
    CameraConfig, CameraDriver, CameraError, CameraHandle, CameraResult, Frame, FrameSize,
};

// ─── Fieldbus ───────────────────────────────────────────────────────
pub use crate::fieldbus::{
    AxisConfig, CommandEdit, ControlWord, DriveError, FieldbusError, FieldbusTransport,
    ObjectAddress, OperationMode, SlaveState,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::FRAME_CHANNELS;
