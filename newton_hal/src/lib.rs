//! # Newton HAL Library
//!
//! Camera frame acquisition and CiA 402 drive control with a pluggable
//! driver architecture.
//!
//! Drivers implement the `CameraDriver` / `CameraHandle` and
//! `FieldbusTransport` traits defined in `newton_common`.
//!
//! # Module Structure
//!
//! - [`camera`] - Shared frame buffer, rescaling, acquisition controller
//! - [`drive`] - Drive controller (guarded CiA 402 command sequences)
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//! - [`station`] - Station composition root and supervision loop
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         newton_hal                               │
//! │  ┌──────────────────┐   ┌──────────────┐   ┌─────────────────┐  │
//! │  │ FrameAcquisition │◄──│   Station    │──►│ Driver Registry │  │
//! │  │   Controller     │   │ (supervise)  │   │                 │  │
//! │  └────────┬─────────┘   └──────┬───────┘   └─────────────────┘  │
//! │           │ capture thread     │ per axis                       │
//! │           ▼                    ▼                                │
//! │  ┌──────────────────┐   ┌──────────────────┐                    │
//! │  │  CameraHandle    │   │ DriveController  │                    │
//! │  │  (trait object)  │   │ → FieldbusTransport                   │
//! │  └──────────────────┘   └──────────────────┘                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod camera;
pub mod drive;
pub mod driver_registry;
pub mod drivers;
pub mod station;

// Re-export key types for convenience
pub use crate::camera::{FrameAcquisitionController, SharedFrameBuffer};
pub use crate::drive::DriveController;
pub use crate::driver_registry::DriverRegistry;
pub use crate::station::{Station, StationError};
