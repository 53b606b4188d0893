//! Fieldbus drive abstraction (CiA 402 over SDO access).
//!
//! This module contains:
//! - `FieldbusTransport` trait - SDO read/write and slave state polling
//! - `ControlWord` / `CommandEdit` - Controlword bits and read-modify-write edits
//! - `ObjectAddress`, `SlaveState`, `OperationMode` - Object model types
//! - `FieldbusError` / `DriveError` - Error types
//! - `AxisConfig` - `[[axes]]` entries of the station configuration
//! - [`objects`] - Object dictionary addresses used by the drive controller
//! - `within_window` - Position arrival check

pub mod config;
pub mod control;
pub mod error;
pub mod objects;
pub mod transport;
pub mod types;
pub mod window;

pub use config::AxisConfig;
pub use control::{CommandEdit, ControlWord};
pub use error::{DriveError, DriveResult, FieldbusError};
pub use transport::FieldbusTransport;
pub use types::{ObjectAddress, OperationMode, SlaveState};
pub use window::within_window;
