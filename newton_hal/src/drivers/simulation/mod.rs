//! Simulation drivers.
//!
//! Software camera and fieldbus backends for development and testing
//! without physical hardware.

mod camera;
mod fieldbus;

pub use camera::{
    SIM_FRAME_INTERVAL, SIM_NATIVE_HEIGHT, SIM_NATIVE_WIDTH, SimulatedCamera,
    SimulatedCameraDriver, SnapshotRecord,
};
pub use fieldbus::{ABORT_GENERAL, ABORT_OBJECT_MISSING, SdoWrite, SimulatedFieldbus};

use newton_common::camera::{CameraConfig, CameraDriver, CameraResult, FrameSize};
use newton_common::fieldbus::{FieldbusError, FieldbusTransport};

/// Factory for the simulated camera backend.
///
/// The backend reports one device carrying the configured serial.
pub fn create_camera_driver(config: &CameraConfig) -> CameraResult<Box<dyn CameraDriver>> {
    let native = FrameSize::new(SIM_NATIVE_WIDTH, SIM_NATIVE_HEIGHT)?;
    Ok(Box::new(
        SimulatedCameraDriver::new(native, SIM_FRAME_INTERVAL).with_device(config.serial.clone()),
    ))
}

/// Factory for the simulated fieldbus, with one slave per requested address.
pub fn create_fieldbus(slaves: &[u16]) -> Result<Box<dyn FieldbusTransport>, FieldbusError> {
    Ok(Box::new(SimulatedFieldbus::with_slaves(slaves)))
}
