//! Driver implementations.
//!
//! - [`simulation`] - Software camera and fieldbus for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `CameraDriver` and/or `FieldbusTransport` from `newton_common`
//! 3. Register the factories in [`register_all_drivers`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register_camera("simulation", simulation::create_camera_driver);
    registry.register_fieldbus("simulation", simulation::create_fieldbus);
}
